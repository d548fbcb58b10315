use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::store::progress::ProgressStore;

/// A [`ProgressStore`] keeping offsets in memory.
///
/// Offsets are lost when the process exits. Useful for tests and for runs that should not
/// leave any trace on the target.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    offsets: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all stored offsets.
    pub async fn offsets(&self) -> BTreeMap<String, u64> {
        self.offsets.lock().await.clone()
    }
}

impl ProgressStore for MemoryProgressStore {
    async fn ensure(&self, table_names: &[String], reset: bool) -> ShiftResult<()> {
        let mut offsets = self.offsets.lock().await;

        for table_name in table_names {
            let offset = offsets.entry(table_name.clone()).or_insert(0);
            if reset {
                *offset = 0;
            }
        }

        Ok(())
    }

    async fn get(&self, table_name: &str) -> ShiftResult<u64> {
        let offsets = self.offsets.lock().await;

        match offsets.get(table_name) {
            Some(offset) => Ok(*offset),
            None => bail!(
                ErrorKind::ProgressNotFound,
                "No progress recorded for table",
                format!("table `{table_name}` has no progress row")
            ),
        }
    }

    async fn set(&self, table_name: &str, offset: u64) -> ShiftResult<()> {
        let mut offsets = self.offsets.lock().await;

        match offsets.get_mut(table_name) {
            Some(stored) => {
                *stored = offset;
                Ok(())
            }
            None => bail!(
                ErrorKind::ProgressNotFound,
                "No progress recorded for table",
                format!("table `{table_name}` has no progress row")
            ),
        }
    }
}
