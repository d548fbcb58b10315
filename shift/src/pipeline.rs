//! Runs the engine over every configured table.

use config::shared::ShiftConfig;
use tracing::info;

use crate::engine::{TableReport, WriteMode, shift_table};
use crate::error::{ErrorKind, ShiftResult};
use crate::schema::TableDescriptor;
use crate::shift_error;
use crate::source::Source;
use crate::store::progress::ProgressStore;
use crate::target::Target;

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftReport {
    pub mode: WriteMode,
    /// One entry per source table, in declaration order.
    pub tables: Vec<TableReport>,
}

impl ShiftReport {
    /// Rows written across all tables during this run.
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|table| table.rows).sum()
    }
}

#[derive(Debug)]
pub struct ShiftPipeline<S, T, P> {
    config: ShiftConfig,
    source: S,
    target: T,
    store: P,
}

impl<S, T, P> ShiftPipeline<S, T, P>
where
    S: Source,
    T: Target,
    P: ProgressStore,
{
    pub fn new(config: ShiftConfig, source: S, target: T, store: P) -> Self {
        Self {
            config,
            source,
            target,
            store,
        }
    }

    /// Pairs every source table with its target table, in source declaration order.
    ///
    /// Fails on the first source table without a target, before anything is read or written.
    pub fn plan(&self) -> ShiftResult<Vec<(TableDescriptor, TableDescriptor)>> {
        self.config
            .source
            .tables
            .iter()
            .map(|source_table| {
                let target_table = self.config.target_table_for(&source_table.name)?;
                Ok((
                    TableDescriptor::from(source_table),
                    TableDescriptor::from(target_table),
                ))
            })
            .collect()
    }

    /// Shifts every source table into its target table, one table after the other.
    ///
    /// Offsets of all configured target tables are registered first, and reset to zero in
    /// [`WriteMode::Merge`]. The first failing table aborts the run; tables shifted before it
    /// keep their progress.
    pub async fn run(&self, mode: WriteMode) -> ShiftResult<ShiftReport> {
        let plan = self.plan()?;

        let target_names = self
            .config
            .target
            .tables
            .iter()
            .map(|table| table.name.clone())
            .collect::<Vec<_>>();

        info!(
            %mode,
            table_count = plan.len(),
            reset = mode.resets_progress(),
            "starting shift"
        );

        self.store
            .ensure(&target_names, mode.resets_progress())
            .await
            .map_err(|err| {
                let kind = if err.kind().is_configuration() {
                    err.kind()
                } else {
                    ErrorKind::ProgressStoreFailed
                };
                shift_error!(kind, "Failed to prepare progress", source: err)
            })?;

        let mut report = ShiftReport {
            mode,
            tables: Vec::with_capacity(plan.len()),
        };
        for (source_table, target_table) in &plan {
            let table_report = shift_table(
                &self.source,
                &self.target,
                &self.store,
                source_table,
                target_table,
                mode,
            )
            .await?;

            report.tables.push(table_report);
        }

        info!(%mode, total_rows = report.total_rows(), "shift finished");

        Ok(report)
    }
}
