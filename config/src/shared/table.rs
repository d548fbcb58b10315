use std::time::Duration;

use serde::Deserialize;

use crate::shared::ValidationError;

/// A table taking part in a shift.
///
/// The same type describes both sides. On the source side `filter`, `read_limit` and the read
/// delay drive how pages are read; on the target side `source_name` and
/// `primary_key` drive where and how they are written.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// Name of the source table feeding this target table, when it differs from `name`.
    #[serde(default)]
    pub source_name: Option<String>,
    /// SQL clause appended verbatim after `FROM <table>`, for example `WHERE active`.
    #[serde(default)]
    pub filter: Option<String>,
    /// Maximum number of rows read per page.
    #[serde(default = "default_read_limit")]
    pub read_limit: usize,
    /// Pause between two pages, in milliseconds.
    #[serde(default)]
    pub read_delay_ms: u64,
    /// Pause between two pages as a duration such as `250ms` or `1m 30s`.
    #[serde(default, with = "humantime_serde")]
    pub read_delay: Option<Duration>,
    #[serde(default)]
    pub primary_key: Option<String>,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
}

fn default_read_limit() -> usize {
    TableConfig::DEFAULT_READ_LIMIT
}

impl TableConfig {
    pub const DEFAULT_READ_LIMIT: usize = 1000;

    /// Pause between two pages, from whichever of `read_delay` and `read_delay_ms` is set.
    pub fn read_delay(&self) -> Duration {
        self.read_delay
            .unwrap_or(Duration::from_millis(self.read_delay_ms))
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyTableName);
        }

        if self.columns.is_empty() {
            return Err(ValidationError::NoColumns {
                table: self.name.clone(),
            });
        }

        for (index, column) in self.columns.iter().enumerate() {
            let duplicated = self.columns[..index].contains(column);
            if column.name.trim().is_empty() || duplicated {
                return Err(ValidationError::InvalidColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        if self.read_limit == 0 {
            return Err(ValidationError::ZeroReadLimit {
                table: self.name.clone(),
            });
        }

        if self.read_delay.is_some() && self.read_delay_ms != 0 {
            return Err(ValidationError::ConflictingReadDelay {
                table: self.name.clone(),
            });
        }

        if let Some(primary_key) = &self.primary_key
            && !self.column_names().any(|name| name == primary_key)
        {
            return Err(ValidationError::PrimaryKeyNotAColumn {
                table: self.name.clone(),
                primary_key: primary_key.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> TableConfig {
        TableConfig {
            name: "person".to_string(),
            source_name: None,
            filter: None,
            read_limit: TableConfig::DEFAULT_READ_LIMIT,
            read_delay_ms: 0,
            read_delay: None,
            primary_key: None,
            columns: columns
                .iter()
                .map(|name| ColumnConfig {
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn defaults_apply_when_fields_are_omitted() {
        let table: TableConfig =
            serde_json::from_str(r#"{ "name": "person", "columns": [{ "name": "id" }] }"#)
                .unwrap();

        assert_eq!(table.read_limit, 1000);
        assert_eq!(table.read_delay(), Duration::ZERO);
        assert!(table.filter.is_none());
        assert!(table.source_name.is_none());
        table.validate().unwrap();
    }

    #[test]
    fn zero_read_limit_is_rejected() {
        let mut config = table(&["id"]);
        config.read_limit = 0;

        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroReadLimit { .. })
        ));
    }

    #[test]
    fn primary_key_must_be_a_column() {
        let mut config = table(&["id", "name"]);
        config.primary_key = Some("uuid".to_string());

        assert!(matches!(
            config.validate(),
            Err(ValidationError::PrimaryKeyNotAColumn { .. })
        ));

        config.primary_key = Some("id".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn duplicated_columns_are_rejected() {
        let config = table(&["id", "name", "id"]);

        assert_eq!(
            config.validate().unwrap_err(),
            ValidationError::InvalidColumn {
                table: "person".to_string(),
                column: "id".to_string(),
            }
        );
    }

    #[test]
    fn tables_need_columns() {
        assert!(matches!(
            table(&[]).validate(),
            Err(ValidationError::NoColumns { .. })
        ));
    }

    #[test]
    fn read_delay_accepts_a_duration() {
        let table: TableConfig = serde_json::from_str(
            r#"{ "name": "person", "read_delay": "1m 30s", "columns": [{ "name": "id" }] }"#,
        )
        .unwrap();
        assert_eq!(table.read_delay(), Duration::from_secs(90));
        table.validate().unwrap();

        let table: TableConfig = serde_json::from_str(
            r#"{ "name": "person", "read_delay_ms": 250, "columns": [{ "name": "id" }] }"#,
        )
        .unwrap();
        assert_eq!(table.read_delay(), Duration::from_millis(250));
    }

    #[test]
    fn both_read_delays_are_rejected() {
        let mut config = table(&["id"]);
        config.read_delay_ms = 250;
        config.read_delay = Some(Duration::from_millis(100));

        assert_eq!(
            config.validate().unwrap_err(),
            ValidationError::ConflictingReadDelay {
                table: "person".to_string(),
            }
        );
    }
}
