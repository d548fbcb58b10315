use serde::Deserialize;

use crate::shared::{DatabaseConfig, TableConfig, ValidationError};

/// Top level configuration of a shift run.
#[derive(Debug, Clone, Deserialize)]
pub struct ShiftConfig {
    pub source: DatabaseConfig,
    pub target: DatabaseConfig,
}

impl ShiftConfig {
    /// Validates both sides and checks that every source table has a target.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.target.validate()?;

        for table in &self.source.tables {
            self.target_table_for(&table.name)?;
        }

        Ok(())
    }

    /// Resolves the target table fed by the source table named `source_table`.
    ///
    /// A target matches when its `source_name` equals the source table name, or when it
    /// has the same name. The first match in declaration order wins.
    pub fn target_table_for(&self, source_table: &str) -> Result<&TableConfig, ValidationError> {
        self.target
            .tables
            .iter()
            .find(|target| {
                target.source_name.as_deref() == Some(source_table) || target.name == source_table
            })
            .ok_or_else(|| ValidationError::MissingTargetTable {
                source_table: source_table.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::shared::{ColumnConfig, DatabaseDriver, TlsConfig};

    fn table(name: &str, source_name: Option<&str>) -> TableConfig {
        TableConfig {
            name: name.to_string(),
            source_name: source_name.map(str::to_string),
            filter: None,
            read_limit: 10,
            read_delay_ms: 0,
            read_delay: None,
            primary_key: None,
            columns: vec![ColumnConfig {
                name: "id".to_string(),
            }],
        }
    }

    fn database(tables: Vec<TableConfig>) -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Postgres,
            url: SecretString::new("postgres://postgres@localhost/db".to_string()),
            tls: TlsConfig::disabled(),
            tables,
        }
    }

    #[test]
    fn target_is_resolved_by_source_name_or_name() {
        let config = ShiftConfig {
            source: database(vec![table("users", None), table("orders", None)]),
            target: database(vec![
                table("accounts", Some("users")),
                table("orders", None),
            ]),
        };

        assert_eq!(config.target_table_for("users").unwrap().name, "accounts");
        assert_eq!(config.target_table_for("orders").unwrap().name, "orders");
        config.validate().unwrap();
    }

    #[test]
    fn missing_target_is_reported_with_guidance() {
        let config = ShiftConfig {
            source: database(vec![table("users", None)]),
            target: database(vec![table("accounts", None)]),
        };

        let err = config.validate().unwrap_err();

        assert_eq!(
            err.to_string(),
            "missing target for users; ensure table names match, target has a source_name"
        );
    }

    #[test]
    fn first_declared_target_wins() {
        let config = ShiftConfig {
            source: database(vec![table("users", None)]),
            target: database(vec![
                table("users", None),
                table("accounts", Some("users")),
            ]),
        };

        assert_eq!(config.target_table_for("users").unwrap().name, "users");
    }
}
