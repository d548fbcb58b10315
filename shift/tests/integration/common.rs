use config::shared::{ColumnConfig, ShiftConfig, TableConfig};
use shift::pipeline::ShiftPipeline;
use shift::source::postgres::PgSource;
use shift::store::progress::postgres::PostgresProgressStore;
use shift::target::postgres::PgTarget;
use shift::test_utils::database::TestDatabase;

pub type PgPipeline = ShiftPipeline<PgSource, PgTarget, PostgresProgressStore>;

/// Describes a table with the given columns and page size.
pub fn table(name: &str, columns: &[&str], read_limit: usize) -> TableConfig {
    TableConfig {
        name: name.to_string(),
        source_name: None,
        filter: None,
        read_limit,
        read_delay_ms: 0,
        read_delay: None,
        primary_key: None,
        columns: columns
            .iter()
            .map(|column| ColumnConfig {
                name: column.to_string(),
            })
            .collect(),
    }
}

/// Builds a configuration shifting `source_tables` of `source` into `target_tables` of `target`.
pub fn shift_config(
    source: &TestDatabase,
    source_tables: Vec<TableConfig>,
    target: &TestDatabase,
    target_tables: Vec<TableConfig>,
) -> ShiftConfig {
    let mut source_config = source.config.clone();
    source_config.tables = source_tables;
    let mut target_config = target.config.clone();
    target_config.tables = target_tables;

    ShiftConfig {
        source: source_config,
        target: target_config,
    }
}

/// Connects a pipeline to the databases of `config`, keeping progress on the target.
pub async fn pg_pipeline(config: ShiftConfig) -> PgPipeline {
    let source = PgSource::connect(&config.source).await.unwrap();
    let target = PgTarget::connect(&config.target).await.unwrap();
    let store = PostgresProgressStore::connect(&config.target).await.unwrap();

    ShiftPipeline::new(config, source, target, store)
}
