use config::shared::ShiftConfig;
use shift::engine::WriteMode;
use shift::pipeline::{ShiftPipeline, ShiftReport};
use shift::source::postgres::PgSource;
use shift::store::progress::postgres::PostgresProgressStore;
use shift::target::postgres::PgTarget;
use tracing::info;

use crate::error::DshiftResult;

/// Connects to both databases and shifts every configured table in `mode`.
///
/// Progress is kept in the target database.
pub async fn start_shift(config: ShiftConfig, mode: WriteMode) -> DshiftResult<ShiftReport> {
    info!(
        source_driver = config.source.driver.as_str(),
        target_driver = config.target.driver.as_str(),
        table_count = config.source.tables.len(),
        "connecting to source and target"
    );

    let source = PgSource::connect(&config.source).await?;
    let target = PgTarget::connect(&config.target).await?;
    let store = PostgresProgressStore::connect(&config.target).await?;

    let pipeline = ShiftPipeline::new(config, source, target, store);
    let report = pipeline.run(mode).await?;

    for table in &report.tables {
        info!(
            source_table = %table.source_table,
            target_table = %table.target_table,
            rows = table.rows,
            pages = table.pages,
            offset = table.final_offset,
            "table summary"
        );
    }

    Ok(report)
}
