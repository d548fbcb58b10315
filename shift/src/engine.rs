//! The per-table shift loop.

use std::fmt;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::error::{ErrorKind, ShiftError, ShiftResult};
use crate::failpoints::{SHIFT_BEFORE_CURSOR_ADVANCE, shift_fail_point};
use crate::metrics::{
    MODE_LABEL, SHIFT_PAGE_WRITE_DURATION_SECONDS, SHIFT_PAGES_WRITTEN_TOTAL,
    SHIFT_ROWS_TRANSFERRED_TOTAL, SHIFT_TABLES_COMPLETED_TOTAL, TABLE_NAME_LABEL,
};
use crate::scan::{ColumnProjection, scan};
use crate::schema::{TableDescriptor, TablePair};
use crate::source::Source;
use crate::sql::{MAX_STATEMENT_PARAMS, build_select, build_upsert, flatten_params};
use crate::store::progress::ProgressStore;
use crate::target::Target;
use crate::types::TableRow;
use crate::{bail, shift_error};

/// How pages are written to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Bulk loads every page. Rows already present in the target are not detected, so the
    /// source is expected to only grow.
    Append,
    /// Upserts every page on the target's primary key, updating rows that changed.
    Merge,
}

impl WriteMode {
    /// Returns `true` when offsets are reset before shifting, so every row is visited again.
    pub fn resets_progress(&self) -> bool {
        matches!(self, WriteMode::Merge)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Append => "append",
            WriteMode::Merge => "merge",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of shifting one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub source_table: String,
    pub target_table: String,
    /// Rows written during this run.
    pub rows: u64,
    /// Non-empty pages written during this run.
    pub pages: u64,
    /// Offset stored for the target table when the run finished.
    pub final_offset: u64,
}

/// Wraps `err` with the phase that failed and the tables involved.
///
/// Configuration errors keep their kind so callers can tell them apart from failing systems.
#[track_caller]
fn table_error(
    err: ShiftError,
    kind: ErrorKind,
    description: &'static str,
    tables: TablePair<'_>,
) -> ShiftError {
    let kind = if err.kind().is_configuration() {
        err.kind()
    } else {
        kind
    };
    let detail = format!(
        "{tables}: {}",
        err.detail().unwrap_or_else(|| err.description())
    );

    shift_error!(kind, description, detail = detail, source: err)
}

/// Checks that `target` can be written in `mode` with pages of `read_limit` rows.
pub fn check_write_mode(
    mode: WriteMode,
    read_limit: usize,
    target: &TableDescriptor,
) -> ShiftResult<()> {
    if mode != WriteMode::Merge {
        return Ok(());
    }

    if target.primary_key.is_none() {
        bail!(
            ErrorKind::MissingPrimaryKey,
            "Merging requires a primary key",
            format!("target table `{}` has no primary key", target.name)
        );
    }

    let param_count = read_limit.saturating_mul(target.column_count());
    if param_count > MAX_STATEMENT_PARAMS {
        bail!(
            ErrorKind::ConfigError,
            "Page size too large for merging",
            format!(
                "pages of {read_limit} rows into the {} columns of `{}` need {param_count} parameters, at most {MAX_STATEMENT_PARAMS} are allowed",
                target.column_count(),
                target.name
            )
        );
    }

    Ok(())
}

/// Shifts `source_table` into `target_table` until the source is drained.
///
/// Every iteration reads the stored offset of the target table, selects the next page from
/// the source, writes it to the target and advances the offset by the number of rows
/// written. The loop stops on an empty page or on a page shorter than the source table's
/// `read_limit`.
///
/// The page write and the offset update are separate operations. A failure between the two
/// leaves the offset behind the data: in merge mode the page is replayed without effect on
/// the next run, in append mode it is loaded twice.
pub async fn shift_table<S, T, P>(
    source: &S,
    target: &T,
    store: &P,
    source_table: &TableDescriptor,
    target_table: &TableDescriptor,
    mode: WriteMode,
) -> ShiftResult<TableReport>
where
    S: Source,
    T: Target,
    P: ProgressStore,
{
    let tables = TablePair {
        source: source_table,
        target: target_table,
    };

    check_write_mode(mode, source_table.read_limit, target_table)
        .map_err(|err| table_error(err, ErrorKind::ConfigError, "Invalid table mapping", tables))?;

    let projection = ColumnProjection::new(target_table);
    let target_columns = target_table.column_names();

    let mut report = TableReport {
        source_table: source_table.name.clone(),
        target_table: target_table.name.clone(),
        rows: 0,
        pages: 0,
        final_offset: 0,
    };

    loop {
        let offset = store.get(&target_table.name).await.map_err(|err| {
            table_error(
                err,
                ErrorKind::ProgressStoreFailed,
                "Failed to read progress",
                tables,
            )
        })?;
        report.final_offset = offset;

        let select = build_select(source_table, offset);
        debug!(%tables, statement = %select, "reading page");

        let mut cursor = source.query(&select).await.map_err(|err| {
            table_error(
                err,
                ErrorKind::SourceReadFailed,
                "Failed to read from source",
                tables,
            )
        })?;
        let rows = scan(&mut cursor, &projection).map_err(|err| {
            table_error(
                err,
                ErrorKind::SourceReadFailed,
                "Failed to read from source",
                tables,
            )
        })?;

        if rows.is_empty() {
            break;
        }

        let row_count = rows.len();
        let started = Instant::now();
        write_page(target, target_table, &target_columns, rows, mode)
            .await
            .map_err(|err| {
                table_error(
                    err,
                    ErrorKind::TargetWriteFailed,
                    "Failed to write to target",
                    tables,
                )
            })?;
        let elapsed = started.elapsed();

        shift_fail_point(SHIFT_BEFORE_CURSOR_ADVANCE)?;

        let next_offset = offset + row_count as u64;
        store
            .set(&target_table.name, next_offset)
            .await
            .map_err(|err| {
                table_error(
                    err,
                    ErrorKind::ProgressStoreFailed,
                    "Failed to store progress",
                    tables,
                )
            })?;

        report.rows += row_count as u64;
        report.pages += 1;
        report.final_offset = next_offset;

        counter!(
            SHIFT_ROWS_TRANSFERRED_TOTAL,
            TABLE_NAME_LABEL => target_table.name.clone(),
            MODE_LABEL => mode.as_str()
        )
        .increment(row_count as u64);
        counter!(
            SHIFT_PAGES_WRITTEN_TOTAL,
            TABLE_NAME_LABEL => target_table.name.clone(),
            MODE_LABEL => mode.as_str()
        )
        .increment(1);
        histogram!(
            SHIFT_PAGE_WRITE_DURATION_SECONDS,
            TABLE_NAME_LABEL => target_table.name.clone(),
            MODE_LABEL => mode.as_str()
        )
        .record(elapsed.as_secs_f64());

        info!(
            %tables,
            %mode,
            offset = next_offset,
            row_count,
            duration_ms = elapsed.as_millis() as u64,
            "page written"
        );

        if row_count < source_table.read_limit {
            break;
        }

        if !source_table.read_delay.is_zero() {
            tokio::time::sleep(source_table.read_delay).await;
        }
    }

    counter!(
        SHIFT_TABLES_COMPLETED_TOTAL,
        TABLE_NAME_LABEL => target_table.name.clone(),
        MODE_LABEL => mode.as_str()
    )
    .increment(1);

    info!(
        %tables,
        %mode,
        rows = report.rows,
        pages = report.pages,
        offset = report.final_offset,
        "table shifted"
    );

    Ok(report)
}

async fn write_page<T>(
    target: &T,
    target_table: &TableDescriptor,
    target_columns: &[String],
    rows: Vec<TableRow>,
    mode: WriteMode,
) -> ShiftResult<()>
where
    T: Target,
{
    match mode {
        WriteMode::Append => {
            target
                .bulk_load(&target_table.name, target_columns, rows)
                .await?;
        }
        WriteMode::Merge => {
            let statement = build_upsert(target_table, rows.len())?;
            debug!(table = %target_table.name, statement = %statement.sql, "upserting page");

            let params = flatten_params(&rows, target_table.column_count())?;
            if params.len() != statement.param_count {
                bail!(
                    ErrorKind::StatementBuildFailed,
                    "Parameter count does not match the statement",
                    format!(
                        "{} parameters for {} placeholders",
                        params.len(),
                        statement.param_count
                    )
                );
            }

            target.execute(&statement.sql, &params).await?;
        }
    }

    Ok(())
}
