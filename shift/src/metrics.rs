//! Metric names and labels emitted while shifting.
//!
//! The crate only records metrics through the `metrics` facade. Nothing is exported unless
//! the binary installs a recorder.

/// Label for the target table name.
pub const TABLE_NAME_LABEL: &str = "table_name";

/// Label for the write mode, `append` or `merge`.
pub const MODE_LABEL: &str = "mode";

/// Counter of rows written to target tables.
pub const SHIFT_ROWS_TRANSFERRED_TOTAL: &str = "shift_rows_transferred_total";

/// Counter of pages written to target tables.
pub const SHIFT_PAGES_WRITTEN_TOTAL: &str = "shift_pages_written_total";

/// Histogram of the time spent writing one page, in seconds.
pub const SHIFT_PAGE_WRITE_DURATION_SECONDS: &str = "shift_page_write_duration_seconds";

/// Counter of tables shifted to completion.
pub const SHIFT_TABLES_COMPLETED_TOTAL: &str = "shift_tables_completed_total";
