use std::fmt;
use std::time::Duration;

use config::shared::TableConfig;

/// A column of a [`TableDescriptor`]. Columns carry no type, values keep whatever type the
/// source produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Everything the engine needs to know about one side of a table shift.
///
/// Column order matters: it is the projection order of the generated select and the value
/// order of the generated inserts. Source and target descriptors of the same shift may list
/// different columns in different orders; values are matched by column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub source_name: Option<String>,
    pub filter: Option<String>,
    pub read_limit: usize,
    pub read_delay: Duration,
    pub primary_key: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Creates a descriptor with the default page size and no filter, delay or primary key.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            source_name: None,
            filter: None,
            read_limit: TableConfig::DEFAULT_READ_LIMIT,
            read_delay: Duration::ZERO,
            primary_key: None,
            columns: columns.into_iter().map(ColumnDescriptor::new).collect(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_read_limit(mut self, read_limit: usize) -> Self {
        self.read_limit = read_limit;
        self
    }

    pub fn with_read_delay(mut self, read_delay: Duration) -> Self {
        self.read_delay = read_delay;
        self
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

impl From<&TableConfig> for TableDescriptor {
    fn from(config: &TableConfig) -> Self {
        Self {
            name: config.name.clone(),
            source_name: config.source_name.clone(),
            filter: config.filter.clone(),
            read_limit: config.read_limit,
            read_delay: config.read_delay(),
            primary_key: config.primary_key.clone(),
            columns: config
                .columns
                .iter()
                .map(|column| ColumnDescriptor::new(column.name.clone()))
                .collect(),
        }
    }
}

/// The source and target table of a single shift, used to label logs and errors.
#[derive(Debug, Clone, Copy)]
pub struct TablePair<'a> {
    pub source: &'a TableDescriptor,
    pub target: &'a TableDescriptor,
}

impl fmt::Display for TablePair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.name, self.target.name)
    }
}
