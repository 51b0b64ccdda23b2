//! Connection configuration.

use crate::types::ColumnSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DbPath {
    /// Non-persistent database, gone once the connection closes.
    Memory,
    File(PathBuf),
}

impl DbPath {
    /// Sentinel path meaning "in memory".
    pub const MEMORY: &'static str = ":memory:";
}

impl From<&str> for DbPath {
    fn from(path: &str) -> Self {
        if path == Self::MEMORY {
            DbPath::Memory
        } else {
            DbPath::File(PathBuf::from(path))
        }
    }
}

impl From<String> for DbPath {
    fn from(path: String) -> Self {
        DbPath::from(path.as_str())
    }
}

impl From<PathBuf> for DbPath {
    fn from(path: PathBuf) -> Self {
        DbPath::File(path)
    }
}

impl From<&std::path::Path> for DbPath {
    fn from(path: &std::path::Path) -> Self {
        DbPath::File(path.to_path_buf())
    }
}

impl From<DbPath> for String {
    fn from(path: DbPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbPath::Memory => f.write_str(Self::MEMORY),
            DbPath::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }
}

/// Tables created, in order, when a connection opens.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }
}

/// Sqliter connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliterConfig {
    /// Database file, or `:memory:`
    pub path: DbPath,
    /// Tables to create on connect
    #[serde(default)]
    pub schema: Schema,
}

impl SqliterConfig {
    pub fn new(path: impl Into<DbPath>) -> Self {
        Self {
            path: path.into(),
            schema: Schema::new(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}
