//! Async table helpers over an embedded SQLite database.
//!
//! # Intention
//!
//! - Less boilerplate than raw `rusqlite` calls for create/insert/update/delete/select.
//! - Every operation is a future; the connection lives on its own thread.
//! - Values are always bound as parameters. Table names, column names,
//!   column options and raw conditions are inserted into the SQL as given.
//!
//! # Architectural Boundaries
//!
//! - No ORM, no migrations, no pooling: one connection per [`Sqliter`].
//! - Engine errors are passed through unchanged as [`Error::Sqlite`].
//!
//! ```ignore
//! use sqliter::{Condition, ColumnSpec, Fields, Sqliter, TYPE};
//!
//! let db = Sqliter::connect(":memory:").await?;
//! db.create_table("users", &[
//!     ColumnSpec::new("id", TYPE::INTEGER).with_options("PRIMARY KEY"),
//!     ColumnSpec::new("name", TYPE::TEXT),
//! ]).await?;
//! db.save("users", Fields::new().with("id", 1).with("name", "ann")).await?;
//! let row = db.find("users", &[Condition::eq("id", 1)]).await?;
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod connection;
pub mod error;
pub mod sqliter;
pub mod types;

pub use condition::{Condition, QueryOperator};
pub use config::{DbPath, Schema, SqliterConfig, TableDefinition};
pub use connection::{Connection, Executor};
pub use error::{Error, Result};
pub use sqliter::{params, Sqliter};
pub use types::{ColumnSpec, ColumnType, Fields, Row, SqlQuery, Value, TYPE};

/// Open `path` (a file, or `:memory:`). Same as [`Sqliter::connect`].
pub async fn connect(path: impl Into<DbPath>) -> Result<Sqliter> {
    Sqliter::connect(path).await
}
