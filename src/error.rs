//! Error types for sqliter

use thiserror::Error;

/// Result type alias for sqliter operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Error reported by SQLite, passed through unchanged.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection thread failed in a way SQLite did not report.
    #[error("connection error: {0}")]
    Connection(String),

    /// A row callback passed to `each` panicked. The connection stays usable.
    #[error("row callback panicked")]
    CallbackPanicked,

    /// Insert or update without any column values.
    #[error("no fields given for table '{table}'")]
    EmptyFields { table: String },

    /// A batch row whose columns differ from the first row's.
    #[error("row {row} has columns [{found}], expected [{expected}]")]
    ColumnMismatch {
        row: usize,
        expected: String,
        found: String,
    },
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::ConnectionClosed => Error::ConnectionClosed,
            tokio_rusqlite::Error::Close((_, err)) => Error::Sqlite(err),
            tokio_rusqlite::Error::Rusqlite(err) => Error::Sqlite(err),
            other => Error::Connection(other.to_string()),
        }
    }
}

impl Error {
    /// The underlying SQLite error code, if this came from the engine.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            Error::Sqlite(err) => err.sqlite_error_code(),
            _ => None,
        }
    }
}
