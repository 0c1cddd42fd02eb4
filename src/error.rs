//! Error types for sqlite_object

use thiserror::Error;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, SqliteError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum SqliteError {
    /// A table-scoped operation ran before `set_table()`
    #[error("No table set. Use set_table() first.")]
    NoTableSet,

    /// The connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// The statement's parameter count and the supplied values disagree
    #[error("Placeholder mismatch: statement expects {expected} value(s), {supplied} supplied")]
    PlaceholderMismatch { expected: usize, supplied: usize },

    /// `run_in_transaction` was entered while a transaction is running
    #[error("Transaction already in progress")]
    TransactionActive,

    /// Service used before `start()`
    #[error("Service not started")]
    NotStarted,

    /// Statement rejected by SQLite
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl SqliteError {
    /// Check if this is a missing table error
    pub fn is_no_table_set(&self) -> bool {
        matches!(self, Self::NoTableSet)
    }

    /// Check if this is a closed connection error
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// The engine's own message, if SQLite produced this error
    pub fn sqlite_message(&self) -> Option<String> {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message))) => Some(message.clone()),
            Self::Sqlite(err) => Some(err.to_string()),
            _ => None,
        }
    }
}
