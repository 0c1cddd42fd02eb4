use std::time::Duration;

/// In-memory database path understood by SQLite
pub const IN_MEMORY: &str = ":memory:";

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: String,
    /// Table used by table-scoped operations, if known up front
    pub table: Option<String>,
    /// How long to wait on a locked database before failing
    pub busy_timeout: Option<Duration>,
}

impl SqliteConfig {
    /// Create a new SQLite config for the file at `db_path`
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table: None,
            busy_timeout: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}
