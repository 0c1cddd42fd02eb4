//! Async service wrapper around a [`Database`].
//!
//! The service opens its database on [`Lifecycle::start`] and closes it on
//! [`Lifecycle::stop`]. Statements still run synchronously, one at a time,
//! behind an async mutex.

use crate::config::SqliteConfig;
use crate::crud::{CrudOperation, CrudOutcome};
use crate::error::SqliteError;
use crate::query::SqlQuery;
use crate::sqlite::Database;
use crate::value::Record;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::sync::Arc;
use tracing::info;

/// Start/stop hooks for long-lived services
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;
}

pub struct SqliteService {
    config: SqliteConfig,
    connection: Option<Arc<Mutex<Database>>>,
}

impl SqliteService {
    /// Create a new SQLite service with the given config
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.connection.is_some()
    }

    /// Handle to the open database. Fails before `start()`.
    pub fn database(&self) -> Result<Arc<Mutex<Database>>> {
        Ok(self.connection.clone().ok_or(SqliteError::NotStarted)?)
    }

    /// Run a built statement and return its rows. Writes are committed.
    pub async fn execute_sql(&self, mut query: SqlQuery) -> Result<Vec<Record>> {
        let database = self.database()?;
        let mut database = database.lock().await;
        let sql = query.take_sql();
        let values = query.take_placeholder_values();
        let cursor = database
            .execute_commit(&sql, &values)
            .with_context(|| format!("failed to execute `{sql}`"))?;
        Ok(cursor.fetch_all())
    }

    /// Perform a CRUD operation (type-safe API)
    pub async fn execute_crud(&self, op: CrudOperation) -> Result<CrudOutcome> {
        let database = self.database()?;
        let mut database = database.lock().await;
        database
            .execute_crud(&op)
            .with_context(|| format!("crud operation failed: {op:?}"))
    }
}

#[async_trait]
impl Lifecycle for SqliteService {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn start(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        info!(target: "sqlite_object", path = %self.config.db_path, "starting sqlite service");
        let database = Database::with_config(&self.config)
            .with_context(|| format!("failed to open {}", self.config.db_path))?;
        self.connection = Some(Arc::new(Mutex::new(database)));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(database) = self.connection.take() {
            database.lock().await.close()?;
            info!(target: "sqlite_object", "sqlite service stopped");
        }
        Ok(())
    }
}
