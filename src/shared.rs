//! Sharing one [`Database`] between threads.
//!
//! Prefer creating a [`SharedDatabase`] at startup and handing clones to
//! whoever needs it. [`global`] exists for code that cannot be given a handle.

use crate::error::Result;
use crate::sqlite::Database;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

static GLOBAL: Mutex<Option<SharedDatabase>> = Mutex::new(None);

/// Cloneable, thread-safe handle to one [`Database`].
#[derive(Debug, Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(database: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(database)),
        }
    }

    /// Run `f` with exclusive access to the database.
    ///
    /// A panic in an earlier caller does not lock others out.
    pub fn with<T>(&self, f: impl FnOnce(&mut Database) -> T) -> T {
        let mut database = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut database)
    }

    /// Whether both handles point at the same database
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Process-wide database, opened at `path` on the first call.
///
/// Later calls return the same handle whatever path they pass. Creation is
/// serialized, so concurrent first calls still open a single connection.
pub fn global(path: impl AsRef<Path>) -> Result<SharedDatabase> {
    let mut slot = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(shared) = slot.as_ref() {
        return Ok(shared.clone());
    }
    let shared = SharedDatabase::new(Database::open(path.as_ref())?);
    info!(target: "sqlite_object", path = %path.as_ref().display(), "created process-wide database");
    *slot = Some(shared.clone());
    Ok(shared)
}
