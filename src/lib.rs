//! Small query builder and CRUD helpers on top of SQLite.
//!
//! # Intention
//!
//! - Build parameterized statements from ordered column/value pairs.
//! - Run fetch/insert/update/delete shorthands against a current table.
//! - Keep SQLite-specific types and error handling in one place.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No SQL parsing, schema migration or connection pooling.
//!
//! ```
//! use sqlite_object::{Columns, Database, Params};
//!
//! # fn main() -> sqlite_object::Result<()> {
//! let mut db = Database::open_in_memory()?;
//! db.execute("CREATE TABLE tests (title TEXT NOT NULL)", &[])?;
//! db.set_table("tests");
//!
//! db.insert(&Params::new().with_value("title", "test"))?;
//! let row = db.fetch_one_simple(Columns::All, &Params::new().with_value("title", "test"), &[], None)?;
//! assert!(row.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crud;
pub mod error;
pub mod query;
pub mod service;
pub mod shared;
pub mod sqlite;
pub mod value;

pub use config::SqliteConfig;
pub use crud::{
    CreateOperation, CrudOperation, CrudOutcome, DeleteOperation, ReadOperation, UpdateOperation,
};
pub use error::{Result, SqliteError};
pub use query::{Order, SqlQuery};
pub use service::{Lifecycle, SqliteService};
pub use shared::SharedDatabase;
pub use sqlite::{Cursor, Database};
pub use value::{Columns, Params, Record, Value};
