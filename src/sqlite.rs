//! Connection wrapper with a current table and CRUD shorthands.
//!
//! A [`Database`] owns one SQLite connection. Table-scoped methods build
//! their statements with [`SqlQuery`] against the table chosen with
//! [`Database::set_table`]. The `*_simple` variants take [`Params`] for an
//! equality WHERE clause, the others take a raw expression plus its values.
//!
//! Statements are committed as they run unless they execute inside
//! [`Database::run_in_transaction`].
//!
//! A `Database` does no locking of its own. Share it through
//! [`SharedDatabase`](crate::shared::SharedDatabase) when more than one
//! thread needs it.

use crate::config::SqliteConfig;
use crate::error::{Result, SqliteError};
use crate::query::{Order, SqlQuery};
use crate::value::{Columns, Params, Record, Value};
use rusqlite::{params_from_iter, Connection};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Fully read result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<Record>,
    rows_affected: usize,
    insert_id: Option<i64>,
}

impl Cursor {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Rows changed by an INSERT/UPDATE/DELETE. Zero for queries.
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    /// Rowid generated by an INSERT
    pub fn insert_id(&self) -> Option<i64> {
        self.insert_id
    }

    pub fn fetch_one(self) -> Option<Record> {
        self.rows.into_iter().next()
    }

    pub fn fetch_all(self) -> Vec<Record> {
        self.rows
    }
}

/// SQLite connection with a current table.
#[derive(Debug)]
pub struct Database {
    connection: Option<Connection>,
    table: Option<String>,
    auto_commit: bool,
    rows_affected: usize,
    insert_id: Option<i64>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        info!(target: "sqlite_object", path = %path.display(), "opened database");
        Ok(Self::from_connection(connection))
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        info!(target: "sqlite_object", "opened in-memory database");
        Ok(Self::from_connection(connection))
    }

    /// Open the database described by `config`.
    pub fn with_config(config: &SqliteConfig) -> Result<Self> {
        let mut db = Self::open(&config.db_path)?;
        if let Some(timeout) = config.busy_timeout {
            db.connection()?.busy_timeout(timeout)?;
        }
        if let Some(table) = &config.table {
            db.set_table(table.clone());
        }
        Ok(db)
    }

    /// Wrap an already open connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
            table: None,
            auto_commit: true,
            rows_affected: 0,
            insert_id: None,
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(SqliteError::ConnectionClosed)
    }

    pub fn set_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// The current table, or [`SqliteError::NoTableSet`].
    pub fn table(&self) -> Result<&str> {
        self.table
            .as_deref()
            .filter(|table| !table.is_empty())
            .ok_or(SqliteError::NoTableSet)
    }

    /// `false` while a unit of work runs in [`run_in_transaction`](Self::run_in_transaction).
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    /// Run one statement without committing.
    pub fn execute(&mut self, sql: &str, values: &[Value]) -> Result<Cursor> {
        self.run(sql, values, None)
    }

    /// Run one statement and commit it, unless a transaction is in progress.
    pub fn execute_commit(&mut self, sql: &str, values: &[Value]) -> Result<Cursor> {
        let cursor = self.execute(sql, values)?;
        if self.auto_commit {
            let connection = self.connection()?;
            if !connection.is_autocommit() {
                connection.execute_batch("COMMIT")?;
            }
        }
        Ok(cursor)
    }

    /// Rowid of the last INSERT run on this database.
    pub fn insert_id(&self) -> Option<i64> {
        self.insert_id
    }

    /// Rows changed by the last statement.
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    fn run(&mut self, sql: &str, values: &[Value], max_rows: Option<usize>) -> Result<Cursor> {
        debug!(target: "sqlite_object::sql", sql, values = values.len(), "executing statement");
        let connection = self.connection()?;
        let mut statement = connection.prepare(sql)?;
        let expected = statement.parameter_count();
        if expected != values.len() {
            return Err(SqliteError::PlaceholderMismatch {
                expected,
                supplied: values.len(),
            });
        }

        let readonly = statement.readonly();
        let rowid_before = connection.last_insert_rowid();
        let mut cursor = Cursor {
            columns: statement
                .column_names()
                .into_iter()
                .map(String::from)
                .collect(),
            ..Cursor::default()
        };

        let mut rows = statement.query(params_from_iter(values.iter()))?;
        while let Some(row) = rows.next()? {
            if max_rows.is_some_and(|max| cursor.rows.len() >= max) {
                // A write is only complete once every row has been stepped.
                if readonly {
                    break;
                }
                continue;
            }
            let mut fields = Vec::with_capacity(cursor.columns.len());
            for (idx, name) in cursor.columns.iter().enumerate() {
                fields.push((name.clone(), row.get::<_, Value>(idx)?));
            }
            cursor.rows.push(Record::new(fields));
        }
        drop(rows);
        drop(statement);

        if !readonly {
            cursor.rows_affected = connection.changes() as usize;
            let rowid_after = connection.last_insert_rowid();
            if rowid_after != rowid_before {
                cursor.insert_id = Some(rowid_after);
            }
        }

        self.rows_affected = cursor.rows_affected;
        if cursor.insert_id.is_some() {
            self.insert_id = cursor.insert_id;
        }
        Ok(cursor)
    }

    /// Execute a finished builder.
    pub(crate) fn run_query(&mut self, mut query: SqlQuery, max_rows: Option<usize>) -> Result<Cursor> {
        let sql = query.take_sql();
        let values = query.take_placeholder_values();
        self.run(&sql, &values, max_rows)
    }

    pub(crate) fn commit_query(&mut self, mut query: SqlQuery) -> Result<Cursor> {
        let sql = query.take_sql();
        let values = query.take_placeholder_values();
        self.execute_commit(&sql, &values)
    }

    fn select_raw(
        &self,
        columns: Columns,
        where_sql: Option<&str>,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
        values: &[Value],
    ) -> Result<SqlQuery> {
        let table = self.table()?;
        let where_sql = where_sql.unwrap_or_default();

        let mut query = SqlQuery::new();
        query
            .select(table, columns)
            .where_sql(where_sql)
            .order_by(order_by.iter().copied());
        if let Some((offset, count)) = limit {
            query.limit(offset, count);
        }
        query.bind(values.iter().cloned());
        Ok(query)
    }

    fn select_simple(
        &self,
        columns: Columns,
        conditions: &Params,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
    ) -> Result<SqlQuery> {
        let mut query = SqlQuery::new();
        query
            .select(self.table()?, columns)
            .where_simple(conditions)
            .order_by(order_by.iter().copied());
        if let Some((offset, count)) = limit {
            query.limit(offset, count);
        }
        Ok(query)
    }

    /// First row matching a raw WHERE expression, `None` if nothing matches.
    pub fn fetch_one(
        &mut self,
        columns: impl Into<Columns>,
        where_sql: Option<&str>,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
        values: &[Value],
    ) -> Result<Option<Record>> {
        let query = self.select_raw(columns.into(), where_sql, order_by, limit, values)?;
        Ok(self.run_query(query, Some(1))?.fetch_one())
    }

    /// First row whose columns equal `conditions`.
    pub fn fetch_one_simple(
        &mut self,
        columns: impl Into<Columns>,
        conditions: &Params,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
    ) -> Result<Option<Record>> {
        let query = self.select_simple(columns.into(), conditions, order_by, limit)?;
        Ok(self.run_query(query, Some(1))?.fetch_one())
    }

    pub fn fetch_all(
        &mut self,
        columns: impl Into<Columns>,
        where_sql: Option<&str>,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
        values: &[Value],
    ) -> Result<Vec<Record>> {
        let query = self.select_raw(columns.into(), where_sql, order_by, limit, values)?;
        Ok(self.run_query(query, None)?.fetch_all())
    }

    pub fn fetch_all_simple(
        &mut self,
        columns: impl Into<Columns>,
        conditions: &Params,
        order_by: &[(&str, Order)],
        limit: Option<(u64, u64)>,
    ) -> Result<Vec<Record>> {
        let query = self.select_simple(columns.into(), conditions, order_by, limit)?;
        Ok(self.run_query(query, None)?.fetch_all())
    }

    /// All rows of a hand-written query.
    pub fn fetch_all_by_query(&mut self, sql: &str, values: &[Value]) -> Result<Vec<Record>> {
        Ok(self.run(sql, values, None)?.fetch_all())
    }

    pub fn fetch_one_by_query(&mut self, sql: &str, values: &[Value]) -> Result<Option<Record>> {
        Ok(self.run(sql, values, Some(1))?.fetch_one())
    }

    pub fn insert(&mut self, values: &Params) -> Result<()> {
        let mut query = SqlQuery::new();
        query.insert(self.table()?, values);
        self.commit_query(query)?;
        Ok(())
    }

    /// Update rows matching a raw WHERE expression.
    ///
    /// `where_values` are bound after the SET values.
    pub fn update(&mut self, values: &Params, where_sql: &str, where_values: &[Value]) -> Result<()> {
        let table = self.table()?;

        let mut query = SqlQuery::new();
        query
            .update(table, values)
            .where_sql(where_sql)
            .bind(where_values.iter().cloned());
        self.commit_query(query)?;
        Ok(())
    }

    pub fn update_simple(&mut self, values: &Params, conditions: &Params) -> Result<()> {
        let mut query = SqlQuery::new();
        query.update_simple(self.table()?, values, conditions);
        self.commit_query(query)?;
        Ok(())
    }

    /// Update the rows matching `conditions`, or insert `values` if there are none.
    ///
    /// The read and the write are separate statements. Two callers racing on
    /// the same conditions can both see no row and both insert.
    pub fn replace(&mut self, values: &Params, conditions: &Params) -> Result<()> {
        if self
            .fetch_one_simple(Columns::All, conditions, &[], None)?
            .is_some()
        {
            self.update_simple(values, conditions)
        } else {
            self.insert(values)
        }
    }

    pub fn delete(&mut self, where_sql: &str, values: &[Value]) -> Result<()> {
        let table = self.table()?;

        let mut query = SqlQuery::new();
        query
            .delete(table, Some(where_sql))
            .bind(values.iter().cloned());
        self.commit_query(query)?;
        Ok(())
    }

    pub fn delete_simple(&mut self, conditions: &Params) -> Result<()> {
        let mut query = SqlQuery::new();
        query.delete(self.table()?, None).where_simple(conditions);
        self.commit_query(query)?;
        Ok(())
    }

    /// `SELECT COUNT(<column>) AS num_rows` over rows matching `conditions`.
    pub fn get_num_rows(&mut self, conditions: &Params, column: &str) -> Result<i64> {
        let mut query = SqlQuery::new();
        query
            .select(self.table()?, format!("COUNT({column}) AS num_rows"))
            .where_simple(conditions);
        let record = self.run_query(query, Some(1))?.fetch_one();
        Ok(record
            .and_then(|record| record.get("num_rows").and_then(Value::as_i64))
            .unwrap_or(0))
    }

    /// Shorthand for `get_num_rows(conditions, "*")`.
    pub fn count(&mut self, conditions: &Params) -> Result<i64> {
        self.get_num_rows(conditions, "*")
    }

    /// Run `work` as one transaction.
    ///
    /// Commits when `work` returns `Ok`. On `Err` everything `work` executed
    /// is rolled back and the error is returned as is. A panic inside `work`
    /// also rolls back before unwinding continues. Nesting is rejected with
    /// [`SqliteError::TransactionActive`].
    pub fn run_in_transaction<T, E, F>(&mut self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<SqliteError>,
    {
        if !self.auto_commit {
            return Err(SqliteError::TransactionActive.into());
        }
        self.connection()?
            .execute_batch("BEGIN")
            .map_err(SqliteError::from)?;
        debug!(target: "sqlite_object", "transaction started");

        self.auto_commit = false;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(self)));
        self.auto_commit = true;

        match outcome {
            Ok(Ok(value)) => match self.commit() {
                Ok(()) => {
                    debug!(target: "sqlite_object", "transaction committed");
                    Ok(value)
                }
                Err(err) => {
                    self.rollback();
                    Err(err.into())
                }
            },
            Ok(Err(err)) => {
                warn!(target: "sqlite_object", "unit of work failed, rolling back");
                self.rollback();
                Err(err)
            }
            Err(payload) => {
                warn!(target: "sqlite_object", "unit of work panicked, rolling back");
                self.rollback();
                panic::resume_unwind(payload)
            }
        }
    }

    fn commit(&self) -> Result<()> {
        self.connection()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) {
        let result = self.connection().and_then(|connection| {
            // SQLite may already have rolled back on its own.
            if !connection.is_autocommit() {
                connection.execute_batch("ROLLBACK")?;
            }
            Ok(())
        });
        if let Err(err) = result {
            error!(target: "sqlite_object", error = %err, "rollback failed");
        }
    }

    /// Close the connection. Later calls fail with [`SqliteError::ConnectionClosed`].
    pub fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(|(_, err)| SqliteError::from(err))?;
            info!(target: "sqlite_object", "closed database");
        }
        Ok(())
    }
}
