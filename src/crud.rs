//! Typed CRUD operations.
//!
//! Each operation names its own table, so executing one does not touch the
//! database's current table.

use crate::error::Result;
use crate::query::{Order, SqlQuery};
use crate::sqlite::Database;
use crate::value::{Columns, Params, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub table: String,
    pub data: Params,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub table: String,
    pub query: Params,
    pub fields: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order_by: Option<Vec<(String, Order)>>,
}

impl ReadOperation {
    /// Read every row of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            query: Params::new(),
            fields: None,
            limit: None,
            offset: None,
            order_by: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub table: String,
    pub query: Params,
    pub updates: Params,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub table: String,
    pub query: Params,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrudOperation {
    Create(CreateOperation),
    Read(ReadOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
}

/// What a [`CrudOperation`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum CrudOutcome {
    Rows(Vec<Record>),
    Written {
        rows_affected: usize,
        insert_id: Option<i64>,
    },
}

impl CrudOutcome {
    /// The rows of a read, empty for writes
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            CrudOutcome::Rows(rows) => rows,
            CrudOutcome::Written { .. } => Vec::new(),
        }
    }

    pub fn rows_affected(&self) -> usize {
        match self {
            CrudOutcome::Rows(_) => 0,
            CrudOutcome::Written { rows_affected, .. } => *rows_affected,
        }
    }
}

impl ReadOperation {
    fn to_query(&self) -> SqlQuery {
        let columns = match &self.fields {
            Some(fields) if !fields.is_empty() => Columns::List(fields.clone()),
            _ => Columns::All,
        };
        let mut query = SqlQuery::new();
        query.select(&self.table, columns).where_simple(&self.query);
        if let Some(order_by) = &self.order_by {
            query.order_by(order_by.iter().map(|(column, dir)| (column, *dir)));
        }
        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                query.limit(offset.unwrap_or(0), limit);
            }
            // SQLite only accepts an offset together with a limit.
            (None, Some(offset)) => {
                query.limit(offset, i64::MAX as u64);
            }
            (None, None) => {}
        }
        query
    }
}

impl Database {
    /// Execute `op` against its own table, committing writes.
    pub fn execute_crud(&mut self, op: &CrudOperation) -> Result<CrudOutcome> {
        let mut query = SqlQuery::new();
        match op {
            CrudOperation::Read(read) => {
                let rows = self.run_query(read.to_query(), None)?.fetch_all();
                return Ok(CrudOutcome::Rows(rows));
            }
            CrudOperation::Create(create) => {
                query.insert(&create.table, &create.data);
            }
            CrudOperation::Update(update) => {
                query.update_simple(&update.table, &update.updates, &update.query);
            }
            CrudOperation::Delete(delete) => {
                query.delete(&delete.table, None).where_simple(&delete.query);
            }
        }
        let cursor = self.commit_query(query)?;
        Ok(CrudOutcome::Written {
            rows_affected: cursor.rows_affected(),
            insert_id: cursor.insert_id(),
        })
    }
}
