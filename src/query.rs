//! SQL statement builder.
//!
//! [`SqlQuery`] assembles a single statement and the positional `?` values
//! that go with it. Clause methods only concatenate text: table and column
//! names are interpolated as given and must come from trusted code, values
//! are always bound as placeholders.
//!
//! ```
//! use sqlite_object::{Order, SqlQuery};
//!
//! let sql = SqlQuery::new()
//!     .select("tests", "*")
//!     .where_sql("title = ? OR title = ?")
//!     .order_by([("title", Order::Asc)])
//!     .limit(30, 10)
//!     .take_sql();
//! assert_eq!(sql, "SELECT * FROM tests WHERE title = ? OR title = ? ORDER BY title ASC LIMIT 30, 10");
//! ```

use crate::value::{Columns, Params, Value};
use std::fmt;
use std::str::FromStr;

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => f.write_str("ASC"),
            Order::Desc => f.write_str("DESC"),
        }
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Order::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Order::Desc)
        } else {
            Err(format!("invalid sort direction: {s}"))
        }
    }
}

/// Builder for one SQL statement plus its placeholder values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlQuery {
    statement: String,
    placeholder_values: Vec<Value>,
}

impl SqlQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from hand-written statement text. Use [`bind`](Self::bind) for its values.
    pub fn from_sql(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            placeholder_values: Vec::new(),
        }
    }

    /// `SELECT <columns> FROM <table>`
    pub fn select(&mut self, table: &str, columns: impl Into<Columns>) -> &mut Self {
        self.statement = format!("SELECT {} FROM {}", columns.into().to_sql(), table);
        self
    }

    /// Append ` WHERE <expr>` verbatim. Empty expressions are ignored.
    ///
    /// Values for the expression's placeholders are not added here, use
    /// [`bind`](Self::bind) or pass them at execution time.
    pub fn where_sql(&mut self, expr: &str) -> &mut Self {
        if !expr.is_empty() {
            self.statement.push_str(" WHERE ");
            self.statement.push_str(expr);
        }
        self
    }

    /// Append ` WHERE a = ? AND b = ?` from `conditions`, binding their values.
    pub fn where_simple(&mut self, conditions: &Params) -> &mut Self {
        if conditions.is_empty() {
            return self;
        }
        let clause = conditions
            .columns()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(" AND ");
        self.placeholder_values.extend(conditions.values().cloned());
        self.statement.push_str(" WHERE ");
        self.statement.push_str(&clause);
        self
    }

    /// Append ` ORDER BY col dir, ...` in the given sequence.
    pub fn order_by<I, C>(&mut self, order: I) -> &mut Self
    where
        I: IntoIterator<Item = (C, Order)>,
        C: AsRef<str>,
    {
        let parts = order
            .into_iter()
            .map(|(column, dir)| format!("{} {}", column.as_ref(), dir))
            .collect::<Vec<_>>();
        if !parts.is_empty() {
            self.statement.push_str(" ORDER BY ");
            self.statement.push_str(&parts.join(", "));
        }
        self
    }

    /// Append ` LIMIT <offset>, <count>`
    pub fn limit(&mut self, offset: u64, count: u64) -> &mut Self {
        self.statement.push_str(&format!(" LIMIT {offset}, {count}"));
        self
    }

    /// `INSERT INTO <table> (cols) VALUES (?, ...)`
    pub fn insert(&mut self, table: &str, values: &Params) -> &mut Self {
        let columns = values.columns().collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");
        self.placeholder_values.extend(values.values().cloned());
        self.statement = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");
        self
    }

    /// `UPDATE <table> SET a = ?, b = ?`
    pub fn update(&mut self, table: &str, values: &Params) -> &mut Self {
        let set = values
            .columns()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        self.placeholder_values.extend(values.values().cloned());
        self.statement = format!("UPDATE {table} SET {set}");
        self
    }

    /// [`update`](Self::update) followed by [`where_simple`](Self::where_simple).
    pub fn update_simple(&mut self, table: &str, values: &Params, conditions: &Params) -> &mut Self {
        self.update(table, values).where_simple(conditions)
    }

    /// `DELETE FROM <table>[ WHERE <expr>]`
    pub fn delete(&mut self, table: &str, where_sql: Option<&str>) -> &mut Self {
        self.statement = format!("DELETE FROM {table}");
        if let Some(expr) = where_sql {
            self.where_sql(expr);
        }
        self
    }

    /// Append caller-supplied values after the ones the builder generated.
    pub fn bind<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.placeholder_values
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn sql(&self) -> &str {
        &self.statement
    }

    pub fn placeholder_values(&self) -> &[Value] {
        &self.placeholder_values
    }

    /// Return the statement text and leave the buffer empty.
    pub fn take_sql(&mut self) -> String {
        std::mem::take(&mut self.statement)
    }

    /// Return the bound values and leave the list empty.
    pub fn take_placeholder_values(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.placeholder_values)
    }
}
