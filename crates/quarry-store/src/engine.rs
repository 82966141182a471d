//! Storage engine boundary
//!
//! The rest of quarry only ever asks the engine for parameterized execution,
//! row queries, the last assigned row id and transaction control.

use crate::db::{self, ConnectionSettings};
use crate::errors::{from_rusqlite, from_rusqlite_sql, Result};
use quarry_core::errors::{ExError, ExErrorKind};
use quarry_core::{Row, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Minimal capability set the mapping layer needs from a database
pub trait StorageEngine: Send {
    /// Run a statement, returning the number of affected rows
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<usize>;

    /// Run a query, returning every row keyed by column name
    fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>>;

    /// Row id assigned by the most recent successful INSERT
    fn last_inserted_identity(&self) -> i64;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn in_transaction(&self) -> bool;
}

/// `StorageEngine` over one rusqlite connection
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open and configure a file database
    pub fn open<P: AsRef<Path>>(path: P, settings: &ConnectionSettings) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn, settings, false)?;
        Ok(Self::new(conn))
    }

    /// Open and configure a private in-memory database
    pub fn open_in_memory(settings: &ConnectionSettings) -> Result<Self> {
        let conn = db::open_in_memory()?;
        db::configure(&conn, settings, true)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StorageEngine for SqliteEngine {
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<usize> {
        tracing::debug!(sql, bindings = bindings.len(), "execute");
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| from_rusqlite_sql(e, sql))?;
        stmt.execute(params_from_iter(bindings.iter().map(to_sql)))
            .map_err(|e| from_rusqlite_sql(e, sql))
    }

    fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!(sql, bindings = bindings.len(), "query");
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| from_rusqlite_sql(e, sql))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(bindings.iter().map(to_sql)))
            .map_err(|e| from_rusqlite_sql(e, sql))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| from_rusqlite_sql(e, sql))? {
            let mut decoded = Row::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value: SqlValue = row.get(index).map_err(|e| from_rusqlite_sql(e, sql))?;
                decoded.insert(column.clone(), from_sql(value));
            }
            out.push(decoded);
        }
        tracing::debug!(rows = out.len(), "query complete");
        Ok(out)
    }

    fn last_inserted_identity(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(ExError::new(ExErrorKind::TransactionFailed)
                .with_op("begin")
                .with_message("a transaction is already active"));
        }
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| from_rusqlite(e).with_op("begin"))
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction() {
            return Err(ExError::new(ExErrorKind::NoActiveTransaction).with_op("commit"));
        }
        self.conn.execute_batch("COMMIT").map_err(|e| {
            ExError::new(ExErrorKind::TransactionFailed)
                .with_op("commit")
                .with_message(e.to_string())
                .with_source(from_rusqlite(e))
        })
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction() {
            return Err(ExError::new(ExErrorKind::NoActiveTransaction).with_op("rollback"));
        }
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| from_rusqlite(e).with_op("rollback"))
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(v),
        SqlValue::Real(v) => Value::Real(v),
        SqlValue::Text(v) => Value::Text(v),
        SqlValue::Blob(v) => Value::Blob(v),
    }
}
