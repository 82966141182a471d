//! Query specification compiler
//!
//! Clause order is fixed: SELECT, FROM, JOIN (declaration order), WHERE,
//! GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET. Bindings follow the same
//! order: WHERE, then HAVING, then LIMIT/OFFSET. No caller value is ever
//! written into the SQL text.

use crate::codec::Row;
use crate::descriptor::ColumnMapper;
use crate::errors::{QuarryError, Result};
use crate::ident::quote_ident;
use crate::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::value::Value;

/// A compiled statement ready for the storage engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }
}

/// Compile a full SELECT
///
/// # Errors
///
/// Propagates predicate compilation failures (empty IN lists, bad
/// identifiers).
pub fn compile_select(
    spec: &QuerySpec,
    table: &str,
    mapper: &dyn ColumnMapper,
) -> Result<Statement> {
    let mut stmt = Statement::new("SELECT ");
    write_select_list(spec, table, mapper, &mut stmt.sql)?;
    write_from(spec, table, &mut stmt.sql)?;
    write_condition(" WHERE ", spec.predicate(), mapper, &mut stmt)?;

    if !spec.group_columns().is_empty() {
        stmt.sql.push_str(" GROUP BY ");
        write_column_list(spec.group_columns(), mapper, &mut stmt.sql)?;
    }
    write_condition(" HAVING ", spec.having_predicate(), mapper, &mut stmt)?;

    if !spec.ordering().is_empty() {
        stmt.sql.push_str(" ORDER BY ");
        for (i, term) in spec.ordering().iter().enumerate() {
            if i > 0 {
                stmt.sql.push_str(", ");
            }
            stmt.sql
                .push_str(&quote_ident(&mapper.column_for(&term.column))?);
            stmt.sql.push(' ');
            stmt.sql.push_str(term.direction.as_sql());
        }
    }

    write_paging(spec, &mut stmt);
    Ok(stmt)
}

/// Compile a COUNT over the rows `spec` would select
///
/// Specifications whose row set is shaped by more than FROM/JOIN/WHERE
/// (GROUP BY, HAVING, paging, or a select list with expressions such as
/// `DISTINCT name`) are wrapped in a subquery, so the count always equals
/// the number of rows [`compile_select`] returns.
///
/// # Errors
///
/// Same as [`compile_select`].
pub fn compile_count(
    spec: &QuerySpec,
    table: &str,
    mapper: &dyn ColumnMapper,
) -> Result<Statement> {
    let needs_subquery = !spec.group_columns().is_empty()
        || spec.having_predicate().is_some()
        || spec.limit_value().is_some()
        || spec.offset_value().is_some()
        || spec.columns().iter().any(|c| !is_plain_identifier(c));

    if needs_subquery {
        let inner = compile_select(spec, table, mapper)?;
        return Ok(Statement::with_bindings(
            format!("SELECT COUNT(*) FROM ({})", inner.sql),
            inner.bindings,
        ));
    }

    let mut stmt = Statement::new("SELECT COUNT(*)");
    write_from(spec, table, &mut stmt.sql)?;
    write_condition(" WHERE ", spec.predicate(), mapper, &mut stmt)?;
    Ok(stmt)
}

/// Compile an UPDATE of the rows matched by `spec`
///
/// `assignments` is keyed by physical column name. The identity column is
/// never assigned, even when present.
///
/// # Errors
///
/// `InvalidOperation` when nothing remains to assign, plus predicate
/// compilation failures.
pub fn compile_update(
    spec: &QuerySpec,
    table: &str,
    mapper: &dyn ColumnMapper,
    assignments: &Row,
    identity_column: &str,
) -> Result<Statement> {
    let mut stmt = Statement::new(format!("UPDATE {} SET ", quote_ident(table)?));
    let mut assigned = 0;
    for (column, value) in assignments.iter() {
        if column == identity_column {
            continue;
        }
        if assigned > 0 {
            stmt.sql.push_str(", ");
        }
        stmt.sql.push_str(&quote_ident(column)?);
        stmt.sql.push_str(" = ?");
        stmt.bindings.push(value.clone());
        assigned += 1;
    }

    if assigned == 0 {
        return Err(QuarryError::EmptyAssignment {
            table: table.to_string(),
        }
        .into());
    }

    write_condition(" WHERE ", spec.predicate(), mapper, &mut stmt)?;
    Ok(stmt)
}

/// Compile an INSERT of one encoded row
///
/// An empty row inserts `DEFAULT VALUES`.
///
/// # Errors
///
/// Fails only for unquotable identifiers.
pub fn compile_insert(table: &str, row: &Row) -> Result<Statement> {
    let table = quote_ident(table)?;
    if row.is_empty() {
        return Ok(Statement::new(format!("INSERT INTO {} DEFAULT VALUES", table)));
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut bindings = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        columns.push(quote_ident(column)?);
        bindings.push(value.clone());
    }
    let placeholders = vec!["?"; columns.len()].join(", ");

    Ok(Statement::with_bindings(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        ),
        bindings,
    ))
}

/// Compile a DELETE of the rows matched by `spec`
///
/// Only the predicate applies; ordering and paging are ignored.
///
/// # Errors
///
/// Propagates predicate compilation failures.
pub fn compile_delete(
    spec: &QuerySpec,
    table: &str,
    mapper: &dyn ColumnMapper,
) -> Result<Statement> {
    let mut stmt = Statement::new(format!("DELETE FROM {}", quote_ident(table)?));
    write_condition(" WHERE ", spec.predicate(), mapper, &mut stmt)?;
    Ok(stmt)
}

impl QuerySpec {
    /// Compiled SELECT against `table`, for display or explain output
    ///
    /// # Errors
    ///
    /// Same as [`compile_select`].
    pub fn select_statement(&self, table: &str, mapper: &dyn ColumnMapper) -> Result<Statement> {
        compile_select(self, table, mapper)
    }

    /// Compiled COUNT against `table`
    ///
    /// # Errors
    ///
    /// Same as [`compile_count`].
    pub fn count_statement(&self, table: &str, mapper: &dyn ColumnMapper) -> Result<Statement> {
        compile_count(self, table, mapper)
    }
}

fn write_select_list(
    spec: &QuerySpec,
    table: &str,
    mapper: &dyn ColumnMapper,
    sql: &mut String,
) -> Result<()> {
    if spec.columns().is_empty() {
        if spec.joins().is_empty() {
            sql.push('*');
        } else {
            // Joined tables share column names such as `id`; keep the
            // primary table's row shape.
            sql.push_str(&quote_ident(table)?);
            sql.push_str(".*");
        }
        return Ok(());
    }

    for (i, column) in spec.columns().iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        if is_plain_identifier(column) {
            sql.push_str(&quote_ident(&mapper.column_for(column))?);
        } else {
            sql.push_str(column);
        }
    }
    Ok(())
}

fn write_from(spec: &QuerySpec, table: &str, sql: &mut String) -> Result<()> {
    sql.push_str(" FROM ");
    sql.push_str(&quote_ident(table)?);
    for join in spec.joins() {
        sql.push(' ');
        sql.push_str(join.kind.as_sql());
        sql.push(' ');
        sql.push_str(&quote_ident(&join.table)?);
        sql.push_str(" ON ");
        sql.push_str(&join.on);
    }
    Ok(())
}

fn write_condition(
    keyword: &str,
    predicate: Option<&Predicate>,
    mapper: &dyn ColumnMapper,
    stmt: &mut Statement,
) -> Result<()> {
    if let Some(predicate) = predicate {
        let fragment = predicate.compile(mapper)?;
        stmt.sql.push_str(keyword);
        stmt.sql.push_str(&fragment.sql);
        stmt.bindings.extend(fragment.bindings);
    }
    Ok(())
}

fn write_column_list(columns: &[String], mapper: &dyn ColumnMapper, sql: &mut String) -> Result<()> {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&quote_ident(&mapper.column_for(column))?);
    }
    Ok(())
}

fn write_paging(spec: &QuerySpec, stmt: &mut Statement) {
    match (spec.limit_value(), spec.offset_value()) {
        (Some(limit), offset) => {
            stmt.sql.push_str(" LIMIT ?");
            stmt.bindings.push(Value::Integer(clamp(limit)));
            if let Some(offset) = offset {
                stmt.sql.push_str(" OFFSET ?");
                stmt.bindings.push(Value::Integer(clamp(offset)));
            }
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        (None, Some(offset)) => {
            stmt.sql.push_str(" LIMIT -1 OFFSET ?");
            stmt.bindings.push(Value::Integer(clamp(offset)));
        }
        (None, None) => {}
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
