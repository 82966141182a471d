//! Typed CRUD against one storage engine
//!
//! A `Session` borrows the engine for the length of one executor job. All
//! SQL is produced by the quarry-core compilers; the session only executes
//! it, decodes rows and remembers which tables it changed so the caller can
//! notify them once the work has committed.

use crate::engine::StorageEngine;
use crate::errors::Result;
use quarry_core::ddl;
use quarry_core::errors::{ExError, ExErrorKind, QuarryError};
use quarry_core::query::{
    compile_count, compile_delete, compile_insert, compile_select, compile_update, Statement,
};
use quarry_core::{col, decode, encode, Identity, QuerySpec, Record, Row, Value};
use quarry_core_types::TableId;
use std::collections::BTreeSet;

pub struct Session<'a> {
    engine: &'a mut dyn StorageEngine,
    touched: BTreeSet<TableId>,
}

impl<'a> Session<'a> {
    pub fn new(engine: &'a mut dyn StorageEngine) -> Self {
        Self {
            engine,
            touched: BTreeSet::new(),
        }
    }

    /// Tables changed through this session
    pub fn touched(&self) -> impl Iterator<Item = &TableId> {
        self.touched.iter()
    }

    pub fn into_touched(self) -> BTreeSet<TableId> {
        self.touched
    }

    pub fn in_transaction(&self) -> bool {
        self.engine.in_transaction()
    }

    /// Run `f` inside BEGIN/COMMIT, rolling back on error
    ///
    /// Joins the surrounding transaction if one is already open. Tables
    /// touched by a rolled-back transaction are forgotten.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T>,
    {
        if self.engine.in_transaction() {
            return f(self);
        }

        let before = self.touched.clone();
        self.engine.begin()?;
        match f(self) {
            Ok(value) => match self.engine.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.abort(before);
                    Err(err)
                }
            },
            Err(err) => {
                self.abort(before);
                Err(err)
            }
        }
    }

    fn abort(&mut self, before: BTreeSet<TableId>) {
        if self.engine.in_transaction() {
            if let Err(err) = self.engine.rollback() {
                tracing::warn!(err_code = err.code(), "rollback failed");
            }
        }
        self.touched = before;
    }

    // ========== Reads ==========

    /// Record with the given identity, or `None`
    pub fn find<R: Record>(&mut self, id: &R::Id) -> Result<Option<R>> {
        let spec = identity_spec::<R>(id)?.limit(1);
        Ok(self.find_all::<R>(&spec)?.into_iter().next())
    }

    /// Every record matched by `spec`; one undecodable row fails the call
    pub fn find_all<R: Record>(&mut self, spec: &QuerySpec) -> Result<Vec<R>> {
        let descriptor = R::descriptor();
        let stmt = compile_select(spec, &descriptor.table_name(), descriptor)?;
        self.query(&stmt)?.iter().map(decode::<R>).collect()
    }

    /// First record matched by `spec`
    pub fn find_first<R: Record>(&mut self, spec: &QuerySpec) -> Result<Option<R>> {
        Ok(self.find_all::<R>(&spec.limit(1))?.into_iter().next())
    }

    pub fn count<R: Record>(&mut self, spec: &QuerySpec) -> Result<u64> {
        let descriptor = R::descriptor();
        let stmt = compile_count(spec, &descriptor.table_name(), descriptor)?;
        let rows = self.query(&stmt)?;
        let value = rows.first().and_then(Row::first).cloned().unwrap_or(Value::Null);
        count_from(value)
    }

    pub fn exists<R: Record>(&mut self, spec: &QuerySpec) -> Result<bool> {
        Ok(self.count::<R>(spec)? > 0)
    }

    // ========== Writes ==========

    /// Insert `record`, writing an engine-assigned identity back into it
    pub fn insert<R: Record>(&mut self, record: &mut R) -> Result<()> {
        let descriptor = R::descriptor();
        let table = descriptor.table_name();
        let mut row = encode(record)?;

        let assign = record.id().is_default();
        if assign {
            if !R::Id::engine_assigned() {
                return Err(QuarryError::IdentityNotAssignable {
                    table: table.to_string(),
                }
                .into());
            }
            row.remove(descriptor.identity_column());
        }

        let stmt = compile_insert(&table, &row)?;
        if !assign {
            self.execute(&stmt)?;
            self.touch(descriptor.table_id());
            return Ok(());
        }

        // A row id the identity type cannot hold undoes the INSERT.
        let id = self.transaction(|session| {
            session.execute(&stmt)?;
            session.touch(descriptor.table_id());
            R::Id::from_row_id(session.engine.last_inserted_identity())
        })?;
        record.set_id(id);
        Ok(())
    }

    /// Insert every record in one transaction
    pub fn insert_all<R: Record>(&mut self, records: &mut [R]) -> Result<()> {
        self.transaction(|session| {
            for record in records.iter_mut() {
                session.insert(record)?;
            }
            Ok(())
        })
    }

    /// Update the row with `record`'s identity; returns affected rows
    ///
    /// Zero affected rows is not an error.
    pub fn update<R: Record>(&mut self, record: &R) -> Result<usize> {
        let row = encode(record)?;
        self.update_row::<R>(&record.id(), &row)
    }

    /// Like [`Session::update`] but fails with `NotFound` when no row has
    /// the record's identity
    pub fn update_existing<R: Record>(&mut self, record: &R) -> Result<()> {
        let row = encode(record)?;
        self.update_existing_row::<R>(&record.id(), &row)
    }

    pub(crate) fn update_existing_row<R: Record>(&mut self, id: &R::Id, row: &Row) -> Result<()> {
        match self.update_row::<R>(id, row)? {
            0 => Err(ExError::new(ExErrorKind::NotFound)
                .with_op("update_existing")
                .with_table(R::descriptor().table_id())
                .with_message(format!("no row with identity {}", id.to_value()))),
            _ => Ok(()),
        }
    }

    pub(crate) fn update_row<R: Record>(&mut self, id: &R::Id, row: &Row) -> Result<usize> {
        let descriptor = R::descriptor();
        let stmt = compile_update(
            &identity_spec::<R>(id)?,
            &descriptor.table_name(),
            descriptor,
            row,
            descriptor.identity_column(),
        )?;
        let affected = self.execute(&stmt)?;
        self.touch(descriptor.table_id());
        Ok(affected)
    }

    /// Update or insert depending on whether the identity already exists
    pub fn save<R: Record>(&mut self, record: &mut R) -> Result<()> {
        if record.id().is_default() {
            return self.insert(record);
        }
        if self.find::<R>(&record.id())?.is_some() {
            self.update(record).map(|_| ())
        } else {
            self.insert(record)
        }
    }

    /// Bulk UPDATE of the rows matched by `spec`
    ///
    /// `assignments` is keyed by field name; the identity is never
    /// assigned.
    pub fn update_where<R: Record>(&mut self, spec: &QuerySpec, assignments: &Row) -> Result<usize> {
        let descriptor = R::descriptor();
        let mut physical = Row::with_capacity(assignments.len());
        for (name, value) in assignments.iter() {
            match descriptor.field(name) {
                Some(field) => {
                    if value.is_null() && !field.nullable {
                        return Err(QuarryError::UnexpectedNull {
                            column: field.column_name().to_string(),
                        }
                        .into());
                    }
                    let value = field.field_type.normalize(field.column_name(), value.clone())?;
                    physical.insert(field.column_name(), value);
                }
                None => {
                    return Err(QuarryError::UnknownField {
                        record: descriptor.type_name.to_string(),
                        field: name.to_string(),
                    }
                    .into())
                }
            }
        }

        let stmt = compile_update(
            spec,
            &descriptor.table_name(),
            descriptor,
            &physical,
            descriptor.identity_column(),
        )?;
        let affected = self.execute(&stmt)?;
        self.touch(descriptor.table_id());
        Ok(affected)
    }

    pub fn delete<R: Record>(&mut self, id: &R::Id) -> Result<usize> {
        self.delete_where::<R>(&identity_spec::<R>(id)?)
    }

    pub fn delete_where<R: Record>(&mut self, spec: &QuerySpec) -> Result<usize> {
        let descriptor = R::descriptor();
        let stmt = compile_delete(spec, &descriptor.table_name(), descriptor)?;
        let affected = self.execute(&stmt)?;
        self.touch(descriptor.table_id());
        Ok(affected)
    }

    pub fn delete_all<R: Record>(&mut self) -> Result<usize> {
        self.delete_where::<R>(&QuerySpec::new())
    }

    // ========== Schema ==========

    /// Create the table and its indexes; harmless if they exist
    pub fn create_table<R: Record>(&mut self) -> Result<()> {
        let descriptor = R::descriptor();
        let create = ddl::create_table_sql(descriptor)?;
        let indexes = ddl::create_index_sql(descriptor)?;
        self.transaction(|session| {
            session.execute(&Statement::new(create))?;
            for index in indexes {
                session.execute(&Statement::new(index))?;
            }
            Ok(())
        })?;
        self.touch(descriptor.table_id());
        Ok(())
    }

    pub fn drop_table<R: Record>(&mut self) -> Result<()> {
        let descriptor = R::descriptor();
        self.execute(&Statement::new(ddl::drop_table_sql(descriptor)?))?;
        self.touch(descriptor.table_id());
        Ok(())
    }

    // ========== Raw ==========

    /// Run a raw statement. No table is marked as changed; use
    /// [`Session::execute_on`] when the statement writes a table that live
    /// queries may be watching.
    pub fn execute(&mut self, stmt: &Statement) -> Result<usize> {
        self.engine.execute(&stmt.sql, &stmt.bindings)
    }

    /// Run a raw statement that writes `table`, marking it as changed
    pub fn execute_on(&mut self, table: TableId, stmt: &Statement) -> Result<usize> {
        let affected = self.execute(stmt)?;
        self.touch(table);
        Ok(affected)
    }

    pub fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        self.engine.query(&stmt.sql, &stmt.bindings)
    }

    fn touch(&mut self, table: TableId) {
        self.touched.insert(table);
    }
}

/// `identity = ?` on the record's identity field
fn identity_spec<R: Record>(id: &R::Id) -> Result<QuerySpec> {
    let identity = R::descriptor().identity_field()?;
    Ok(QuerySpec::matching(col(identity.name).eq(id.to_value())))
}

fn count_from(value: Value) -> Result<u64> {
    let invalid = |reason: String| {
        ExError::new(ExErrorKind::InvalidData)
            .with_op("count")
            .with_message(reason)
    };
    match value {
        Value::Integer(n) => u64::try_from(n).map_err(|_| invalid(format!("negative count {}", n))),
        Value::Real(n) if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 => Ok(n as u64),
        other => Err(invalid(format!(
            "count returned {} instead of a number",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_accepts_integers_and_whole_reals() {
        assert_eq!(count_from(Value::Integer(3)).unwrap(), 3);
        assert_eq!(count_from(Value::Real(2.0)).unwrap(), 2);
    }

    #[test]
    fn test_count_rejects_non_numeric() {
        for value in [
            Value::Text("3".into()),
            Value::Null,
            Value::Blob(vec![3]),
            Value::Integer(-1),
            Value::Real(1.5),
        ] {
            let err = count_from(value).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidData);
        }
    }
}
