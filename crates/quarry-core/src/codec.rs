//! Encoder / decoder between typed records and untyped rows
//!
//! `encode` turns a record into a `Row` keyed by physical column name;
//! `decode` is its inverse. Both apply the descriptor's field-to-column
//! overrides and normalise values through each field's declared type.

use crate::descriptor::{FieldDescriptor, Record, RecordDescriptor};
use crate::errors::{ExError, QuarryError, Result};
use crate::value::{FromValue, ToValue, Value};

/// An untyped row: ordered column name / value pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a column, replacing any existing value of the same name
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(pos).1)
    }

    /// Value of the first column, used for aggregate results
    pub fn first(&self) -> Option<&Value> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Collects field values while a record encodes itself
pub struct FieldWriter {
    descriptor: &'static RecordDescriptor,
    values: Vec<Option<Value>>,
}

impl FieldWriter {
    pub fn new(descriptor: &'static RecordDescriptor) -> Self {
        Self {
            descriptor,
            values: vec![None; descriptor.fields.len()],
        }
    }

    /// Record the value of one declared field
    ///
    /// # Errors
    ///
    /// Fails for undeclared fields, fields written twice, NULL in a
    /// non-nullable field and values that do not fit the declared type.
    pub fn put<V: ToValue + ?Sized>(&mut self, field: &str, value: &V) -> Result<()> {
        let position = self
            .descriptor
            .fields
            .iter()
            .position(|f| f.name == field)
            .ok_or_else(|| QuarryError::UnknownField {
                record: self.descriptor.type_name.to_string(),
                field: field.to_string(),
            })?;
        let declared = &self.descriptor.fields[position];

        if self.values[position].is_some() {
            return Err(QuarryError::FieldEncodedTwice {
                record: self.descriptor.type_name.to_string(),
                field: field.to_string(),
            }
            .into());
        }

        let value = value.to_value();
        if value.is_null() && !declared.nullable {
            return Err(QuarryError::UnexpectedNull {
                column: declared.column_name().to_string(),
            }
            .into());
        }
        let value = declared
            .field_type
            .normalize(declared.column_name(), value)?;
        self.values[position] = Some(value);
        Ok(())
    }

    fn finish(self) -> Result<Row> {
        let mut row = Row::with_capacity(self.values.len());
        for (declared, value) in self.descriptor.fields.iter().zip(self.values) {
            let value = value.ok_or_else(|| QuarryError::FieldNotEncoded {
                record: self.descriptor.type_name.to_string(),
                field: declared.name.to_string(),
            })?;
            row.insert(declared.column_name(), value);
        }
        Ok(row)
    }
}

/// Read access to a row while a record decodes itself
pub struct FieldReader<'a> {
    descriptor: &'static RecordDescriptor,
    row: &'a Row,
}

impl<'a> FieldReader<'a> {
    pub fn new(descriptor: &'static RecordDescriptor, row: &'a Row) -> Self {
        Self { descriptor, row }
    }

    /// Decode one declared field
    ///
    /// # Errors
    ///
    /// `MissingColumn` when the row lacks the field's column, `TypeMismatch`
    /// or `InvalidData` when the stored variant cannot become `T`.
    pub fn get<T: FromValue>(&self, field: &str) -> Result<T> {
        let declared = self.declared(field)?;
        let column = declared.column_name();
        let stored = self
            .row
            .get(column)
            .cloned()
            .ok_or_else(|| QuarryError::MissingColumn {
                column: column.to_string(),
            })?;

        if stored.is_null() && !declared.nullable {
            return Err(QuarryError::UnexpectedNull {
                column: column.to_string(),
            }
            .into());
        }

        let normalized = declared.field_type.normalize(column, stored)?;
        Ok(T::from_value(column, normalized)?)
    }

    fn declared(&self, field: &str) -> Result<&'static FieldDescriptor> {
        self.descriptor.field(field).ok_or_else(|| {
            QuarryError::UnknownField {
                record: self.descriptor.type_name.to_string(),
                field: field.to_string(),
            }
            .into()
        })
    }
}

/// Encode a record into a row keyed by physical column name
///
/// # Errors
///
/// Fails with a data-mapping error when the record's own field writing
/// fails; storage is never involved.
pub fn encode<R: Record>(record: &R) -> Result<Row> {
    let descriptor = R::descriptor();
    let mut writer = FieldWriter::new(descriptor);
    record
        .write_fields(&mut writer)
        .and_then(|_| writer.finish())
        .map_err(|e| with_context(e, "encode", descriptor))
}

/// Decode a row into a record
///
/// # Errors
///
/// Fails with `MissingColumn`, `TypeMismatch` or `InvalidData`; never
/// panics on malformed rows.
pub fn decode<R: Record>(row: &Row) -> Result<R> {
    let descriptor = R::descriptor();
    R::read_fields(&FieldReader::new(descriptor, row))
        .map_err(|e| with_context(e, "decode", descriptor))
}

fn with_context(err: ExError, op: &str, descriptor: &RecordDescriptor) -> ExError {
    let err = err.or_op(op);
    if err.table().is_some() {
        err
    } else {
        err.with_table(descriptor.table_id())
    }
}
