//! Record type descriptors
//!
//! A record type declares its table layout once, statically, through a
//! `RecordDescriptor`. The DDL generator, the encoder/decoder and the
//! repository all read the same descriptor; nothing is discovered at
//! runtime.

use std::borrow::Cow;

use quarry_core_types::TableId;
use uuid::Uuid;

use crate::codec::{FieldReader, FieldWriter};
use crate::errors::{QuarryError, Result};
use crate::value::{FieldType, ToValue, Value};

/// One declared field of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub column: Option<&'static str>,
    pub unique: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: false,
            column: None,
            unique: false,
        }
    }

    /// Allow NULL in this column
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Store the field under a different column name
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Declare a single-column UNIQUE constraint
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Physical column name
    pub fn column_name(&self) -> &'static str {
        match self.column {
            Some(column) => column,
            None => self.name,
        }
    }
}

/// A declared secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub unique: bool,
}

impl IndexDescriptor {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            fields,
            unique: false,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Static table metadata for one record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub fields: &'static [FieldDescriptor],
    pub identity: &'static str,
    pub indexes: &'static [IndexDescriptor],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl RecordDescriptor {
    /// Describe a record whose table name is derived from `type_name`
    pub const fn new(
        type_name: &'static str,
        identity: &'static str,
        fields: &'static [FieldDescriptor],
    ) -> Self {
        Self {
            type_name,
            table: None,
            fields,
            identity,
            indexes: &[],
            unique_constraints: &[],
        }
    }

    /// Override the derived table name
    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub const fn indexes(mut self, indexes: &'static [IndexDescriptor]) -> Self {
        self.indexes = indexes;
        self
    }

    pub const fn unique_constraints(
        mut self,
        constraints: &'static [&'static [&'static str]],
    ) -> Self {
        self.unique_constraints = constraints;
        self
    }

    /// Physical table name: the override, or the snake_case type name with
    /// an `s` appended unless it already ends in one (`TodoItem` becomes
    /// `todo_items`, `Address` stays `address`)
    pub fn table_name(&self) -> Cow<'static, str> {
        match self.table {
            Some(table) => Cow::Borrowed(table),
            None => Cow::Owned(derive_table_name(self.type_name)),
        }
    }

    pub fn table_id(&self) -> TableId {
        TableId::new(self.table_name())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.column_name() == column)
    }

    /// Descriptor of the identity field
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` if the declared identity is not a field.
    pub fn identity_field(&self) -> Result<&'static FieldDescriptor> {
        self.field(self.identity).ok_or_else(|| {
            QuarryError::UnknownField {
                record: self.type_name.to_string(),
                field: self.identity.to_string(),
            }
            .into()
        })
    }

    /// Physical column of the identity field
    pub fn identity_column(&self) -> &'static str {
        self.field(self.identity)
            .map(FieldDescriptor::column_name)
            .unwrap_or(self.identity)
    }
}

/// Default table name: the snake_case type name, pluralised by appending
/// `s` unless it already ends in `s` (`TodoItem` -> `todo_items`,
/// `Address` -> `address`)
fn derive_table_name(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, ch) in type_name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    if !out.ends_with('s') {
        out.push('s');
    }
    out
}

/// Resolves logical field names to physical column names
///
/// Names that are not declared fields (qualified join columns, aliases,
/// expressions) pass through unchanged.
pub trait ColumnMapper {
    fn column_for<'a>(&self, field: &'a str) -> Cow<'a, str>;
}

impl ColumnMapper for RecordDescriptor {
    fn column_for<'a>(&self, field: &'a str) -> Cow<'a, str> {
        match self.field(field) {
            Some(descriptor) => Cow::Borrowed(descriptor.column_name()),
            None => Cow::Borrowed(field),
        }
    }
}

/// Mapper that never renames
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl ColumnMapper for IdentityMapper {
    fn column_for<'a>(&self, field: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(field)
    }
}

/// Type of a record's identity field
pub trait Identity: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// True when the engine should assign the identity on insert
    fn is_default(&self) -> bool;

    fn to_value(&self) -> Value;

    /// Convert the engine's last-insert row id into this identity type
    ///
    /// # Errors
    ///
    /// Fails rather than truncating when the row id does not round-trip.
    fn from_row_id(row_id: i64) -> Result<Self>;

    /// Whether the engine can allocate this identity on insert
    fn engine_assigned() -> bool {
        true
    }
}

impl Identity for i64 {
    fn is_default(&self) -> bool {
        *self == 0
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_row_id(row_id: i64) -> Result<Self> {
        Ok(row_id)
    }
}

impl Identity for i32 {
    fn is_default(&self) -> bool {
        *self == 0
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_row_id(row_id: i64) -> Result<Self> {
        i32::try_from(row_id).map_err(|_| {
            QuarryError::IdentityConversion {
                row_id,
                target: "i32".to_string(),
            }
            .into()
        })
    }
}

impl Identity for u32 {
    fn is_default(&self) -> bool {
        *self == 0
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_row_id(row_id: i64) -> Result<Self> {
        u32::try_from(row_id).map_err(|_| {
            QuarryError::IdentityConversion {
                row_id,
                target: "u32".to_string(),
            }
            .into()
        })
    }
}

impl Identity for String {
    fn engine_assigned() -> bool {
        false
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_row_id(row_id: i64) -> Result<Self> {
        Err(QuarryError::IdentityConversion {
            row_id,
            target: "String".to_string(),
        }
        .into())
    }
}

impl Identity for Uuid {
    fn engine_assigned() -> bool {
        false
    }

    fn is_default(&self) -> bool {
        self.is_nil()
    }

    fn to_value(&self) -> Value {
        ToValue::to_value(self)
    }

    fn from_row_id(row_id: i64) -> Result<Self> {
        Err(QuarryError::IdentityConversion {
            row_id,
            target: "Uuid".to_string(),
        }
        .into())
    }
}

/// A typed record mapped to one table
///
/// Implementations are normally produced by code generation; they are
/// written by hand in tests and in the CLI.
pub trait Record: Sized + Send + 'static {
    type Id: Identity;

    fn descriptor() -> &'static RecordDescriptor;

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    /// Write every declared field, by field name
    ///
    /// # Errors
    ///
    /// Fails only if the record's own serialization fails.
    fn write_fields(&self, out: &mut FieldWriter) -> Result<()>;

    /// Rebuild a record from a decoded row
    ///
    /// # Errors
    ///
    /// Fails with a data-mapping error for missing or mistyped columns.
    fn read_fields(row: &FieldReader<'_>) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    const FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", FieldType::Integer),
        FieldDescriptor::new("display_name", FieldType::Text).column("name"),
        FieldDescriptor::new("note", FieldType::Text).nullable(),
    ];

    #[test]
    fn test_derived_table_name() {
        assert_eq!(derive_table_name("TodoItem"), "todo_items");
        assert_eq!(derive_table_name("Item"), "items");
        assert_eq!(derive_table_name("Address"), "address");
    }

    #[test]
    fn test_table_override() {
        let desc = RecordDescriptor::new("TodoItem", "id", FIELDS).table("todos");
        assert_eq!(desc.table_name(), "todos");
        assert_eq!(desc.table_id().as_str(), "todos");
    }

    #[test]
    fn test_column_mapper_applies_override() {
        let desc = RecordDescriptor::new("Person", "id", FIELDS);
        assert_eq!(desc.column_for("display_name"), "name");
        assert_eq!(desc.column_for("note"), "note");
        assert_eq!(desc.column_for("people.other"), "people.other");
    }

    #[test]
    fn test_identity_field_lookup() {
        let desc = RecordDescriptor::new("Person", "id", FIELDS);
        assert_eq!(desc.identity_field().unwrap().name, "id");

        let broken = RecordDescriptor::new("Person", "uid", FIELDS);
        assert_eq!(
            broken.identity_field().unwrap_err().kind(),
            ExErrorKind::InvalidData
        );
    }

    #[test]
    fn test_i32_identity_rejects_overflow() {
        let err = i32::from_row_id(i64::from(i32::MAX) + 1).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidData);
        assert_eq!(i32::from_row_id(7).unwrap(), 7);
    }

    #[test]
    fn test_text_identity_is_never_engine_assigned() {
        assert!(String::new().is_default());
        assert!(!String::engine_assigned());
        assert!(!Uuid::engine_assigned());
        assert!(i64::engine_assigned());
        assert!(String::from_row_id(1).is_err());
        assert!(Uuid::nil().is_default());
    }
}
