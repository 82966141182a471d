//! Value model and SQL type mapping
//!
//! `Value` is the only representation that crosses the boundary between
//! typed records and the storage engine. Booleans travel as `Integer` 0/1
//! and timestamps as `Real` epoch seconds.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::QuarryError;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Name of the variant, used in mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used for aggregate results
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Storage column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
        }
    }
}

/// Declared semantic type of a record field
///
/// Decoding is driven by this declaration, never by the column's name or
/// by whatever variant happens to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Boolean,
    Real,
    Text,
    Uuid,
    Blob,
    Timestamp,
}

impl FieldType {
    /// Column type chosen for this field type
    ///
    /// Pure in the declared type so DDL can be generated before any data
    /// exists.
    pub const fn sql_type(&self) -> SqlType {
        match self {
            FieldType::Integer | FieldType::Boolean => SqlType::Integer,
            FieldType::Real | FieldType::Timestamp => SqlType::Real,
            FieldType::Text | FieldType::Uuid => SqlType::Text,
            FieldType::Blob => SqlType::Blob,
        }
    }

    /// Normalise a stored value into the canonical variant for this type
    ///
    /// Integers stored in REAL columns (and vice versa for whole reals) are
    /// accepted; booleans must be exactly 0 or 1.
    pub fn normalize(&self, column: &str, value: Value) -> Result<Value, QuarryError> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::Integer, Value::Integer(v)) => Ok(Value::Integer(v)),
            (FieldType::Boolean, Value::Integer(v @ (0 | 1))) => Ok(Value::Integer(v)),
            (FieldType::Boolean, Value::Integer(v)) => Err(QuarryError::InvalidData {
                column: column.to_string(),
                reason: format!("boolean column holds {}", v),
            }),
            (FieldType::Real | FieldType::Timestamp, Value::Real(v)) => Ok(Value::Real(v)),
            (FieldType::Real | FieldType::Timestamp, Value::Integer(v)) => {
                Ok(Value::Real(v as f64))
            }
            (FieldType::Text | FieldType::Uuid, Value::Text(s)) => Ok(Value::Text(s)),
            (FieldType::Uuid, Value::Blob(b)) if b.len() == 16 => Ok(Value::Blob(b)),
            (FieldType::Blob, Value::Blob(b)) => Ok(Value::Blob(b)),
            (declared, other) => Err(mismatch(column, declared.name(), &other)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Real => "real",
            FieldType::Text => "text",
            FieldType::Uuid => "uuid",
            FieldType::Blob => "blob",
            FieldType::Timestamp => "timestamp",
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &Value) -> QuarryError {
    QuarryError::TypeMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

// ========== Rust type conversions ==========

/// Conversion of a Rust field value into a `Value`
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion of a normalised `Value` back into a Rust field value
pub trait FromValue: Sized {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError>;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl ToValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl ToValue for u32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Real(self.timestamp_micros() as f64 / 1_000_000.0)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl FromValue for Value {
    fn from_value(_column: &str, value: Value) -> Result<Self, QuarryError> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(non_null(column, "integer", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        let wide = i64::from_value(column, value)?;
        i32::try_from(wide).map_err(|_| QuarryError::InvalidData {
            column: column.to_string(),
            reason: format!("{} does not fit in i32", wide),
        })
    }
}

impl FromValue for u32 {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        let wide = i64::from_value(column, value)?;
        u32::try_from(wide).map_err(|_| QuarryError::InvalidData {
            column: column.to_string(),
            reason: format!("{} does not fit in u32", wide),
        })
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(v) => Err(QuarryError::InvalidData {
                column: column.to_string(),
                reason: format!("boolean column holds {}", v),
            }),
            other => Err(non_null(column, "boolean", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(non_null(column, "real", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(non_null(column, "text", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(non_null(column, "blob", other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Text(s) => Uuid::parse_str(&s).map_err(|e| QuarryError::InvalidData {
                column: column.to_string(),
                reason: e.to_string(),
            }),
            Value::Blob(b) => Uuid::from_slice(&b).map_err(|e| QuarryError::InvalidData {
                column: column.to_string(),
                reason: e.to_string(),
            }),
            other => Err(non_null(column, "uuid", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        let secs = match value {
            Value::Real(v) => v,
            Value::Integer(v) => v as f64,
            other => return Err(non_null(column, "timestamp", other)),
        };
        let invalid = || QuarryError::InvalidData {
            column: column.to_string(),
            reason: format!("{} is not a representable timestamp", secs),
        };
        if !secs.is_finite() {
            return Err(invalid());
        }
        let micros = (secs * 1_000_000.0).round();
        if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
            return Err(invalid());
        }
        DateTime::from_timestamp_micros(micros as i64).ok_or_else(invalid)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: Value) -> Result<Self, QuarryError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

fn non_null(column: &str, expected: &str, found: Value) -> QuarryError {
    match found {
        Value::Null => QuarryError::UnexpectedNull {
            column: column.to_string(),
        },
        other => mismatch(column, expected, &other),
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        v.to_value()
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        v.to_value()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(FieldType::Integer.sql_type(), SqlType::Integer);
        assert_eq!(FieldType::Boolean.sql_type(), SqlType::Integer);
        assert_eq!(FieldType::Real.sql_type(), SqlType::Real);
        assert_eq!(FieldType::Timestamp.sql_type(), SqlType::Real);
        assert_eq!(FieldType::Text.sql_type(), SqlType::Text);
        assert_eq!(FieldType::Uuid.sql_type(), SqlType::Text);
        assert_eq!(FieldType::Blob.sql_type(), SqlType::Blob);
    }

    #[test]
    fn test_bool_encodes_as_integer() {
        assert_eq!(true.to_value(), Value::Integer(1));
        assert_eq!(false.to_value(), Value::Integer(0));
        assert!(bool::from_value("flag", Value::Integer(1)).unwrap());
    }

    #[test]
    fn test_bool_rejects_other_integers() {
        let err = bool::from_value("flag", Value::Integer(2)).unwrap_err();
        assert!(matches!(err, QuarryError::InvalidData { .. }));
    }

    #[test]
    fn test_timestamp_round_trip_millis() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let back = DateTime::<Utc>::from_value("at", ts.to_value()).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_timestamp_accepts_integer_seconds() {
        let back = DateTime::<Utc>::from_value("at", Value::Integer(60)).unwrap();
        assert_eq!(back.timestamp(), 60);
    }

    #[test]
    fn test_null_into_required_field_is_unexpected_null() {
        let err = String::from_value("name", Value::Null).unwrap_err();
        assert_eq!(
            err,
            QuarryError::UnexpectedNull {
                column: "name".to_string()
            }
        );
    }

    #[test]
    fn test_optional_field_accepts_null() {
        assert_eq!(Option::<i64>::from_value("n", Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::from_value("n", Value::Integer(4)).unwrap(),
            Some(4)
        );
    }

    #[test]
    fn test_text_into_integer_is_mismatch() {
        let err = i64::from_value("qty", Value::Text("six".into())).unwrap_err();
        assert!(matches!(err, QuarryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_narrow_integer_overflow_is_invalid_data() {
        let err = i32::from_value("qty", Value::Integer(i64::MAX)).unwrap_err();
        assert!(matches!(err, QuarryError::InvalidData { .. }));
    }

    #[test]
    fn test_normalize_widens_integer_for_real_fields() {
        let v = FieldType::Real.normalize("price", Value::Integer(3)).unwrap();
        assert_eq!(v, Value::Real(3.0));
    }

    #[test]
    fn test_normalize_rejects_text_for_blob() {
        let err = FieldType::Blob
            .normalize("payload", Value::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, QuarryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_uuid_text_round_trip() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::from_value("id", id.to_value()).unwrap(), id);
    }
}
