//! Error handling for quarry-store
//!
//! Classifies rusqlite failures into the canonical `ExErrorKind` taxonomy

use quarry_core::errors::{ExError, ExErrorKind};
use rusqlite::ffi;
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(classify(&err)).with_message(err.to_string())
}

/// Same as [`from_rusqlite`], with the offending statement attached
pub fn from_rusqlite_sql(err: rusqlite::Error, sql: &str) -> ExError {
    from_rusqlite(err).with_statement(sql)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Error returned once the executor has shut down
pub fn closed() -> ExError {
    ExError::new(ExErrorKind::ConnectionFailed).with_message("database is closed")
}

fn classify(err: &rusqlite::Error) -> ExErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::DatabaseLocked,
            ErrorCode::CannotOpen | ErrorCode::NotADatabase => ExErrorKind::ConnectionFailed,
            ErrorCode::ConstraintViolation => match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    ExErrorKind::DuplicateEntry
                }
                _ => ExErrorKind::ConstraintViolation,
            },
            _ if message.as_deref().is_some_and(is_malformed_sql) => ExErrorKind::MalformedSql,
            _ => ExErrorKind::ExecutionFailed,
        },
        rusqlite::Error::SqlInputError { .. } => ExErrorKind::MalformedSql,
        rusqlite::Error::InvalidPath(_) => ExErrorKind::ConnectionFailed,
        rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
            ExErrorKind::TypeMismatch
        }
        rusqlite::Error::InvalidColumnName(_) | rusqlite::Error::InvalidColumnIndex(_) => {
            ExErrorKind::MissingColumn
        }
        rusqlite::Error::QueryReturnedNoRows => ExErrorKind::NotFound,
        rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::MultipleStatement => {
            ExErrorKind::MalformedSql
        }
        _ => ExErrorKind::ExecutionFailed,
    }
}

fn is_malformed_sql(message: &str) -> bool {
    message.contains("syntax error")
        || message.starts_with("no such table")
        || message.starts_with("no such column")
        || message.contains("incomplete input")
}
