use quarry_core_types::{RequestId, TableId};
use thiserror::Error;

/// Result type alias using the canonical structured error
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Origin group of an error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Connection,
    Execution,
    DataMapping,
    Transaction,
    General,
    Ambient,
}

/// Canonical error kind taxonomy
///
/// Every public operation in quarry fails with one of these kinds. Each kind
/// maps to a stable error code so callers and tests can match on failures
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Connection
    ConnectionFailed,
    DatabaseLocked,

    // Execution
    MalformedSql,
    ConstraintViolation,
    ExecutionFailed,

    // Data mapping
    TypeMismatch,
    MissingColumn,
    InvalidData,

    // Transaction
    TransactionFailed,
    NoActiveTransaction,

    // General
    NotFound,
    DuplicateEntry,
    InvalidOperation,

    // Ambient
    Configuration,
    Io,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ConnectionFailed => "ERR_CONNECTION_FAILED",
            ExErrorKind::DatabaseLocked => "ERR_DATABASE_LOCKED",
            ExErrorKind::MalformedSql => "ERR_MALFORMED_SQL",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::ExecutionFailed => "ERR_EXECUTION_FAILED",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::MissingColumn => "ERR_MISSING_COLUMN",
            ExErrorKind::InvalidData => "ERR_INVALID_DATA",
            ExErrorKind::TransactionFailed => "ERR_TRANSACTION_FAILED",
            ExErrorKind::NoActiveTransaction => "ERR_NO_ACTIVE_TRANSACTION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::DuplicateEntry => "ERR_DUPLICATE_ENTRY",
            ExErrorKind::InvalidOperation => "ERR_INVALID_OPERATION",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Get the origin group for this kind
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExErrorKind::ConnectionFailed | ExErrorKind::DatabaseLocked => {
                ErrorCategory::Connection
            }
            ExErrorKind::MalformedSql
            | ExErrorKind::ConstraintViolation
            | ExErrorKind::ExecutionFailed => ErrorCategory::Execution,
            ExErrorKind::TypeMismatch | ExErrorKind::MissingColumn | ExErrorKind::InvalidData => {
                ErrorCategory::DataMapping
            }
            ExErrorKind::TransactionFailed | ExErrorKind::NoActiveTransaction => {
                ErrorCategory::Transaction
            }
            ExErrorKind::NotFound | ExErrorKind::DuplicateEntry | ExErrorKind::InvalidOperation => {
                ErrorCategory::General
            }
            ExErrorKind::Configuration | ExErrorKind::Io | ExErrorKind::Internal => {
                ErrorCategory::Ambient
            }
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus the
/// context needed to debug a failure: the operation, the table and column
/// involved, and the statement that the storage engine rejected.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<TableId>,
    column: Option<String>,
    statement: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            column: None,
            statement: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<TableId>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add column context
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Add the offending SQL statement
    pub fn with_statement(mut self, sql: impl Into<String>) -> Self {
        self.statement = Some(sql.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Fill in the operation only if none was recorded closer to the failure
    pub fn or_op(self, op: &str) -> Self {
        if self.op.is_some() {
            self
        } else {
            self.with_op(op)
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&TableId> {
        self.table.as_ref()
    }

    /// Get the column context, if any
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Get the offending statement, if any
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(column) = &self.column {
            write!(f, " (column: {})", column)?;
        }
        if let Some(statement) = &self.statement {
            write!(f, " (sql: {})", statement)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised inside the mapping core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuarryError {
    /// Stored value cannot be coerced to the field's declared type
    #[error("Column {column} holds {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// A declared column is absent from a row
    #[error("Column {column} is missing from the row")]
    MissingColumn { column: String },

    /// NULL supplied for a column declared NOT NULL
    #[error("Column {column} is not nullable")]
    UnexpectedNull { column: String },

    /// Record encoder wrote a field its descriptor does not declare
    #[error("Field {field} is not declared on {record}")]
    UnknownField { record: String, field: String },

    /// Record encoder skipped a declared field
    #[error("Field {field} of {record} was not encoded")]
    FieldNotEncoded { record: String, field: String },

    /// Record encoder wrote the same field twice
    #[error("Field {field} of {record} was encoded more than once")]
    FieldEncodedTwice { record: String, field: String },

    /// Value is structurally wrong for its column
    #[error("Invalid data in column {column}: {reason}")]
    InvalidData { column: String, reason: String },

    /// IN / NOT IN compiled with no values
    #[error("IN list for column {column} is empty")]
    EmptyInList { column: String },

    /// Engine row id does not fit the record's identity type
    #[error("Row id {row_id} cannot be represented as {target}")]
    IdentityConversion { row_id: i64, target: String },

    /// Identity type the engine cannot assign was left at its default value
    #[error("Identity of {table} must be assigned before insert")]
    IdentityNotAssignable { table: String },

    /// UPDATE with nothing to set
    #[error("No assignable columns for update of {table}")]
    EmptyAssignment { table: String },

    /// Identifier that cannot be quoted
    #[error("Invalid identifier: {name:?}")]
    InvalidIdentifier { name: String },
}

/// Conversion from QuarryError to ExError
///
/// Every domain failure lands on exactly one canonical kind so that callers
/// only ever match on `ExErrorKind`.
impl From<QuarryError> for ExError {
    fn from(err: QuarryError) -> Self {
        let message = err.to_string();
        match err {
            QuarryError::TypeMismatch { column, .. } => ExError::new(ExErrorKind::TypeMismatch)
                .with_column(column)
                .with_message(message),

            QuarryError::MissingColumn { column } => ExError::new(ExErrorKind::MissingColumn)
                .with_column(column)
                .with_message(message),

            QuarryError::UnexpectedNull { column } => ExError::new(ExErrorKind::InvalidData)
                .with_column(column)
                .with_message(message),

            QuarryError::UnknownField { field, .. }
            | QuarryError::FieldNotEncoded { field, .. }
            | QuarryError::FieldEncodedTwice { field, .. } => {
                ExError::new(ExErrorKind::InvalidData)
                    .with_column(field)
                    .with_message(message)
            }

            QuarryError::InvalidData { column, .. } => ExError::new(ExErrorKind::InvalidData)
                .with_column(column)
                .with_message(message),

            QuarryError::EmptyInList { column } => ExError::new(ExErrorKind::InvalidOperation)
                .with_op("compile_predicate")
                .with_column(column)
                .with_message(message),

            QuarryError::IdentityConversion { .. } => ExError::new(ExErrorKind::InvalidData)
                .with_op("assign_identity")
                .with_message(message),

            QuarryError::IdentityNotAssignable { table } => {
                ExError::new(ExErrorKind::InvalidOperation)
                    .with_op("insert")
                    .with_table(table)
                    .with_message(message)
            }

            QuarryError::EmptyAssignment { table } => ExError::new(ExErrorKind::InvalidOperation)
                .with_op("compile_update")
                .with_table(table)
                .with_message(message),

            QuarryError::InvalidIdentifier { .. } => ExError::new(ExErrorKind::InvalidOperation)
                .with_op("quote_identifier")
                .with_message(message),
        }
    }
}
