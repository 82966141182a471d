//! quarry core: storage-agnostic mapping between typed records and SQL
//!
//! Nothing in this crate touches a database. It defines the value model,
//! record descriptors, predicate and query compilation, DDL generation and
//! the encoder/decoder; `quarry-store` executes what it produces.

pub mod codec;
pub mod ddl;
pub mod descriptor;
pub mod errors;
pub mod ident;
pub mod logging_facility;
pub mod predicate;
pub mod query;
pub mod value;

// Re-exported for the logging macros
pub use quarry_core_types;

pub use codec::{decode, encode, FieldReader, FieldWriter, Row};
pub use descriptor::{
    ColumnMapper, FieldDescriptor, Identity, IdentityMapper, IndexDescriptor, Record,
    RecordDescriptor,
};
pub use errors::{ExError, ExErrorKind, QuarryError, Result};
pub use predicate::{col, CompareOp, Fragment, Predicate};
pub use query::{Direction, QuerySpec, Statement};
pub use value::{FieldType, FromValue, SqlType, ToValue, Value};
