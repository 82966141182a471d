//! Query specifications and their compilation to SQL

pub mod compiler;
pub mod spec;

pub use compiler::{
    compile_count, compile_delete, compile_insert, compile_select, compile_update, Statement,
};
pub use spec::{Direction, Join, JoinKind, OrderBy, QuerySpec};
