//! Predicate AST and compiler
//!
//! Predicates are written against logical field names and compiled into a
//! SQL condition plus positional bindings. Every literal travels as a
//! binding, and bindings are emitted in the same left-to-right order as
//! their `?` placeholders no matter how deeply AND/OR/NOT nest.

use crate::descriptor::ColumnMapper;
use crate::errors::{QuarryError, Result};
use crate::ident::quote_ident;
use crate::value::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

/// Boolean expression over columns
///
/// Immutable once built: combinators consume their operands and return a
/// new tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// Compiled condition: SQL text plus bindings in placeholder order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Fragment {
    /// Number of `?` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Start a predicate on one column
///
/// ```
/// use quarry_core::predicate::col;
///
/// let p = col("quantity").gt(5).and(col("name").like("A%"));
/// ```
pub fn col(name: impl Into<String>) -> Column {
    Column(name.into())
}

/// Column handle used to build comparisons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

impl Column {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            column: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn like(self, pattern: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Like, pattern)
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull { column: self.0 }
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull { column: self.0 }
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// Inclusive range; `low <= high` is the caller's responsibility
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        Predicate::Between {
            column: self.0,
            low: low.into(),
            high: high.into(),
        }
    }
}

impl Predicate {
    /// Conjunction, flattening nested ANDs
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), right) => {
                left.push(right);
                Predicate::And(left)
            }
            (left, Predicate::And(right)) => {
                let mut all = Vec::with_capacity(right.len() + 1);
                all.push(left);
                all.extend(right);
                Predicate::And(all)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested ORs
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), right) => {
                left.push(right);
                Predicate::Or(left)
            }
            (left, Predicate::Or(right)) => {
                let mut any = Vec::with_capacity(right.len() + 1);
                any.push(left);
                any.extend(right);
                Predicate::Or(any)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::Or(predicates.into_iter().collect())
    }

    /// Compile into a SQL condition, resolving field names through `mapper`
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` for an empty IN / NOT IN list or an
    /// unquotable column name.
    pub fn compile(&self, mapper: &dyn ColumnMapper) -> Result<Fragment> {
        let mut out = Fragment::default();
        self.write(mapper, &mut out)?;
        Ok(out)
    }

    fn write(&self, mapper: &dyn ColumnMapper, out: &mut Fragment) -> Result<()> {
        match self {
            // `= NULL` never matches in SQL; compare against NULL the way
            // the caller meant it.
            Predicate::Compare {
                column,
                op: CompareOp::Eq,
                value: Value::Null,
            } => write_column(mapper, column, out, " IS NULL"),
            Predicate::Compare {
                column,
                op: CompareOp::Ne,
                value: Value::Null,
            } => write_column(mapper, column, out, " IS NOT NULL"),
            Predicate::Compare { column, op, value } => {
                write_column(mapper, column, out, "")?;
                out.sql.push(' ');
                out.sql.push_str(op.as_sql());
                out.sql.push_str(" ?");
                out.bindings.push(value.clone());
                Ok(())
            }
            Predicate::IsNull { column } => write_column(mapper, column, out, " IS NULL"),
            Predicate::IsNotNull { column } => write_column(mapper, column, out, " IS NOT NULL"),
            Predicate::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Err(QuarryError::EmptyInList {
                        column: column.clone(),
                    }
                    .into());
                }
                write_column(mapper, column, out, if *negated { " NOT IN (" } else { " IN (" })?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.sql.push_str(", ");
                    }
                    out.sql.push('?');
                    out.bindings.push(value.clone());
                }
                out.sql.push(')');
                Ok(())
            }
            Predicate::Between { column, low, high } => {
                write_column(mapper, column, out, " BETWEEN ? AND ?")?;
                out.bindings.push(low.clone());
                out.bindings.push(high.clone());
                Ok(())
            }
            Predicate::And(children) => write_group(mapper, children, " AND ", "1 = 1", out),
            Predicate::Or(children) => write_group(mapper, children, " OR ", "1 = 0", out),
            Predicate::Not(inner) => {
                out.sql.push_str("NOT (");
                inner.write(mapper, out)?;
                out.sql.push(')');
                Ok(())
            }
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

fn write_column(
    mapper: &dyn ColumnMapper,
    column: &str,
    out: &mut Fragment,
    suffix: &str,
) -> Result<()> {
    out.sql.push_str(&quote_ident(&mapper.column_for(column))?);
    out.sql.push_str(suffix);
    Ok(())
}

fn write_group(
    mapper: &dyn ColumnMapper,
    children: &[Predicate],
    joiner: &str,
    empty: &str,
    out: &mut Fragment,
) -> Result<()> {
    match children {
        [] => {
            out.sql.push_str(empty);
            Ok(())
        }
        [only] => only.write(mapper, out),
        many => {
            out.sql.push('(');
            for (i, child) in many.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(joiner);
                }
                child.write(mapper, out)?;
            }
            out.sql.push(')');
            Ok(())
        }
    }
}
