//! Immutable query specification
//!
//! Every builder method borrows the receiver and returns a new `QuerySpec`,
//! so a base specification can be shared and refined freely.

use crate::predicate::Predicate;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// A join clause; `on` is raw SQL and must not carry caller-supplied
/// literals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

/// Description of a query prior to compilation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    columns: Vec<String>,
    predicate: Option<Predicate>,
    joins: Vec<Join>,
    group_by: Vec<String>,
    having: Option<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QuerySpec {
    /// Unfiltered `SELECT *`
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `QuerySpec::new().filter(predicate)`
    pub fn matching(predicate: Predicate) -> Self {
        Self::new().filter(predicate)
    }

    /// Replace the select list
    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.columns = columns.into_iter().map(Into::into).collect();
        next
    }

    /// Add a condition; successive calls are AND-ed together
    pub fn filter(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.predicate = Some(match next.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        next
    }

    pub fn join(&self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.push_join(JoinKind::Inner, table.into(), on.into())
    }

    pub fn left_join(&self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.push_join(JoinKind::Left, table.into(), on.into())
    }

    fn push_join(&self, kind: JoinKind, table: String, on: String) -> Self {
        let mut next = self.clone();
        next.joins.push(Join { kind, table, on });
        next
    }

    pub fn group_by<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.group_by = columns.into_iter().map(Into::into).collect();
        next
    }

    /// Add a HAVING condition; successive calls are AND-ed together
    pub fn having(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.having = Some(match next.having.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        next
    }

    /// Append an ORDER BY term; earlier terms take precedence
    pub fn order_by(&self, column: impl Into<String>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        next
    }

    pub fn order_asc(&self, column: impl Into<String>) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn order_desc(&self, column: impl Into<String>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    pub fn offset(&self, offset: u64) -> Self {
        let mut next = self.clone();
        next.offset = Some(offset);
        next
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn group_columns(&self) -> &[String] {
        &self.group_by
    }

    pub fn having_predicate(&self) -> Option<&Predicate> {
        self.having.as_ref()
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }
}
