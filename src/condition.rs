//! WHERE-clause fragments.
//!
//! A condition list is joined with `AND`; an [`Condition::Any`] group is
//! parenthesized and joined with `OR`. An empty list renders no `WHERE`
//! clause at all, so `del("t", &[])` deletes every row.
//!
//! ```ignore
//! use sqliter::Condition;
//!
//! let conditions = [
//!     Condition::from("age > 18"),
//!     Condition::any(["role = 'admin'", "role = 'owner'"]),
//!     Condition::eq("active", true),
//! ];
//! // WHERE age > 18 AND (role = 'admin' OR role = 'owner') AND active = ?
//! ```

use crate::types::Value;

/// Comparison applied to a column by [`Condition::Compare`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
    IsNull,
    IsNotNull,
}

/// One WHERE-clause fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Raw SQL boolean expression, inserted verbatim.
    Raw(String),
    /// Alternatives rendered as `(a OR b OR ...)`.
    Any(Vec<Condition>),
    /// `<column> <op> ?` with the operand bound as a parameter.
    Compare { column: String, op: QueryOperator },
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    pub fn any<I, C>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Condition>,
    {
        Condition::Any(alternatives.into_iter().map(Into::into).collect())
    }

    pub fn compare(column: impl Into<String>, op: QueryOperator) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::Equal(value.into()))
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::NotEqual(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::GreaterThan(value.into()))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::GreaterThanOrEqual(value.into()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::LessThan(value.into()))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, QueryOperator::LessThanOrEqual(value.into()))
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, QueryOperator::Like(pattern.into()))
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::compare(
            column,
            QueryOperator::In(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::compare(column, QueryOperator::IsNull)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::compare(column, QueryOperator::IsNotNull)
    }

    fn write_sql(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Condition::Raw(expr) => sql.push_str(expr),
            Condition::Any(alternatives) if alternatives.is_empty() => sql.push('0'),
            Condition::Any(alternatives) => {
                sql.push('(');
                for (idx, alternative) in alternatives.iter().enumerate() {
                    if idx > 0 {
                        sql.push_str(" OR ");
                    }
                    alternative.write_sql(sql, params);
                }
                sql.push(')');
            }
            Condition::Compare { column, op } => write_compare(column, op, sql, params),
        }
    }
}

fn write_compare(column: &str, op: &QueryOperator, sql: &mut String, params: &mut Vec<Value>) {
    let binary = |operator: &str, value: &Value, sql: &mut String, params: &mut Vec<Value>| {
        sql.push_str(column);
        sql.push(' ');
        sql.push_str(operator);
        sql.push_str(" ?");
        params.push(value.clone());
    };

    match op {
        QueryOperator::Equal(v) => binary("=", v, sql, params),
        QueryOperator::NotEqual(v) => binary("!=", v, sql, params),
        QueryOperator::GreaterThan(v) => binary(">", v, sql, params),
        QueryOperator::GreaterThanOrEqual(v) => binary(">=", v, sql, params),
        QueryOperator::LessThan(v) => binary("<", v, sql, params),
        QueryOperator::LessThanOrEqual(v) => binary("<=", v, sql, params),
        QueryOperator::Like(pattern) => {
            binary("LIKE", &Value::Text(pattern.clone()), sql, params)
        }
        // `x IN ()` is a syntax error in SQLite.
        QueryOperator::In(values) if values.is_empty() => sql.push('0'),
        QueryOperator::In(values) => {
            sql.push_str(column);
            sql.push_str(" IN (");
            sql.push_str(&placeholders(values.len()));
            sql.push(')');
            params.extend(values.iter().cloned());
        }
        QueryOperator::IsNull => {
            sql.push_str(column);
            sql.push_str(" IS NULL");
        }
        QueryOperator::IsNotNull => {
            sql.push_str(column);
            sql.push_str(" IS NOT NULL");
        }
    }
}

/// `?, ?, ?` for `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Render the ` WHERE ...` suffix for `conditions`, appending bound values to
/// `params`. Returns an empty string for an empty list.
pub fn where_clause(conditions: &[Condition], params: &mut Vec<Value>) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let mut sql = String::from(" WHERE ");
    for (idx, condition) in conditions.iter().enumerate() {
        if idx > 0 {
            sql.push_str(" AND ");
        }
        condition.write_sql(&mut sql, params);
    }
    sql
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Raw(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Raw(sql)
    }
}

impl<C: Into<Condition>> From<Vec<C>> for Condition {
    fn from(alternatives: Vec<C>) -> Self {
        Condition::any(alternatives)
    }
}

impl<C: Into<Condition>, const N: usize> From<[C; N]> for Condition {
    fn from(alternatives: [C; N]) -> Self {
        Condition::any(alternatives)
    }
}
