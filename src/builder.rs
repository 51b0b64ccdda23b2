//! SQL text for the facade operations.
//!
//! Table names, column names and column options are inserted as given.
//! Every value goes through a `?` placeholder.

use crate::condition::{placeholders, where_clause, Condition};
use crate::error::{Error, Result};
use crate::types::{ColumnSpec, Fields, SqlQuery};

pub fn create_table(table: &str, columns: &[ColumnSpec]) -> SqlQuery {
    let columns = columns
        .iter()
        .map(ColumnSpec::render)
        .collect::<Vec<_>>()
        .join(", ");
    SqlQuery::new(format!("CREATE TABLE IF NOT EXISTS {table} ( {columns} )"))
}

/// `INSERT INTO <table> (<columns>) VALUES (?, ...)` with no parameters
/// attached. Shared by single and batch inserts.
pub fn insert_statement<'a>(table: &str, columns: impl Iterator<Item = &'a str>) -> String {
    let columns: Vec<&str> = columns.collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders(columns.len())
    )
}

pub fn insert(table: &str, fields: Fields) -> Result<SqlQuery> {
    if fields.is_empty() {
        return Err(Error::EmptyFields {
            table: table.to_string(),
        });
    }
    let statement = insert_statement(table, fields.columns());
    Ok(SqlQuery::new(statement).with_params(fields.into_values()))
}

pub fn select(table: &str, conditions: &[Condition]) -> SqlQuery {
    let mut params = Vec::new();
    let filter = where_clause(conditions, &mut params);
    SqlQuery::new(format!("SELECT * FROM {table}{filter}")).with_params(params)
}

pub fn update(table: &str, fields: Fields, conditions: &[Condition]) -> Result<SqlQuery> {
    if fields.is_empty() {
        return Err(Error::EmptyFields {
            table: table.to_string(),
        });
    }
    let assignments = fields
        .columns()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    // SET values bind before WHERE values.
    let mut params = fields.into_values();
    let filter = where_clause(conditions, &mut params);
    Ok(SqlQuery::new(format!("UPDATE {table} SET {assignments}{filter}")).with_params(params))
}

pub fn delete(table: &str, conditions: &[Condition]) -> SqlQuery {
    let mut params = Vec::new();
    let filter = where_clause(conditions, &mut params);
    SqlQuery::new(format!("DELETE FROM {table}{filter}")).with_params(params)
}
