use crate::builder;
use crate::condition::Condition;
use crate::config::{DbPath, SqliterConfig};
use crate::connection::{Connection, Executor};
use crate::error::{Error, Result};
use crate::types::{ColumnSpec, Fields, Row, SqlQuery, Value};
use futures::Stream;
use tracing::warn;

/// Table helpers over one database connection.
///
/// Every method builds its SQL, hands it to the [`Executor`] and resolves
/// with the engine's result or its error, unchanged. Cloning is cheap and
/// clones share the connection.
#[derive(Debug, Clone)]
pub struct Sqliter<E = Connection> {
    executor: E,
}

impl Sqliter<Connection> {
    /// Open `path` (a file, or `:memory:`), creating the file if needed.
    pub async fn connect(path: impl Into<DbPath>) -> Result<Self> {
        Self::connect_with(SqliterConfig::new(path)).await
    }

    /// Open the configured database and create the configured tables.
    pub async fn connect_with(config: SqliterConfig) -> Result<Self> {
        let connection = Connection::open(config.path).await?;
        let sqliter = Self::with_executor(connection);
        for table in &config.schema.tables {
            sqliter.create_table(&table.name, &table.columns).await?;
        }
        Ok(sqliter)
    }

    /// Rows of a raw query as a stream, see [`Connection::stream`].
    ///
    /// Rows not yet polled are buffered in memory without bound.
    pub fn stream(&self, query: impl Into<SqlQuery>) -> impl Stream<Item = Result<Row>> + Send + 'static {
        self.executor.stream(query.into())
    }

    pub async fn close(self) -> Result<()> {
        self.executor.close().await
    }
}

impl<E: Executor> Sqliter<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// `CREATE TABLE IF NOT EXISTS`; calling it again for an existing table is a no-op.
    pub async fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        self.executor
            .execute(builder::create_table(table, columns))
            .await
            .map(|_| ())
    }

    /// Insert one row; resolves with its rowid.
    pub async fn save(&self, table: &str, fields: Fields) -> Result<i64> {
        self.executor.insert(builder::insert(table, fields)?).await
    }

    /// Insert many rows with one prepared statement inside a transaction.
    ///
    /// The column list comes from the first row. Every other row must have the
    /// same set of columns, in any order; otherwise nothing is inserted and
    /// [`Error::ColumnMismatch`] is returned. An empty batch inserts nothing.
    pub async fn save_all(&self, table: &str, rows: Vec<Fields>) -> Result<usize> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        if first.is_empty() {
            return Err(Error::EmptyFields {
                table: table.to_string(),
            });
        }
        let columns: Vec<String> = first.columns().map(String::from).collect();

        let mut params = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            match row.values_for(&columns) {
                Some(values) => params.push(values),
                None => {
                    let found = row.columns().collect::<Vec<_>>().join(", ");
                    warn!(table, row = idx, found = %found, "rejecting batch with mismatched columns");
                    return Err(Error::ColumnMismatch {
                        row: idx,
                        expected: columns.join(", "),
                        found,
                    });
                }
            }
        }

        let statement = builder::insert_statement(table, columns.iter().map(String::as_str));
        let result = self.executor.execute_batch(statement, params).await;
        if let Err(err) = &result {
            warn!(table, error = %err, "batch insert rolled back");
        }
        result
    }

    /// First row matching every condition; an empty list matches any row.
    pub async fn find(&self, table: &str, conditions: &[Condition]) -> Result<Option<Row>> {
        self.executor
            .query_row(builder::select(table, conditions))
            .await
    }

    pub async fn find_all(&self, table: &str, conditions: &[Condition]) -> Result<Vec<Row>> {
        self.executor
            .query_all(builder::select(table, conditions))
            .await
    }

    /// Set `fields` on matching rows; resolves with the number of rows changed.
    /// An empty condition list updates every row.
    pub async fn update(&self, table: &str, fields: Fields, conditions: &[Condition]) -> Result<usize> {
        self.executor
            .execute(builder::update(table, fields, conditions)?)
            .await
    }

    /// Delete matching rows; an empty condition list deletes every row.
    pub async fn del(&self, table: &str, conditions: &[Condition]) -> Result<usize> {
        self.executor
            .execute(builder::delete(table, conditions))
            .await
    }

    pub async fn run(&self, query: impl Into<SqlQuery>) -> Result<usize> {
        self.executor.execute(query.into()).await
    }

    pub async fn get(&self, query: impl Into<SqlQuery>) -> Result<Option<Row>> {
        self.executor.query_row(query.into()).await
    }

    pub async fn all(&self, query: impl Into<SqlQuery>) -> Result<Vec<Row>> {
        self.executor.query_all(query.into()).await
    }

    /// Call `on_row` for each row of a raw query, on the connection's thread.
    /// A panicking callback stops the query with [`Error::CallbackPanicked`];
    /// the connection stays usable.
    /// Resolves with the number of rows once the query is exhausted.
    pub async fn each<F>(&self, query: impl Into<SqlQuery>, on_row: F) -> Result<usize>
    where
        F: FnMut(Row) + Send + 'static,
    {
        self.executor
            .query_each(query.into(), Box::new(on_row))
            .await
    }

    /// Run `;`-separated statements with no parameters.
    pub async fn exec(&self, sql: impl Into<String>) -> Result<()> {
        self.executor.execute_script(sql.into()).await
    }
}

/// Parameters for a raw query, in `?` order.
pub fn params<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}
