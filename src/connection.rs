//! The single SQLite connection and the primitives the facade runs on.
//!
//! A [`Connection`] wraps one `tokio_rusqlite::Connection`: the
//! `rusqlite::Connection` lives on its own background thread and every
//! request is a closure run there in arrival order. Clones share that thread.

use crate::config::DbPath;
use crate::error::{Error, Result};
use crate::types::{Row, SqlQuery, Value};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use rusqlite::params_from_iter;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine primitives the facade is written against.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement and discard any rows it returns; resolves with the
    /// number of changed rows (0 for read-only statements).
    async fn execute(&self, query: SqlQuery) -> Result<usize>;

    /// Run an insert; resolves with the rowid of the inserted row.
    async fn insert(&self, query: SqlQuery) -> Result<i64>;

    /// First row of the result, if any.
    async fn query_row(&self, query: SqlQuery) -> Result<Option<Row>>;

    async fn query_all(&self, query: SqlQuery) -> Result<Vec<Row>>;

    /// Hand every row to `on_row` as it is read; resolves with the row count.
    async fn query_each(
        &self,
        query: SqlQuery,
        on_row: Box<dyn FnMut(Row) + Send + 'static>,
    ) -> Result<usize>;

    /// Prepare `statement` once and execute it for each parameter row, inside
    /// one transaction.
    async fn execute_batch(&self, statement: String, rows: Vec<Vec<Value>>) -> Result<usize>;

    /// Run one or more `;`-separated statements without parameters.
    async fn execute_script(&self, sql: String) -> Result<()>;
}

#[derive(Clone)]
pub struct Connection {
    inner: tokio_rusqlite::Connection,
    path: Arc<DbPath>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Open (or create) the database.
    pub async fn open(path: impl Into<DbPath>) -> Result<Self> {
        let path = path.into();
        let inner = match &path {
            DbPath::Memory => tokio_rusqlite::Connection::open_in_memory().await?,
            DbPath::File(file) => tokio_rusqlite::Connection::open(file.clone()).await?,
        };
        info!(path = %path, "opened sqlite connection");
        Ok(Self {
            inner,
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Run `function` on the connection thread against the raw connection.
    pub async fn call<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.inner.call(move |conn| Ok(function(conn))).await?
    }

    /// Rows of `query` as a stream, yielded as the connection thread reads
    /// them. Rows the consumer has not polled yet are buffered without bound,
    /// so the whole result set can end up in memory behind a slow consumer.
    /// An engine error is the last item.
    pub fn stream(&self, query: SqlQuery) -> impl Stream<Item = Result<Row>> + Send + 'static {
        debug!(sql = %query.statement, params = query.params.len(), "streaming query");
        let (tx, rx) = mpsc::unbounded();
        let conn = self.clone();
        let reader = async move {
            conn.call(move |conn| {
                let result = for_each_row(conn, &query, |row| tx.unbounded_send(Ok(row)).is_ok());
                if let Err(err) = result {
                    let _ = tx.unbounded_send(Err(err));
                }
                Ok(())
            })
            .await
        };
        // Only a failed call (e.g. a closed connection) surfaces from the reader.
        let reader = stream::once(reader).filter_map(|result| future::ready(result.err().map(Err)));
        stream::select(rx, reader)
    }

    /// Close the connection. Calls still queued, and any later call on a
    /// clone, fail with [`Error::ConnectionClosed`].
    pub async fn close(self) -> Result<()> {
        self.inner.close().await?;
        info!(path = %self.path, "closed sqlite connection");
        Ok(())
    }
}

/// Feed rows to `on_row` until it returns `false`. Returns the number of rows read.
fn for_each_row(
    conn: &rusqlite::Connection,
    query: &SqlQuery,
    mut on_row: impl FnMut(Row) -> bool,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(&query.statement)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
    let mut count = 0;
    while let Some(row) = rows.next()? {
        count += 1;
        if !on_row(Row::from_rusqlite(&columns, row)?) {
            break;
        }
    }
    Ok(count)
}

#[async_trait]
impl Executor for Connection {
    async fn execute(&self, query: SqlQuery) -> Result<usize> {
        debug!(sql = %query.statement, params = query.params.len(), "executing statement");
        self.call(move |conn| {
            let mut stmt = conn.prepare_cached(&query.statement)?;
            let params = params_from_iter(query.params.iter());
            if stmt.column_count() == 0 {
                return Ok(stmt.execute(params)?);
            }
            // PRAGMA, SELECT or RETURNING: step through and drop the rows.
            {
                let mut rows = stmt.query(params)?;
                while rows.next()?.is_some() {}
            }
            Ok(if stmt.readonly() {
                0
            } else {
                conn.changes() as usize
            })
        })
        .await
    }

    async fn insert(&self, query: SqlQuery) -> Result<i64> {
        debug!(sql = %query.statement, params = query.params.len(), "executing insert");
        self.call(move |conn| {
            let mut stmt = conn.prepare_cached(&query.statement)?;
            Ok(stmt.insert(params_from_iter(query.params.iter()))?)
        })
        .await
    }

    async fn query_row(&self, query: SqlQuery) -> Result<Option<Row>> {
        debug!(sql = %query.statement, params = query.params.len(), "querying row");
        self.call(move |conn| {
            let mut first = None;
            for_each_row(conn, &query, |row| {
                first = Some(row);
                false
            })?;
            Ok(first)
        })
        .await
    }

    async fn query_all(&self, query: SqlQuery) -> Result<Vec<Row>> {
        debug!(sql = %query.statement, params = query.params.len(), "querying rows");
        self.call(move |conn| {
            let mut rows = Vec::new();
            for_each_row(conn, &query, |row| {
                rows.push(row);
                true
            })?;
            Ok(rows)
        })
        .await
    }

    async fn query_each(
        &self,
        query: SqlQuery,
        mut on_row: Box<dyn FnMut(Row) + Send + 'static>,
    ) -> Result<usize> {
        debug!(sql = %query.statement, params = query.params.len(), "iterating rows");
        self.call(move |conn| {
            let mut panicked = false;
            let count = for_each_row(conn, &query, |row| {
                match catch_unwind(AssertUnwindSafe(|| on_row(row))) {
                    Ok(()) => true,
                    Err(_) => {
                        panicked = true;
                        false
                    }
                }
            })?;
            if panicked {
                warn!(sql = %query.statement, "row callback panicked");
                return Err(Error::CallbackPanicked);
            }
            Ok(count)
        })
        .await
    }

    async fn execute_batch(&self, statement: String, rows: Vec<Vec<Value>>) -> Result<usize> {
        debug!(sql = %statement, rows = rows.len(), "executing batch");
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let mut changed = 0;
            {
                let mut stmt = tx.prepare_cached(&statement)?;
                for params in &rows {
                    changed += stmt.execute(params_from_iter(params.iter()))?;
                }
            }
            tx.commit()?;
            Ok(changed)
        })
        .await
    }

    async fn execute_script(&self, sql: String) -> Result<()> {
        debug!(sql = %sql, "executing script");
        self.call(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }
}
