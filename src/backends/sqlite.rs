//! SQLite connection and transaction implementation
//!
//! This module implements the [`Connection`] and [`Transaction`] contracts on
//! top of a `deadpool-sqlite` pool. Every pooled physical connection is opened
//! through a [`Driver`] from a [`DriverRegistry`], so augmented drivers load
//! their extensions into each connection the pool creates.

use super::registry::{extended_driver_name, Driver, DriverRegistry};
use crate::core::{
    args::{Args, NamedArgs},
    binder::{self, BindType, BoundQuery},
    config::DatabaseConfig,
    connection::{Connection, Executor, Transaction, GET_CONTEXT},
    error::{DatabaseError, Result, StatementKind},
    value::{DatabaseResult, DatabaseRow, DatabaseValue, ExecResult, Rows},
};
use async_trait::async_trait;
use deadpool_sqlite::{HookError, Object, Pool, PoolError};
use parking_lot::RwLock;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Row};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const EXECUTE_CONTEXT: &str = "failed to execute statement";
const QUERY_CONTEXT: &str = "failed to execute query";
const GET_PREPARE_CONTEXT: &str = "failed to prepare named statement";
const SELECT_CONTEXT: &str = "failed to execute select statement";

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Int(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => {
                ToSqlOutput::Owned(Value::Integer(*v))
            }
            DatabaseValue::Float(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            DatabaseValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

/// Convert a rusqlite Row to a DatabaseRow
fn row_to_database_row(row: &Row) -> rusqlite::Result<DatabaseRow> {
    let mut db_row = DatabaseRow::new();
    let column_count = row.as_ref().column_count();

    for i in 0..column_count {
        let column_name = row.as_ref().column_name(i)?.to_string();
        let value = match row.get_ref(i)? {
            ValueRef::Null => DatabaseValue::Null,
            ValueRef::Integer(v) => DatabaseValue::Long(v),
            ValueRef::Real(v) => DatabaseValue::Double(v),
            ValueRef::Text(v) => DatabaseValue::String(String::from_utf8_lossy(v).to_string()),
            ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
        };
        db_row.insert(column_name, value);
    }

    Ok(db_row)
}

/// Classify a driver error raised while running a prepared statement
fn run_error(err: rusqlite::Error, context: &str) -> DatabaseError {
    let kind = match err {
        rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::InvalidParameterName(_) => {
            StatementKind::Bind
        }
        _ => StatementKind::Execute,
    };
    DatabaseError::statement(kind, context, err)
}

fn prepare<'c>(
    conn: &'c rusqlite::Connection,
    sql: &str,
    context: &str,
) -> Result<rusqlite::Statement<'c>> {
    conn.prepare(sql)
        .map_err(|e| DatabaseError::statement(StatementKind::Prepare, context, e))
}

fn execute_bound(conn: &rusqlite::Connection, bound: &BoundQuery) -> Result<ExecResult> {
    let mut stmt = prepare(conn, &bound.sql, EXECUTE_CONTEXT)?;
    let affected = stmt
        .execute(params_from_iter(bound.values.iter()))
        .map_err(|e| run_error(e, EXECUTE_CONTEXT))?;

    Ok(ExecResult {
        rows_affected: affected as u64,
        last_insert_id: conn.last_insert_rowid(),
    })
}

fn collect_rows(
    conn: &rusqlite::Connection,
    bound: &BoundQuery,
    context: &str,
) -> Result<(Vec<String>, DatabaseResult)> {
    let mut stmt = prepare(conn, &bound.sql, context)?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let rows = stmt
        .query_map(params_from_iter(bound.values.iter()), row_to_database_row)
        .map_err(|e| run_error(e, context))?;

    let mut results = Vec::new();
    for row_result in rows {
        results.push(row_result.map_err(|e| run_error(e, context))?);
    }

    Ok((columns, results))
}

/// Run a single-row retrieval on a freshly prepared statement
///
/// The statement is dropped before returning, on success and on failure.
fn get_bound(conn: &rusqlite::Connection, bound: &BoundQuery) -> Result<DatabaseRow> {
    let mut stmt = prepare(conn, &bound.sql, GET_PREPARE_CONTEXT)?;
    let mut rows = stmt
        .query(params_from_iter(bound.values.iter()))
        .map_err(|e| run_error(e, GET_CONTEXT))?;

    let first = match rows.next().map_err(|e| run_error(e, GET_CONTEXT))? {
        Some(row) => row_to_database_row(row).map_err(|e| run_error(e, GET_CONTEXT))?,
        None => {
            return Err(DatabaseError::statement_without_source(
                StatementKind::NoRows,
                GET_CONTEXT,
            ))
        }
    };

    if rows
        .next()
        .map_err(|e| run_error(e, GET_CONTEXT))?
        .is_some()
    {
        return Err(DatabaseError::statement_without_source(
            StatementKind::MultipleRows,
            GET_CONTEXT,
        ));
    }

    Ok(first)
}

fn ping_handle(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.query_row("SELECT 1", [], |_| Ok(()))
}

/// Map a pool acquisition failure
fn pool_error(driver: &str, err: PoolError) -> DatabaseError {
    match err {
        PoolError::PostCreateHook(HookError::Message(message)) => {
            DatabaseError::ExtensionLoad(message.to_string())
        }
        PoolError::PostCreateHook(other) => DatabaseError::ExtensionLoad(other.to_string()),
        PoolError::Closed => DatabaseError::NotConnected,
        PoolError::Backend(e) => DatabaseError::connection_failed_with_source(driver, e),
        other => DatabaseError::connection_failed(driver, other.to_string()),
    }
}

/// Run blocking work on a pooled physical connection
async fn interact<T, F>(conn: &Object, f: F) -> Result<T>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    conn.interact(f)
        .await
        .map_err(|e| DatabaseError::other(format!("Interact error: {}", e)))?
}

/// SQLite connection backed by a pool of physical handles
///
/// # Example
///
/// ```no_run
/// use dbx::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let registry = DriverRegistry::new();
///     let config = DatabaseConfig::new("file:data.sqlite3", "sqlite3");
///     let conn = SqliteConnection::open(&registry, &config).await?;
///
///     conn.execute(
///         "INSERT INTO users (id, name) VALUES (:id, :name)",
///         &NamedArgs::new().bind("id", 1).bind("name", "a"),
///     )
///     .await?;
///
///     conn.close().await
/// }
/// ```
pub struct SqliteConnection {
    pool: RwLock<Option<Pool>>,
    driver: Arc<Driver>,
}

impl SqliteConnection {
    /// Open a connection described by `config`
    ///
    /// When extension paths are configured, the augmented driver for the
    /// configured base driver is registered in `registry` first (at most once
    /// per name) and the pool opens its connections through it.
    ///
    /// # Errors
    ///
    /// - configuration error if the URL or driver name is empty
    /// - registration error if the augmented driver cannot be installed
    /// - connection error if the physical handle cannot be opened
    /// - extension load error if an extension fails to load into it
    /// - liveness error if the opened handle does not answer a ping
    pub async fn open(registry: &DriverRegistry, config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let base = registry.driver(&config.driver_name)?;
        let driver = if config.has_extensions() {
            let name = extended_driver_name(base.name());
            registry.register(&name, &config.extension_paths)?;
            registry.driver(&name)?
        } else {
            base
        };

        let pool = driver.create_pool(&config.url)?;
        let conn = pool
            .get()
            .await
            .map_err(|e| pool_error(driver.name(), e))?;

        interact(&conn, |conn| ping_handle(conn).map_err(DatabaseError::liveness)).await?;
        drop(conn);

        tracing::info!(driver = %driver.name(), url = %config.url, "Datastore is connected");

        Ok(Self {
            pool: RwLock::new(Some(pool)),
            driver,
        })
    }

    /// Driver the connection was opened with
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Check if the connection is still open
    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    fn bind_type(&self) -> BindType {
        self.driver.bind_type()
    }

    async fn acquire(&self) -> Result<Object> {
        let pool = self
            .pool
            .read()
            .clone()
            .ok_or(DatabaseError::NotConnected)?;

        pool.get()
            .await
            .map_err(|e| pool_error(self.driver.name(), e))
    }
}

#[async_trait]
impl Executor for SqliteConnection {
    async fn execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult> {
        let conn = self.acquire().await?;
        let bound = binder::bind_named(query, args, self.bind_type())?;
        interact(&conn, move |conn| execute_bound(conn, &bound)).await
    }

    async fn query(&self, query: &str, args: &NamedArgs) -> Result<Rows> {
        let conn = self.acquire().await?;
        let bound = binder::bind_named(query, args, self.bind_type())?;
        let (columns, rows) =
            interact(&conn, move |conn| collect_rows(conn, &bound, QUERY_CONTEXT)).await?;
        Ok(Rows::new(columns, rows))
    }

    async fn get_row(&self, query: &str, args: &NamedArgs) -> Result<DatabaseRow> {
        let conn = self.acquire().await?;
        let query = binder::rebind(self.bind_type(), query);
        let bound = binder::bind_named(&query, args, self.bind_type())?;
        interact(&conn, move |conn| get_bound(conn, &bound)).await
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    type Tx = SqliteTransaction;

    async fn ping(&self) -> Result<()> {
        let conn = self.acquire().await?;
        interact(&conn, |conn| {
            ping_handle(conn).map_err(DatabaseError::liveness)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let pool = self.pool.write().take().ok_or(DatabaseError::NotConnected)?;
        pool.close();
        tracing::debug!(driver = %self.driver.name(), "Datastore connection closed");
        Ok(())
    }

    async fn select_rows(&self, query: &str, args: &Args) -> Result<DatabaseResult> {
        let conn = self.acquire().await?;
        let bound = binder::prepare_select(self.bind_type(), query, args)?;
        let (_, rows) =
            interact(&conn, move |conn| collect_rows(conn, &bound, SELECT_CONTEXT)).await?;
        Ok(rows)
    }

    async fn begin_tx(&self) -> Result<SqliteTransaction> {
        let conn = self.acquire().await?;
        interact(&conn, |conn| {
            conn.execute_batch("BEGIN")?;
            Ok(())
        })
        .await?;

        Ok(SqliteTransaction {
            conn: Some(conn),
            bind_type: self.bind_type(),
            finished: AtomicBool::new(false),
        })
    }
}

/// Transaction bound to one pooled physical connection
///
/// The physical connection is held until the transaction is dropped. Commit
/// and rollback are passed straight to SQLite; repeating them returns
/// SQLite's "no transaction is active" error. Statements issued after either
/// one fail with [`DatabaseError::TransactionDone`] and never reach SQLite.
///
/// Dropping a transaction that was never committed or rolled back does not
/// roll it back here: the physical connection is detached from the pool and
/// closed, so no later user of the pool inherits the open transaction.
pub struct SqliteTransaction {
    conn: Option<Object>,
    bind_type: BindType,
    finished: AtomicBool,
}

impl SqliteTransaction {
    fn handle(&self) -> Result<&Object> {
        self.conn.as_ref().ok_or(DatabaseError::NotConnected)
    }

    /// Handle for a statement; fails once the transaction has ended
    fn active_handle(&self) -> Result<&Object> {
        if self.finished.load(Ordering::Acquire) {
            return Err(DatabaseError::TransactionDone);
        }
        self.handle()
    }

    async fn finish(&self, statement: &'static str) -> Result<()> {
        let conn = self.handle()?;
        interact(conn, move |conn| {
            conn.execute_batch(statement)?;
            Ok(())
        })
        .await?;
        self.finished.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl Executor for SqliteTransaction {
    async fn execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult> {
        let conn = self.active_handle()?;
        let bound = binder::bind_named(query, args, self.bind_type)?;
        interact(conn, move |conn| execute_bound(conn, &bound)).await
    }

    async fn query(&self, query: &str, args: &NamedArgs) -> Result<Rows> {
        let conn = self.active_handle()?;
        let bound = binder::bind_named(query, args, self.bind_type)?;
        let (columns, rows) = interact(conn, move |conn| {
            collect_rows(conn, &bound, QUERY_CONTEXT)
        })
        .await?;
        Ok(Rows::new(columns, rows))
    }

    async fn get_row(&self, query: &str, args: &NamedArgs) -> Result<DatabaseRow> {
        let conn = self.active_handle()?;
        let query = binder::rebind(self.bind_type, query);
        let bound = binder::bind_named(&query, args, self.bind_type)?;
        interact(conn, move |conn| get_bound(conn, &bound)).await
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(&self) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished.load(Ordering::Acquire) {
            return;
        }
        if let Some(conn) = self.conn.take() {
            tracing::warn!(
                "Transaction dropped without commit or rollback; closing its connection"
            );
            drop(Object::take(conn));
        }
    }
}
