//! Connection and transaction contract
//!
//! This module defines the traits every backend implements. [`Executor`] is
//! the query surface shared by connections and transactions, so code written
//! against it runs unchanged inside or outside a transaction.

use super::args::{Args, NamedArgs};
use super::error::Result;
use super::scan;
use super::value::{DatabaseResult, DatabaseRow, ExecResult, Rows};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Context carried by every single-row retrieval failure
pub const GET_CONTEXT: &str = "failed to execute get statement";

/// Query surface shared by connections and transactions
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a statement that doesn't return rows (INSERT, UPDATE, DELETE, DDL)
    ///
    /// Placeholders are `:name` and are resolved against `args`.
    async fn execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult>;

    /// Execute a statement that returns rows
    ///
    /// Placeholders are `:name` and are resolved against `args`.
    async fn query(&self, query: &str, args: &NamedArgs) -> Result<Rows>;

    /// Fetch exactly one row through a prepared statement
    ///
    /// # Errors
    ///
    /// Fails with a `NoRows` statement error when nothing matches and with a
    /// `MultipleRows` statement error when more than one row matches.
    async fn get_row(&self, query: &str, args: &NamedArgs) -> Result<DatabaseRow>;

    /// Fetch exactly one row and scan it into `T`
    async fn get<T>(&self, query: &str, args: &NamedArgs) -> Result<T>
    where
        T: DeserializeOwned + Send,
        Self: Sized,
    {
        let row = self.get_row(query, args).await?;
        scan::from_row_with_context(row, GET_CONTEXT)
    }
}

/// A logical connection to the datastore
#[async_trait]
pub trait Connection: Executor {
    /// Transaction type created by [`Connection::begin_tx`]
    type Tx: Transaction;

    /// Check that the datastore is reachable
    async fn ping(&self) -> Result<()>;

    /// Close the connection
    ///
    /// Every operation after `close`, including a second `close`, fails with
    /// `NotConnected`.
    async fn close(&self) -> Result<()>;

    /// Fetch zero or more rows
    ///
    /// Named arguments resolve `:name` placeholders before rebinding;
    /// positional arguments are passed through with the template only
    /// rebound to the driver's placeholder syntax.
    async fn select_rows(&self, query: &str, args: &Args) -> Result<DatabaseResult>;

    /// Fetch zero or more rows and scan each into `T`
    async fn select<T>(&self, query: &str, args: &Args) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
        Self: Sized,
    {
        let rows = self.select_rows(query, args).await?;
        scan::from_rows(rows)
    }

    /// Start a transaction on a dedicated physical connection
    async fn begin_tx(&self) -> Result<Self::Tx>;
}

/// A unit of work bound to one physical connection
///
/// Exactly one of [`Transaction::commit`] or [`Transaction::rollback`] must end
/// it. Calling either again, or running statements afterwards, reaches the
/// driver and returns its error.
#[async_trait]
pub trait Transaction: Executor {
    /// Make every statement of the transaction durable
    async fn commit(&self) -> Result<()>;

    /// Discard every statement since the transaction began
    async fn rollback(&self) -> Result<()>;
}
