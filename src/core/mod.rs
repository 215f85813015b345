//! Core datastore types and traits
//!
//! This module provides the backend-independent building blocks: error types,
//! configuration, values, argument sets, the placeholder binder, row scanning
//! and the connection contract.

pub mod args;
pub mod binder;
pub mod config;
pub mod connection;
pub mod error;
pub mod scan;
pub mod value;

// Re-export commonly used types
pub use args::{Args, NamedArgs};
pub use binder::{BindType, BoundQuery};
pub use config::DatabaseConfig;
pub use connection::{Connection, Executor, Transaction};
pub use error::{DatabaseError, Result, StatementKind};
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue, ExecResult, Rows};
