//! Datastore backend implementations
//!
//! This module contains the SQLite driver registry and the implementation of
//! the connection contract on top of it.

#[cfg(feature = "sqlite")]
pub mod registry;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use registry::{extended_driver_name, Driver, DriverRegistry};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteTransaction};
