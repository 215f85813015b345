//! # dbx
//!
//! A small storage-access layer over SQLite: open a pooled connection from a
//! configuration, run statements with `:name` parameters, fetch single rows or
//! row sets straight into serde types, and group work into transactions.
//!
//! ## Features
//!
//! - **Named parameters**: `:name` placeholders resolved from [`NamedArgs`] or
//!   any `Serialize` struct, rebound to the driver's native syntax
//! - **Extensions**: native SQLite extension modules loaded into every
//!   physical connection through an augmented driver
//! - **Async Support**: Async/await support with Tokio, blocking SQLite calls
//!   run on the pool's worker threads
//! - **Typed scanning**: rows deserialize into any `Deserialize` type
//! - **Transactions**: bound to one physical connection for their lifetime
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbx::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = DriverRegistry::new();
//!     let config = DatabaseConfig::from_env();
//!     let conn = SqliteConnection::open(&registry, &config).await?;
//!
//!     conn.execute(
//!         "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)",
//!         &NamedArgs::new(),
//!     )
//!     .await?;
//!
//!     let tx = conn.begin_tx().await?;
//!     tx.execute(
//!         "INSERT INTO users (id, name) VALUES (:id, :name)",
//!         &NamedArgs::new().bind("id", 1).bind("name", "Alice"),
//!     )
//!     .await?;
//!     tx.commit().await?;
//!
//!     let users: Vec<User> = conn
//!         .select("SELECT id, name FROM users WHERE id > ?", &Args::positional([0]))
//!         .await?;
//!     for user in users {
//!         println!("User {}: {}", user.id, user.name);
//!     }
//!
//!     conn.close().await
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! dbx/
//! ├── src/
//! │   ├── core/              # Backend-independent types and traits
//! │   │   ├── args.rs        # Named and positional argument sets
//! │   │   ├── binder.rs      # Placeholder compilation and rebinding
//! │   │   ├── config.rs      # Datastore configuration
//! │   │   ├── connection.rs  # Connection, Executor and Transaction traits
//! │   │   ├── error.rs       # Error types
//! │   │   ├── scan.rs        # Row scanning into serde types
//! │   │   ├── value.rs       # Value types
//! │   │   └── mod.rs
//! │   ├── backends/          # SQLite implementation
//! │   │   ├── registry.rs    # Driver registry and extension loading
//! │   │   ├── sqlite.rs      # Pooled connection and transactions
//! │   │   └── mod.rs
//! │   └── lib.rs
//! ├── tests/                 # Integration and property tests
//! ├── benches/               # Binder benchmarks
//! └── Cargo.toml
//! ```

/// Core datastore types and traits
pub mod core;

/// Datastore backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use dbx::prelude::*;
///
/// let config = DatabaseConfig::new("file:data.sqlite3", "sqlite3");
/// assert!(config.validate().is_ok());
/// ```
pub mod prelude {
    pub use crate::core::{
        Args, Connection, DatabaseConfig, DatabaseError, DatabaseResult, DatabaseRow,
        DatabaseValue, ExecResult, Executor, NamedArgs, Result, Rows, StatementKind, Transaction,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{DriverRegistry, SqliteConnection, SqliteTransaction};
}

// Re-export at root level for convenience
pub use self::core::{
    Args, BindType, Connection, DatabaseConfig, DatabaseError, DatabaseResult, DatabaseRow,
    DatabaseValue, ExecResult, Executor, NamedArgs, Result, Rows, StatementKind, Transaction,
};

#[cfg(feature = "sqlite")]
pub use backends::{Driver, DriverRegistry, SqliteConnection, SqliteTransaction};
