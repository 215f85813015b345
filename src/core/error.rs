//! Error types for the datastore layer
//!
//! This module defines all error types that can occur while opening connections,
//! registering drivers and running statements.

use std::fmt;

/// Result type alias for datastore operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Boxed driver error kept as the source of a wrapped failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Phase in which a statement failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// The statement could not be prepared (syntax, unknown table, ...)
    Prepare,
    /// Arguments could not be bound to the statement's placeholders
    Bind,
    /// The statement failed while running
    Execute,
    /// A single-row query returned no rows
    NoRows,
    /// A single-row query returned more than one row
    MultipleRows,
    /// A result row could not be converted into the destination type
    Scan,
}

impl StatementKind {
    /// Short description used when the failure has no driver message
    pub fn description(&self) -> &'static str {
        match self {
            StatementKind::Prepare => "prepare failed",
            StatementKind::Bind => "bind failed",
            StatementKind::Execute => "execute failed",
            StatementKind::NoRows => "no rows in result set",
            StatementKind::MultipleRows => "more than one row in result set",
            StatementKind::Scan => "scan failed",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Error types for datastore operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Missing or invalid configuration, detected before any connection attempt
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Installing an extension-aware driver failed
    #[error("Driver registration failed for {driver}: {message}")]
    Registration { driver: String, message: String },

    /// The physical handle could not be opened
    #[error("Unable to connect to datastore via {driver}: {message}")]
    ConnectionFailed {
        driver: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The handle opened but the liveness check failed
    #[error("Failed to ping database after connecting: {message}")]
    Liveness {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A native extension failed to load inside the connection hook
    #[error("Extension load error: {0}")]
    ExtensionLoad(String),

    /// The connection is closed or was never opened
    #[error("Datastore is not connected")]
    NotConnected,

    /// A statement was issued on a transaction after commit or rollback
    #[error("transaction has already been committed or rolled back")]
    TransactionDone,

    /// Preparing, binding, executing or scanning a statement failed
    #[error("{context}: {message}")]
    Statement {
        kind: StatementKind,
        context: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// SQLite error passed through unmodified
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Configuration(msg.into())
    }

    /// Create a registration error for the given driver name
    pub fn registration(driver: impl Into<String>, message: impl Into<String>) -> Self {
        DatabaseError::Registration {
            driver: driver.into(),
            message: message.into(),
        }
    }

    /// Create a connection failed error without a source
    pub fn connection_failed(driver: impl Into<String>, message: impl Into<String>) -> Self {
        DatabaseError::ConnectionFailed {
            driver: driver.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error wrapping the driver's error
    pub fn connection_failed_with_source(
        driver: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        DatabaseError::ConnectionFailed {
            driver: driver.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a liveness error wrapping the failed ping
    pub fn liveness(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        DatabaseError::Liveness {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an extension load error naming the failing path
    pub fn extension_load(path: impl fmt::Display, cause: impl fmt::Display) -> Self {
        DatabaseError::ExtensionLoad(format!("LoadExtension({}): {}", path, cause))
    }

    /// Create a statement error wrapping the driver's error
    pub fn statement(
        kind: StatementKind,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        DatabaseError::Statement {
            kind,
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a statement error detected by this layer (no driver source)
    pub fn statement_without_source(kind: StatementKind, context: impl Into<String>) -> Self {
        DatabaseError::Statement {
            kind,
            context: context.into(),
            message: kind.description().to_string(),
            source: None,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// Statement phase, if this is a statement error
    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self {
            DatabaseError::Statement { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error reports a closed or missing connection
    pub fn is_not_connected(&self) -> bool {
        matches!(self, DatabaseError::NotConnected)
    }
}
