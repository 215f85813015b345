//! SQLite driver registry
//!
//! A driver is a named way of opening SQLite connections. The base drivers
//! open plain connections; an augmented driver additionally loads a fixed list
//! of native extension modules into every physical connection it opens.
//!
//! The registry is an explicit object rather than process-global state:
//! create one at startup, share it (typically behind an `Arc`) and hand it to
//! [`SqliteConnection::open`](super::sqlite::SqliteConnection::open).

use crate::core::{
    binder::BindType,
    error::{DatabaseError, Result},
};
use deadpool_sqlite::{Config, Hook, HookError, Pool, Runtime};
use parking_lot::Mutex;
use rusqlite::LoadExtensionGuard;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Suffix appended to a base driver name to form its augmented name
pub const EXTENDED_DRIVER_SUFFIX: &str = "_extended";

/// Driver names installed by [`DriverRegistry::new`]
pub const BASE_DRIVERS: [&str; 2] = ["sqlite3", "sqlite"];

/// Name under which the extension-loading variant of `base` is registered
pub fn extended_driver_name(base: &str) -> String {
    format!("{}{}", base, EXTENDED_DRIVER_SUFFIX)
}

/// A registered SQLite driver
///
/// Immutable once installed in a registry.
#[derive(Debug, PartialEq, Eq)]
pub struct Driver {
    name: String,
    extensions: Vec<PathBuf>,
}

impl Driver {
    fn new(name: impl Into<String>, extensions: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            extensions,
        }
    }

    /// Driver name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension modules loaded into each new physical connection, in load order
    pub fn extensions(&self) -> &[PathBuf] {
        &self.extensions
    }

    /// Placeholder convention of the driver
    pub fn bind_type(&self) -> BindType {
        BindType::Question
    }

    /// Load every extension into `conn`, in order
    ///
    /// Extension loading is enabled only for the duration of the loop.
    ///
    /// # Errors
    ///
    /// Stops at the first path that fails to load and returns an extension
    /// load error naming it.
    pub fn load_extensions(&self, conn: &rusqlite::Connection) -> Result<()> {
        if self.extensions.is_empty() {
            return Ok(());
        }

        // SAFETY: only paths from the driver's configuration are loaded, and
        // loading is disabled again when the guard drops.
        let _guard = unsafe { LoadExtensionGuard::new(conn) }.map_err(|e| {
            DatabaseError::ExtensionLoad(format!("enable extension loading: {}", e))
        })?;

        for path in &self.extensions {
            // SAFETY: see above; the default entry point is used.
            unsafe { conn.load_extension(path, None::<&str>) }
                .map_err(|e| DatabaseError::extension_load(path.display(), e))?;
            tracing::debug!(driver = %self.name, extension = %path.display(), "Extension loaded");
        }

        Ok(())
    }

    /// Build a connection pool for `url` that opens connections through this driver
    pub(crate) fn create_pool(self: &Arc<Self>, url: &str) -> Result<Pool> {
        let mut builder = Config::new(url)
            .builder(Runtime::Tokio1)
            .map_err(|e| DatabaseError::connection_failed(&self.name, e.to_string()))?;

        if !self.extensions.is_empty() {
            let driver = Arc::clone(self);
            builder = builder.post_create(Hook::async_fn(move |conn, _| {
                let driver = Arc::clone(&driver);
                Box::pin(async move {
                    let loaded = conn
                        .interact(move |conn| driver.load_extensions(conn))
                        .await
                        .map_err(|e| {
                            HookError::Message(format!("connection hook aborted: {}", e).into())
                        })?;

                    loaded.map_err(|e| match e {
                        DatabaseError::ExtensionLoad(message) => HookError::Message(message.into()),
                        other => HookError::Message(other.to_string().into()),
                    })
                })
            }));
        }

        builder
            .build()
            .map_err(|e| DatabaseError::connection_failed(&self.name, e.to_string()))
    }
}

/// Registry of SQLite drivers, keyed by name
///
/// Entries are append-only: once a name is installed it keeps the same
/// [`Driver`] for the life of the registry.
#[derive(Debug)]
pub struct DriverRegistry {
    drivers: Mutex<HashMap<String, Arc<Driver>>>,
}

impl DriverRegistry {
    /// Create a registry holding the base drivers
    pub fn new() -> Self {
        let drivers = BASE_DRIVERS
            .iter()
            .map(|name| (name.to_string(), Arc::new(Driver::new(*name, Vec::new()))))
            .collect();

        Self {
            drivers: Mutex::new(drivers),
        }
    }

    /// Register `driver_name` as a driver loading `extension_paths`
    ///
    /// An empty `extension_paths` is a no-op: the base driver is used as is.
    /// The check and the insertion happen under one lock, so concurrent first
    /// registrations install exactly one driver. Registering the same name
    /// with the same extensions again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a registration error if the name is empty, names a base driver,
    /// or is already registered with different extensions.
    pub fn register(&self, driver_name: &str, extension_paths: &[PathBuf]) -> Result<()> {
        if extension_paths.is_empty() {
            return Ok(());
        }
        if driver_name.is_empty() {
            return Err(DatabaseError::registration(
                driver_name,
                "driver name is empty",
            ));
        }
        if BASE_DRIVERS.contains(&driver_name) {
            return Err(DatabaseError::registration(
                driver_name,
                "cannot replace a base driver",
            ));
        }

        let mut drivers = self.drivers.lock();
        if let Some(existing) = drivers.get(driver_name) {
            if existing.extensions() == extension_paths {
                return Ok(());
            }
            return Err(DatabaseError::registration(
                driver_name,
                format!(
                    "already registered with extensions [{}]",
                    join_paths(existing.extensions())
                ),
            ));
        }

        drivers.insert(
            driver_name.to_string(),
            Arc::new(Driver::new(driver_name, extension_paths.to_vec())),
        );
        tracing::debug!(
            driver = %driver_name,
            extensions = %join_paths(extension_paths),
            "Registered extension driver"
        );

        Ok(())
    }

    /// Look up a driver by name
    ///
    /// # Errors
    ///
    /// Returns a connection error for unknown driver names.
    pub fn driver(&self, driver_name: &str) -> Result<Arc<Driver>> {
        self.drivers
            .lock()
            .get(driver_name)
            .cloned()
            .ok_or_else(|| {
                DatabaseError::connection_failed(
                    driver_name,
                    format!("unknown driver {:?}", driver_name),
                )
            })
    }

    /// Check if a driver is registered under `driver_name`
    pub fn contains(&self, driver_name: &str) -> bool {
        self.drivers.lock().contains_key(driver_name)
    }

    /// Number of registered drivers, base drivers included
    pub fn len(&self) -> usize {
        self.drivers.lock().len()
    }

    /// Check if the registry holds no drivers
    pub fn is_empty(&self) -> bool {
        self.drivers.lock().is_empty()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
