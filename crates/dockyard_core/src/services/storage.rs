//! Persistence backends for workspace snapshots.
//!
//! Effects are the only callers. Values are JSON documents addressed by key;
//! what goes in a document is up to the effect that writes it.
//!
//! # Data Directory Locations
//!
//! - **macOS**: `~/Library/Application Support/dev.dockyard.Dockyard`
//! - **Windows**: `%APPDATA%\dockyard\Dockyard`
//! - **Linux**: `~/.local/share/dockyard`
//! - **Debug builds**: `./dockyard_data` in current directory

use crate::error::WorkspaceError;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Get the default data directory for the application.
///
/// Debug builds use `./dockyard_data` in the current directory.
pub fn default_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from("./dockyard_data")
    }

    #[cfg(not(debug_assertions))]
    {
        dirs::data_dir()
            .map(|d| {
                #[cfg(target_os = "macos")]
                {
                    d.join("dev.dockyard.Dockyard")
                }
                #[cfg(target_os = "windows")]
                {
                    d.join("dockyard").join("Dockyard")
                }
                #[cfg(not(any(target_os = "macos", target_os = "windows")))]
                {
                    d.join("dockyard")
                }
            })
            .unwrap_or_else(|| PathBuf::from("./dockyard_data"))
    }
}

/// Initialize the data directory, creating it if needed.
pub fn init_data_dir(path: &Path) -> Result<(), WorkspaceError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(WorkspaceError::storage(
                format!("Data path exists but is not a directory: {}", path.display()),
                Some("Select a different location or remove the existing file"),
            ));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| {
        WorkspaceError::storage(
            format!("Failed to create data directory '{}': {}", path.display(), e),
            Some("Check permissions or select a different location"),
        )
    })?;

    tracing::info!(path = %path.display(), "Created data directory");
    Ok(())
}

/// Key/value persistence for JSON documents.
pub trait StorageProvider: Send + Sync {
    /// Store `value` under `key`, replacing what was there.
    fn save(&self, key: &str, value: &Value) -> Result<(), WorkspaceError>;

    /// Load the value stored under `key`.
    fn load(&self, key: &str) -> Result<Option<Value>, WorkspaceError>;

    /// Remove `key`. Missing keys are not an error.
    fn delete(&self, key: &str) -> Result<(), WorkspaceError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// SQLite-based local storage.
///
/// Thread-safe via internal Mutex. Uses WAL mode for concurrent reads.
pub struct LocalStorage {
    connection: Mutex<Connection>,
    data_dir: PathBuf,
}

impl LocalStorage {
    /// Open or create local storage in the given data directory.
    pub fn open(data_dir: PathBuf) -> Result<Self, WorkspaceError> {
        init_data_dir(&data_dir)?;
        let db_path = data_dir.join("dockyard.db");
        Self::open_with_path(db_path, data_dir)
    }

    /// Open storage with a specific database path.
    pub fn open_with_path(db_path: PathBuf, data_dir: PathBuf) -> Result<Self, WorkspaceError> {
        let connection = Connection::open(&db_path).map_err(|e| {
            WorkspaceError::storage(
                format!("Failed to open database '{}': {}", db_path.display(), e),
                Some("The database file may be corrupted. Try deleting it to start fresh."),
            )
        })?;

        Self::configure_connection(&connection)?;

        let storage = Self { connection: Mutex::new(connection), data_dir };
        storage.run_migrations()?;

        tracing::info!(path = %db_path.display(), "Local storage opened");
        Ok(storage)
    }

    fn configure_connection(conn: &Connection) -> Result<(), WorkspaceError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
            ",
        )
        .map_err(|e| WorkspaceError::storage(format!("Failed to configure database: {e}"), None))
    }

    fn run_migrations(&self) -> Result<(), WorkspaceError> {
        const DOMAIN: &str = "workspace";

        let conn = self.connection.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                domain TEXT NOT NULL,
                step INTEGER NOT NULL,
                migration TEXT NOT NULL,
                PRIMARY KEY(domain, step)
            ) STRICT",
            [],
        )
        .map_err(|e| {
            WorkspaceError::storage(format!("Failed to create migrations table: {e}"), None)
        })?;

        let current_step: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(step), 0) FROM migrations WHERE domain = ?",
                [DOMAIN],
                |row| row.get(0),
            )
            .map_err(|e| WorkspaceError::storage(format!("Failed to read migrations: {e}"), None))?;

        if current_step < 1 {
            conn.execute_batch(
                "
                CREATE TABLE ui_state (
                    key TEXT PRIMARY KEY,
                    value_json TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                ) STRICT;
                ",
            )
            .map_err(|e| WorkspaceError::storage(format!("Migration 1 failed: {e}"), None))?;

            conn.execute(
                "INSERT INTO migrations (domain, step, migration) VALUES (?, 1, 'ui_state')",
                [DOMAIN],
            )
            .map_err(|e| WorkspaceError::storage(format!("Failed to record migration: {e}"), None))?;

            tracing::info!("Applied migration 1: ui_state");
        }

        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// When `key` was last written, as RFC 3339.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, WorkspaceError> {
        let conn = self.connection.lock();
        conn.query_row("SELECT updated_at FROM ui_state WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .map_err(|e| WorkspaceError::storage(format!("Failed to read UI state: {e}"), None))
    }
}

impl StorageProvider for LocalStorage {
    fn save(&self, key: &str, value: &Value) -> Result<(), WorkspaceError> {
        let json = serde_json::to_string(value)?;
        let conn = self.connection.lock();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO ui_state (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
            params![key, json, now],
        )
        .map_err(|e| WorkspaceError::storage_with_source("Failed to save UI state", e))?;

        tracing::debug!(key, bytes = json.len(), "UI state saved");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, WorkspaceError> {
        let conn = self.connection.lock();

        let result: Option<String> = conn
            .query_row("SELECT value_json FROM ui_state WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .map_err(|e| WorkspaceError::storage_with_source("Failed to load UI state", e))?;

        match result {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str).map_err(|e| {
                    WorkspaceError::storage(
                        format!("Invalid UI state JSON: {e}"),
                        Some("Delete the saved layout to start fresh"),
                    )
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), WorkspaceError> {
        let conn = self.connection.lock();

        conn.execute("DELETE FROM ui_state WHERE key = ?", [key])
            .map_err(|e| WorkspaceError::storage_with_source("Failed to delete UI state", e))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// In-memory storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct SessionStorage {
    entries: RwLock<HashMap<String, Value>>,
}

impl SessionStorage {
    /// Create empty session storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageProvider for SessionStorage {
    fn save(&self, key: &str, value: &Value) -> Result<(), WorkspaceError> {
        self.entries.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, WorkspaceError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), WorkspaceError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "session"
    }
}
