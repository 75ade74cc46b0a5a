//! Backend services used by effects.
//!
//! - `storage` - Snapshot persistence (SQLite or in-memory)
//! - `auth` - Identity provider contract

pub mod auth;
pub mod storage;

pub use auth::{AuthProvider, AuthSession, StaticAuthProvider};
pub use storage::{LocalStorage, SessionStorage, StorageProvider};
