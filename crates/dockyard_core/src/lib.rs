//! Workspace state engine for Dockyard.
//!
//! This crate owns the workspace state and every way it can change:
//!
//! - **store**: Dispatcher, handler/effect registries, subscriptions
//! - **reducers**: Built-in action enums and their reducers
//! - **effects**: Layout persistence and auth effects
//! - **allocator**: Panel/view allocation and reconciliation
//! - **lifecycle**: View instance create/update/destroy
//! - **normalize** / **validator**: Structural repair and checks
//! - **services**: Storage and auth backends used by effects
//! - **models** / **state**: Data structures
//! - **logging** / **config** / **error**: Ambient setup

pub mod allocator;
pub mod config;
pub mod effects;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod reducers;
pub mod registry;
pub mod services;
pub mod state;
pub mod store;
pub mod validator;


pub use config::StoreConfig;
pub use effects::builtin_effects;
pub use error::{ErrorInfo, WorkspaceError};
pub use models::{
    Action, AuthState, AuthUser, ExpansionState, LayoutState, Panel, Placement, Region, Side,
    ViewDefinition, ViewInstance, ViewportWidthMode,
};
pub use reducers::builtin_handlers;
pub use registry::{StaticViewRegistry, ViewRegistry};
pub use services::{AuthProvider, LocalStorage, SessionStorage, StaticAuthProvider, StorageProvider};
pub use state::{LayoutSnapshot, WorkspaceState};
pub use store::{DispatchSummary, Store, Subscription};
