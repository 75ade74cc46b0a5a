//! Built-in effects.
//!
//! Effects are the only code that touches services. They read the committed
//! state from their [`EffectContext`](crate::store::EffectContext) and report
//! back by dispatching ordinary actions.

pub mod auth;
pub mod persistence;

use std::sync::Arc;

use crate::services::{AuthProvider, StorageProvider};
use crate::store::EffectRegistry;

pub use persistence::{LOAD_LAYOUT, SAVE_LAYOUT};

/// An effect table with layout persistence and, when a provider is given, auth.
pub fn builtin_effects(
    storage: Arc<dyn StorageProvider>,
    auth: Option<Arc<dyn AuthProvider>>,
) -> EffectRegistry {
    let mut effects = EffectRegistry::new();
    tracing::debug!(storage = storage.name(), "Registering persistence effects");
    persistence::register(&mut effects, storage);
    match auth {
        Some(provider) => {
            tracing::debug!(provider = provider.name(), "Registering auth effects");
            auth::register(&mut effects, provider);
        }
        None => tracing::debug!("No auth provider; auth/login and auth/logout are unhandled"),
    }
    effects
}
