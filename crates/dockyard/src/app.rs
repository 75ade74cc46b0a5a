//! Dockyard host: owns the store and wires built-in reducers, effects and
//! the demo view catalog.

use std::sync::Arc;
use std::time::Duration;

use dockyard_core::effects::{LOAD_LAYOUT, SAVE_LAYOUT};
use dockyard_core::models::{Action, AuthUser, Region, ViewDefinition};
use dockyard_core::reducers::{AuthAction, PanelAction};
use dockyard_core::registry::context;
use dockyard_core::services::storage::default_data_dir;
use dockyard_core::{
    builtin_effects, builtin_handlers, LocalStorage, SessionStorage, StaticAuthProvider,
    StaticViewRegistry, StorageProvider, Store, StoreConfig, Subscription,
};
use serde_json::json;
use tokio::runtime::Runtime;

/// How long the host waits for an async effect to report back.
const EFFECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Views the demo host knows how to show.
pub fn demo_views() -> StaticViewRegistry {
    StaticViewRegistry::with_definitions([
        ViewDefinition::new("counter", "Counter").with_context(context(json!({"count": 0}))),
        ViewDefinition::new("clock", "Clock").with_context(context(json!({"format": "%H:%M:%S"}))),
        ViewDefinition::new("notes", "Notes").with_region(Region::Right),
        ViewDefinition::new("logs", "Logs").with_region(Region::Bottom),
    ])
}

/// Open the on-disk store, falling back to memory when the data directory is unusable.
fn open_storage() -> Arc<dyn StorageProvider> {
    match LocalStorage::open(default_data_dir()) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::warn!(error = %e, "Local storage unavailable; layout will not persist");
            Arc::new(SessionStorage::new())
        }
    }
}

fn demo_auth() -> StaticAuthProvider {
    StaticAuthProvider::new().with_account(
        "demo",
        "demo",
        AuthUser { id: "demo".into(), name: "Demo User".into(), email: None },
        false,
    )
}

/// The running host.
pub struct DockyardApp {
    runtime: Runtime,
    store: Store,
    _changes: Subscription,
}

impl DockyardApp {
    /// Build the store on a fresh runtime.
    pub fn new(runtime: Runtime) -> Self {
        let config = StoreConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid store configuration");
            StoreConfig::default()
        });

        let store = Store::new(config)
            .with_handlers(builtin_handlers(Arc::new(demo_views())))
            .with_effects(builtin_effects(open_storage(), Some(Arc::new(demo_auth()))))
            .with_runtime(runtime.handle().clone());

        let changes = store.subscribe(|state| {
            tracing::debug!(
                main = ?state.layout.main_view_order,
                instances = state.view_instances.len(),
                "Workspace changed"
            );
        });

        Self { runtime, store, _changes: changes }
    }

    /// Restore the saved layout, seeding a default one on first run.
    pub fn restore(&mut self) {
        self.store.dispatch_one(Action::new(LOAD_LAYOUT));
        if self.store.state().view_instances.is_empty() {
            tracing::info!("No saved layout; seeding defaults");
            self.store.dispatch([
                Action::new(PanelAction::SET_MAIN_AREA_COUNT).with("count", 2),
                PanelAction::SetMainViewOrder(vec!["counter".into(), "clock".into()]).into_action(),
                Action::new(PanelAction::ASSIGN_VIEW)
                    .with("panelId", "right-1")
                    .with("viewId", "notes"),
            ]);
        }
    }

    /// Sign in and wait for the provider's answer.
    pub fn sign_in(&mut self, username: &str, password: &str) {
        self.store.dispatch_one(
            AuthAction::Login { username: username.into(), password: password.into() }
                .into_action(),
        );
        self.wait_for_effects();
    }

    /// Persist the current layout.
    pub fn save(&mut self) {
        self.store.dispatch_one(Action::new(SAVE_LAYOUT));
    }

    /// Wait for the next batch of effect results, up to `EFFECT_TIMEOUT`,
    /// and process it along with anything already queued behind it.
    fn wait_for_effects(&mut self) {
        let store = &mut self.store;
        self.runtime.block_on(async {
            match tokio::time::timeout(EFFECT_TIMEOUT, store.process_next()).await {
                Ok(summary) => tracing::debug!(?summary, "Effect results processed"),
                Err(_) => tracing::warn!("Timed out waiting for effect results"),
            }
        });
    }

    /// The store, for inspection.
    pub fn store(&self) -> &Store {
        &self.store
    }
}
