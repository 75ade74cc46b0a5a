//! Side effects: registration, the context they run with, and generation
//! tickets for superseding in-flight work.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::error::WorkspaceError;
use crate::models::Action;
use crate::reducers::ui::UiAction;
use crate::state::WorkspaceState;

/// An effect. Runs after the action's reducer with the resulting state.
///
/// Returning an error is equivalent to dispatching `ui/setError` with the
/// error text; effects that need a domain-specific error action dispatch it
/// themselves and return `Ok`.
pub type Effect = Arc<dyn Fn(EffectContext, &Action) -> Result<(), WorkspaceError> + Send + Sync>;

/// Effects by action type. Registering a type again replaces its effect.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    effects: HashMap<String, Effect>,
}

impl EffectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the effect for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, effect: F) -> &mut Self
    where
        F: Fn(EffectContext, &Action) -> Result<(), WorkspaceError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.effects.insert(kind.clone(), Arc::new(effect)).is_some() {
            tracing::debug!(action_type = %kind, "Effect replaced");
        }
        self
    }

    /// Effect for `kind`.
    pub fn get(&self, kind: &str) -> Option<&Effect> {
        self.effects.get(kind)
    }

    /// Registered action types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effects are registered.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry").field("types", &self.types()).finish()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Cloneable handle for sending actions back to the store.
///
/// Batches sent here are processed as new dispatch cycles once the store's
/// current cycle has finished.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Vec<Action>>,
}

impl Dispatcher {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Vec<Action>>) -> Self {
        Self { sender }
    }

    /// Queue a batch of actions. Returns false once the store is gone.
    pub fn dispatch(&self, actions: impl IntoIterator<Item = Action>) -> bool {
        let batch: Vec<Action> = actions.into_iter().collect();
        if batch.is_empty() {
            return true;
        }
        match self.sender.send(batch) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(dropped = err.0.len(), "Store closed; actions dropped");
                false
            }
        }
    }

    /// Queue one action.
    pub fn dispatch_one(&self, action: Action) -> bool {
        self.dispatch([action])
    }
}

// ============================================================================
// Generations
// ============================================================================

#[derive(Debug)]
struct Slot {
    generation: u64,
    token: CancellationToken,
}

/// Latest generation per effect key, shared by every context of one store.
#[derive(Debug, Clone, Default)]
pub(crate) struct Generations {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl Generations {
    fn begin(&self, key: &str) -> (u64, CancellationToken) {
        let mut slots = self.slots.lock();
        let token = CancellationToken::new();
        let generation = match slots.get_mut(key) {
            Some(slot) => {
                slot.token.cancel();
                slot.generation += 1;
                slot.token = token.clone();
                slot.generation
            }
            None => {
                slots.insert(key.to_string(), Slot { generation: 1, token: token.clone() });
                1
            }
        };
        (generation, token)
    }

    fn current(&self, key: &str) -> Option<u64> {
        self.slots.lock().get(key).map(|slot| slot.generation)
    }
}

/// Claim on the latest run of a keyed effect.
///
/// Starting a new ticket for the same key cancels this one; completions from
/// a superseded ticket are dropped.
pub struct EffectTicket {
    key: String,
    generation: u64,
    token: CancellationToken,
    generations: Generations,
    dispatcher: Dispatcher,
    started_at: DateTime<Utc>,
}

impl EffectTicket {
    /// Effect key this ticket belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Generation number, starting at 1 per key.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no newer ticket exists for the key.
    pub fn is_current(&self) -> bool {
        self.generations.current(&self.key) == Some(self.generation)
    }

    /// Check if a newer ticket has superseded this one.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until superseded.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Milliseconds since the ticket was issued.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Dispatch `actions` if this ticket is still current.
    ///
    /// Returns whether the actions were sent.
    pub fn complete(self, actions: impl IntoIterator<Item = Action>) -> bool {
        if !self.is_current() {
            tracing::debug!(
                key = %self.key,
                generation = self.generation,
                elapsed_ms = self.elapsed_ms(),
                "Stale effect completion dropped"
            );
            return false;
        }
        self.dispatcher.dispatch(actions)
    }
}

impl fmt::Debug for EffectTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectTicket")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("started_at", &self.started_at)
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

// ============================================================================
// EffectContext
// ============================================================================

/// What an effect gets to work with.
///
/// Effects read the state snapshot, never write it; results travel back
/// through [`EffectContext::dispatch`].
#[derive(Clone)]
pub struct EffectContext {
    state: Arc<WorkspaceState>,
    dispatcher: Dispatcher,
    generations: Generations,
    config: Arc<StoreConfig>,
    runtime: Option<Handle>,
}

impl EffectContext {
    pub(crate) fn new(
        state: Arc<WorkspaceState>,
        dispatcher: Dispatcher,
        generations: Generations,
        config: Arc<StoreConfig>,
        runtime: Option<Handle>,
    ) -> Self {
        Self { state, dispatcher, generations, config, runtime }
    }

    /// State after the triggering action's reducer ran.
    pub fn state(&self) -> &Arc<WorkspaceState> {
        &self.state
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A dispatcher that outlives this context.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Queue actions for a later cycle.
    pub fn dispatch(&self, actions: impl IntoIterator<Item = Action>) -> bool {
        self.dispatcher.dispatch(actions)
    }

    /// Start a new generation for `key`, cancelling the previous one.
    pub fn begin(&self, key: &str) -> EffectTicket {
        let (generation, token) = self.generations.begin(key);
        tracing::trace!(key, generation, "Effect generation started");
        EffectTicket {
            key: key.to_string(),
            generation,
            token,
            generations: self.generations.clone(),
            dispatcher: self.dispatcher.clone(),
            started_at: Utc::now(),
        }
    }

    /// Run async work on the store's runtime.
    ///
    /// A failed task becomes a `ui/setError` action. Returns false when no
    /// runtime is available.
    pub fn spawn<F>(&self, action_type: &str, task: F) -> bool
    where
        F: Future<Output = Result<(), WorkspaceError>> + Send + 'static,
    {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            tracing::warn!(action_type, "No async runtime; effect task not started");
            return false;
        };

        let dispatcher = self.dispatcher.clone();
        let action_type = action_type.to_string();
        runtime.spawn(async move {
            if let Err(err) = task.await {
                tracing::warn!(action_type = %action_type, error = %err, "Effect task failed");
                dispatcher.dispatch_one(error_action(&err));
            }
        });
        true
    }
}

impl fmt::Debug for EffectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("config", &self.config)
            .field("has_runtime", &self.runtime.is_some())
            .finish()
    }
}

/// The action an effect error turns into.
pub fn error_action(err: &WorkspaceError) -> Action {
    UiAction::SetError(err.to_error_info().display_text()).into_action()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (EffectContext, mpsc::UnboundedReceiver<Vec<Action>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = EffectContext::new(
            Arc::new(WorkspaceState::default()),
            Dispatcher::new(sender),
            Generations::default(),
            Arc::new(StoreConfig::default()),
            None,
        );
        (context, receiver)
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let (context, mut receiver) = context();
        let first = context.begin("auth/login");
        let second = context.begin("auth/login");
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(second.generation(), 2);

        assert!(!first.complete([Action::new("auth/loginSucceeded")]));
        assert!(second.complete([Action::new("auth/loginFailed")]));

        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch[0].kind(), "auth/loginFailed");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_keys_are_independent() {
        let (context, _receiver) = context();
        let login = context.begin("auth/login");
        let _save = context.begin("layout/save");
        assert!(login.is_current());
    }

    #[test]
    fn test_spawn_without_runtime_reports_false() {
        let (context, _receiver) = context();
        assert!(!context.spawn("layout/save", async { Ok(()) }));
    }

    #[tokio::test]
    async fn test_failed_task_dispatches_error() {
        let (context, mut receiver) = context();
        assert!(context.spawn("layout/save", async {
            Err(WorkspaceError::storage("disk full", None))
        }));
        let batch = receiver.recv().await.unwrap();
        assert_eq!(batch[0].kind(), UiAction::SET_ERROR);
        assert_eq!(batch[0].str_field("message"), Some("Storage error: disk full"));
    }

    #[test]
    fn test_empty_dispatch_is_accepted() {
        let (context, mut receiver) = context();
        assert!(context.dispatch(Vec::new()));
        assert!(receiver.try_recv().is_err());
    }
}
