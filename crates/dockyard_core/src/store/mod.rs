//! The dispatcher and the single owner of workspace state.
//!
//! A dispatch cycle drains a FIFO queue. For every action the store:
//!
//! 1. normalizes the current state,
//! 2. runs the registered reducer (if any),
//! 3. validates the result when validation is enabled,
//! 4. commits and notifies listeners when the reference changed,
//! 5. appends the reducer's follow-ups to the back of the queue,
//! 6. runs the registered effect (if any) against the committed state.
//!
//! A transition the validator rejects skips steps 4 to 6.
//!
//! Actions sent by effects arrive on a channel and are processed as separate
//! cycles after the current one has drained.

mod effect_registry;
mod handler_registry;
mod subscription;

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub use effect_registry::{
    error_action, Dispatcher, Effect, EffectContext, EffectRegistry, EffectTicket,
};
pub use handler_registry::{HandlerRegistry, Reducer, Transition};
pub use subscription::{Listener, Subscription};

use crate::allocator::reconcile;
use crate::config::StoreConfig;
use crate::models::Action;
use crate::normalize::{normalize, normalize_in_place};
use crate::state::WorkspaceState;
use crate::validator::validate;
use effect_registry::Generations;
use subscription::Listeners;

/// Counters for one `dispatch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Actions taken off the queue.
    pub processed: usize,
    /// Transitions that replaced the state.
    pub committed: usize,
    /// Transitions refused by the validator.
    pub rejected: usize,
    /// Actions discarded by the per-cycle limit.
    pub dropped: usize,
    /// Cycles run, including cycles for effect-dispatched actions.
    pub cycles: usize,
}

impl DispatchSummary {
    fn absorb(&mut self, other: DispatchSummary) {
        self.processed += other.processed;
        self.committed += other.committed;
        self.rejected += other.rejected;
        self.dropped += other.dropped;
        self.cycles += other.cycles;
    }
}

/// Owns the workspace state and the registries that transform it.
pub struct Store {
    state: Arc<WorkspaceState>,
    handlers: HandlerRegistry,
    effects: EffectRegistry,
    config: Arc<StoreConfig>,
    listeners: Listeners,
    generations: Generations,
    sender: mpsc::UnboundedSender<Vec<Action>>,
    receiver: mpsc::UnboundedReceiver<Vec<Action>>,
    runtime: Option<Handle>,
}

impl Store {
    /// Create a store with the default state and empty registries.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_state(WorkspaceState::default(), config)
    }

    /// Create a store with an initial state; the state is normalized and
    /// its derived structures rebuilt from the panels first.
    pub fn with_state(mut state: WorkspaceState, config: StoreConfig) -> Self {
        normalize_in_place(&mut state);
        reconcile(&mut state);
        if config.validate_transitions {
            for violation in validate(&state) {
                tracing::warn!(%violation, "Initial state violates an invariant");
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(state),
            handlers: HandlerRegistry::new(),
            effects: EffectRegistry::new(),
            config: Arc::new(config),
            listeners: Listeners::default(),
            generations: Generations::default(),
            sender,
            receiver,
            runtime: None,
        }
    }

    /// Replace the reducer table.
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Replace the effect table.
    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.effects = effects;
        self
    }

    /// Runtime used for effect tasks; defaults to the ambient runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    // ========== Accessors ==========

    /// Current committed state.
    pub fn state(&self) -> &Arc<WorkspaceState> {
        &self.state
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Reducer table, for host registrations.
    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    /// Effect table, for host registrations.
    pub fn effects_mut(&mut self) -> &mut EffectRegistry {
        &mut self.effects
    }

    /// A handle for dispatching from other tasks.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.sender.clone())
    }

    /// Register a listener called once per committed state.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<WorkspaceState>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(Arc::new(listener))
    }

    // ========== Dispatch ==========

    /// Process `actions` and their follow-ups, then any actions effects sent
    /// in the meantime.
    pub fn dispatch(&mut self, actions: impl IntoIterator<Item = Action>) -> DispatchSummary {
        let mut summary = self.run_cycle(actions.into_iter().collect());
        summary.absorb(self.drain_pending());
        summary
    }

    /// Process one action.
    pub fn dispatch_one(&mut self, action: Action) -> DispatchSummary {
        self.dispatch([action])
    }

    /// Run every batch already waiting on the channel, each as its own cycle.
    pub fn drain_pending(&mut self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut budget = self.config.max_actions_per_cycle;
        while budget > 0 {
            let Ok(batch) = self.receiver.try_recv() else {
                break;
            };
            let cycle = self.run_cycle(batch.into());
            budget = budget.saturating_sub(cycle.processed.max(1));
            summary.absorb(cycle);
        }
        if budget == 0 && !self.receiver.is_empty() {
            tracing::warn!("Effect actions still pending after the cycle limit; deferring");
        }
        summary
    }

    /// Wait for the next batch sent by an effect and process it.
    pub async fn process_next(&mut self) -> DispatchSummary {
        match self.receiver.recv().await {
            Some(batch) => {
                let mut summary = self.run_cycle(batch.into());
                summary.absorb(self.drain_pending());
                summary
            }
            None => DispatchSummary::default(),
        }
    }

    fn run_cycle(&mut self, mut queue: VecDeque<Action>) -> DispatchSummary {
        let mut summary = DispatchSummary { cycles: 1, ..Default::default() };
        tracing::debug!(queued = queue.len(), "Dispatch cycle started");

        while let Some(action) = queue.pop_front() {
            if summary.processed >= self.config.max_actions_per_cycle {
                summary.dropped = queue.len() + 1;
                tracing::error!(
                    limit = self.config.max_actions_per_cycle,
                    dropped = summary.dropped,
                    action_type = %action,
                    "Dispatch cycle exceeded its action limit; remaining actions dropped"
                );
                break;
            }
            summary.processed += 1;
            tracing::trace!(action_type = %action, "Processing action");

            let before = Arc::clone(&self.state);
            let normalized = normalize(&before);
            let transition = self.handlers.handle(&normalized, &action);

            if transition.changed_from(&before) {
                // A rejected action is dropped whole: no follow-ups, no effect.
                if !self.accepts(&action, &transition.state) {
                    summary.rejected += 1;
                    continue;
                }
                self.commit(transition.state);
                summary.committed += 1;
            }
            queue.extend(transition.follow_ups);

            self.run_effect(&action);
        }

        tracing::debug!(
            processed = summary.processed,
            committed = summary.committed,
            rejected = summary.rejected,
            "Dispatch cycle finished"
        );
        summary
    }

    fn accepts(&self, action: &Action, next: &WorkspaceState) -> bool {
        if !self.config.validate_transitions {
            return true;
        }
        let violations = validate(next);
        if violations.is_empty() {
            return true;
        }
        for violation in &violations {
            tracing::error!(action_type = %action, %violation, "Transition rejected");
        }
        false
    }

    fn commit(&mut self, next: Arc<WorkspaceState>) {
        self.state = next;
        self.listeners.notify(&self.state);
    }

    fn run_effect(&self, action: &Action) {
        let Some(effect) = self.effects.get(action.kind()) else {
            return;
        };
        let context = EffectContext::new(
            Arc::clone(&self.state),
            self.dispatcher(),
            self.generations.clone(),
            Arc::clone(&self.config),
            self.runtime.clone(),
        );
        if let Err(err) = effect(context, action) {
            tracing::warn!(action_type = %action, error = %err, "Effect failed");
            self.dispatcher().dispatch_one(error_action(&err));
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("handlers", &self.handlers)
            .field("effects", &self.effects)
            .field("listeners", &self.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkspaceError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(log: &Arc<Mutex<Vec<String>>>, name: &'static str, next: Option<&'static str>)
        -> impl Fn(&Arc<WorkspaceState>, &Action) -> Transition + Send + Sync + 'static
    {
        let log = Arc::clone(log);
        move |state, _| {
            log.lock().push(name.to_string());
            Transition::unchanged(state).with_follow_ups(next.map(Action::new))
        }
    }

    #[test]
    fn test_follow_ups_run_breadth_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new(StoreConfig::default());
        store
            .handlers_mut()
            .register("A", record(&log, "A", Some("B")))
            .register("B", record(&log, "B", Some("C")))
            .register("C", record(&log, "C", None))
            .register("X", record(&log, "X", None));

        store.dispatch([Action::new("A"), Action::new("X")]);
        assert_eq!(*log.lock(), vec!["A", "X", "B", "C"]);
    }

    #[test]
    fn test_each_change_notifies_once() {
        let mut store = Store::new(StoreConfig::default());
        store.handlers_mut().register("ui/setNotice", |state, action| {
            let text = action.str_field("message").map(String::from);
            Transition::update(state, |s| s.ui.notice = text)
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let notice = |text: &str| Action::new("ui/setNotice").with("message", text);
        let summary = store.dispatch([notice("a"), notice("a"), notice("b")]);
        assert_eq!(summary.committed, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(subscription.unsubscribe());
        store.dispatch([notice("c")]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_runaway_follow_ups_are_cut_off() {
        let mut store = Store::new(StoreConfig::default().with_max_actions(50));
        store.handlers_mut().register("loop", |state, action| {
            Transition::unchanged(state).with_follow_ups([action.clone()])
        });
        let summary = store.dispatch([Action::new("loop")]);
        assert_eq!(summary.processed, 50);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn test_invalid_transition_is_rejected_with_its_follow_ups_and_effect() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new(StoreConfig::default().with_validation(true));
        store
            .handlers_mut()
            .register("break", |state, _| {
                Transition::update(state, |s| s.layout.main_view_order = vec!["ghost".into()])
                    .with_follow_ups([Action::new("after")])
            })
            .register("after", record(&log, "after", None));
        let effect_log = Arc::clone(&log);
        store.effects_mut().register("break", move |_, _| {
            effect_log.lock().push("effect".to_string());
            Ok(())
        });

        let before = Arc::clone(store.state());
        let summary = store.dispatch([Action::new("break")]);
        assert_eq!(summary.rejected, 1);
        assert!(Arc::ptr_eq(store.state(), &before));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_effect_error_becomes_ui_error() {
        let mut store = Store::new(StoreConfig::default());
        store.handlers_mut().register("ui/setError", |state, action| {
            let message = action.str_field("message").map(String::from);
            Transition::update(state, |s| s.ui.error = message)
        });
        store
            .effects_mut()
            .register("boom", |_, _| Err(WorkspaceError::effect("boom", "backend offline")));

        let summary = store.dispatch([Action::new("boom")]);
        assert_eq!(summary.cycles, 2);
        assert_eq!(
            store.state().ui.error.as_deref(),
            Some("Effect 'boom' failed: backend offline (Try the operation again)")
        );
    }

    #[test]
    fn test_effects_see_post_reducer_state() {
        let seen = Arc::new(Mutex::new(None));
        let mut store = Store::new(StoreConfig::default());
        store.handlers_mut().register("ui/setNotice", |state, _| {
            Transition::update(state, |s| s.ui.notice = Some("set".into()))
        });
        let sink = Arc::clone(&seen);
        store.effects_mut().register("ui/setNotice", move |ctx, _| {
            *sink.lock() = ctx.state().ui.notice.clone();
            Ok(())
        });
        store.dispatch([Action::new("ui/setNotice")]);
        assert_eq!(seen.lock().as_deref(), Some("set"));
    }
}
