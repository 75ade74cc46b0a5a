//! Reducer registration and lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::models::Action;
use crate::state::WorkspaceState;

/// Result of running a reducer.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Next state; the input `Arc` when nothing changed.
    pub state: Arc<WorkspaceState>,
    /// Actions to append to the end of the dispatch queue.
    pub follow_ups: Vec<Action>,
}

impl Transition {
    /// No change, no follow-ups.
    pub fn unchanged(state: &Arc<WorkspaceState>) -> Self {
        Self { state: Arc::clone(state), follow_ups: Vec::new() }
    }

    /// Copy-on-write update.
    ///
    /// `update` runs against a private copy; the input reference is returned
    /// when the copy ends up equal to it.
    pub fn update(state: &Arc<WorkspaceState>, update: impl FnOnce(&mut WorkspaceState)) -> Self {
        let mut next = WorkspaceState::clone(state);
        update(&mut next);
        if next == **state {
            Self::unchanged(state)
        } else {
            Self { state: Arc::new(next), follow_ups: Vec::new() }
        }
    }

    /// Attach follow-up actions.
    pub fn with_follow_ups(mut self, follow_ups: impl IntoIterator<Item = Action>) -> Self {
        self.follow_ups.extend(follow_ups);
        self
    }

    /// Whether the state reference differs from `before`.
    pub fn changed_from(&self, before: &Arc<WorkspaceState>) -> bool {
        !Arc::ptr_eq(&self.state, before)
    }
}

/// A pure state transition function.
pub type Reducer = Arc<dyn Fn(&Arc<WorkspaceState>, &Action) -> Transition + Send + Sync>;

/// Reducers by action type. Registering a type again replaces its reducer.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Reducer>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the reducer for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, reducer: F) -> &mut Self
    where
        F: Fn(&Arc<WorkspaceState>, &Action) -> Transition + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.handlers.insert(kind.clone(), Arc::new(reducer)).is_some() {
            tracing::debug!(action_type = %kind, "Reducer replaced");
        }
        self
    }

    /// Reducer for `kind`.
    pub fn get(&self, kind: &str) -> Option<&Reducer> {
        self.handlers.get(kind)
    }

    /// Whether a reducer is registered for `kind`.
    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Run the matching reducer; unknown types leave the state untouched.
    pub fn handle(&self, state: &Arc<WorkspaceState>, action: &Action) -> Transition {
        match self.handlers.get(action.kind()) {
            Some(reducer) => reducer(state, action),
            None => Transition::unchanged(state),
        }
    }

    /// Registered action types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered reducers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no reducers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry").field("types", &self.types()).finish()
    }
}
