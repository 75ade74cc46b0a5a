//! Session-wide reset.

use std::sync::Arc;

use crate::error::WorkspaceError;
use crate::models::Action;
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::decode;

/// Session actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Start over from the default state. Instance ids keep counting up.
    Reset,
}

impl SessionAction {
    pub const RESET: &'static str = "session/reset";

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        match action.kind() {
            Self::RESET => Ok(Self::Reset),
            other => Err(WorkspaceError::invalid_payload(other, "not a session action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::Reset => Action::new(Self::RESET),
        }
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry) {
    handlers.register(SessionAction::RESET, reduce);
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action) -> Transition {
    match decode(action, SessionAction::parse) {
        Some(SessionAction::Reset) => Transition::update(state, |s| {
            let counter = s.view_instance_counter;
            *s = WorkspaceState { view_instance_counter: counter, ..WorkspaceState::default() };
        }),
        None => Transition::unchanged(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_counter() {
        let mut dirty = WorkspaceState::default();
        dirty.view_instance_counter = 9;
        dirty.ui.error = Some("x".into());
        dirty.layout.overlay_view = Some("notes-3".into());

        let next = reduce(&Arc::new(dirty), &SessionAction::Reset.into_action()).state;
        assert_eq!(next.view_instance_counter, 9);
        assert!(next.ui.error.is_none());
        assert!(next.layout.overlay_view.is_none());
    }

    #[test]
    fn test_reset_of_default_keeps_reference() {
        let state = Arc::new(WorkspaceState::default());
        let next = reduce(&state, &SessionAction::Reset.into_action()).state;
        assert!(Arc::ptr_eq(&state, &next));
    }
}
