//! Workspace-wide messages.

use std::sync::Arc;

use crate::error::WorkspaceError;
use crate::models::Action;
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::decode;

/// Transient UI message actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Show an error.
    SetError(String),
    /// Hide the error.
    ClearError,
    /// Show an informational notice.
    SetNotice(String),
    /// Hide the notice.
    ClearNotice,
}

impl UiAction {
    pub const SET_ERROR: &'static str = "ui/setError";
    pub const CLEAR_ERROR: &'static str = "ui/clearError";
    pub const SET_NOTICE: &'static str = "ui/setNotice";
    pub const CLEAR_NOTICE: &'static str = "ui/clearNotice";

    pub const TYPES: [&'static str; 4] =
        [Self::SET_ERROR, Self::CLEAR_ERROR, Self::SET_NOTICE, Self::CLEAR_NOTICE];

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        let message = || action.str_field("message").unwrap_or_default().to_string();
        match action.kind() {
            Self::SET_ERROR => Ok(Self::SetError(message())),
            Self::CLEAR_ERROR => Ok(Self::ClearError),
            Self::SET_NOTICE => Ok(Self::SetNotice(message())),
            Self::CLEAR_NOTICE => Ok(Self::ClearNotice),
            other => Err(WorkspaceError::invalid_payload(other, "not a ui action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::SetError(message) => Action::new(Self::SET_ERROR).with("message", message),
            Self::ClearError => Action::new(Self::CLEAR_ERROR),
            Self::SetNotice(message) => Action::new(Self::SET_NOTICE).with("message", message),
            Self::ClearNotice => Action::new(Self::CLEAR_NOTICE),
        }
    }

    fn apply(self, state: &mut WorkspaceState) {
        match self {
            Self::SetError(message) => state.ui.error = Some(message),
            Self::ClearError => state.ui.error = None,
            Self::SetNotice(message) => state.ui.notice = Some(message),
            Self::ClearNotice => state.ui.notice = None,
        }
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry) {
    for kind in UiAction::TYPES {
        handlers.register(kind, reduce);
    }
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action) -> Transition {
    match decode(action, UiAction::parse) {
        Some(ui) => Transition::update(state, |s| ui.apply(s)),
        None => Transition::unchanged(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_set_and_clear() {
        let state = Arc::new(WorkspaceState::default());
        let set = reduce(&state, &UiAction::SetError("offline".into()).into_action());
        assert_eq!(set.state.ui.error.as_deref(), Some("offline"));

        let cleared = reduce(&set.state, &UiAction::ClearError.into_action());
        assert!(cleared.state.ui.error.is_none());
        assert_eq!(*cleared.state, *state);
    }

    #[test]
    fn test_repeated_notice_keeps_reference() {
        let state = Arc::new(WorkspaceState::default());
        let once = reduce(&state, &UiAction::SetNotice("saved".into()).into_action());
        let twice = reduce(&once.state, &UiAction::SetNotice("saved".into()).into_action());
        assert!(Arc::ptr_eq(&once.state, &twice.state));
    }
}
