//! Built-in reducers.
//!
//! Each module owns a closed action enum decoded from the `{type, payload}`
//! envelope. A payload that fails to decode leaves the state untouched and is
//! logged; it never aborts the dispatch cycle.

pub mod auth;
pub mod layout;
pub mod panels;
pub mod session;
pub mod ui;
pub mod views;

use std::sync::Arc;

use crate::error::WorkspaceError;
use crate::models::Action;
use crate::registry::ViewRegistry;
use crate::store::HandlerRegistry;

pub use auth::AuthAction;
pub use layout::LayoutAction;
pub use panels::PanelAction;
pub use session::SessionAction;
pub use ui::UiAction;
pub use views::ViewAction;

/// A reducer table with every built-in action type registered.
pub fn builtin_handlers(views: Arc<dyn ViewRegistry>) -> HandlerRegistry {
    let mut handlers = HandlerRegistry::new();
    layout::register(&mut handlers, Arc::clone(&views));
    panels::register(&mut handlers, Arc::clone(&views));
    views::register(&mut handlers, views);
    auth::register(&mut handlers);
    ui::register(&mut handlers);
    session::register(&mut handlers);
    tracing::debug!(count = handlers.len(), "Built-in reducers registered");
    handlers
}

/// Decode an action, logging why it was ignored on failure.
pub(crate) fn decode<T>(
    action: &Action,
    parse: impl FnOnce(&Action) -> Result<T, WorkspaceError>,
) -> Option<T> {
    match parse(action) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(action_type = %action, error = %err, "Action ignored");
            None
        }
    }
}

/// Required string field.
pub(crate) fn required_str<'a>(action: &'a Action, key: &str) -> Result<&'a str, WorkspaceError> {
    action
        .str_field(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WorkspaceError::invalid_payload(action.kind(), format!("missing '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewDefinition;
    use crate::registry::StaticViewRegistry;

    #[test]
    fn test_builtin_types_registered() {
        let views = Arc::new(StaticViewRegistry::with_definitions([ViewDefinition::new("a", "A")]));
        let handlers = builtin_handlers(views);
        for kind in [
            LayoutAction::SET_EXPANSION,
            LayoutAction::HYDRATE,
            PanelAction::ASSIGN_VIEW,
            PanelAction::SET_MAIN_AREA_COUNT,
            ViewAction::DESTROY_INSTANCE,
            AuthAction::LOGIN_SUCCEEDED,
            UiAction::SET_ERROR,
            SessionAction::RESET,
        ] {
            assert!(handlers.contains(kind), "{kind} not registered");
        }
    }

    #[test]
    fn test_required_str_rejects_empty() {
        let action = Action::new("x").with("name", "");
        assert!(required_str(&action, "name").is_err());
        assert!(required_str(&action, "missing").is_err());
        let action = Action::new("x").with("name", "ok");
        assert_eq!(required_str(&action, "name").unwrap(), "ok");
    }
}
