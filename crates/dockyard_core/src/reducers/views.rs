//! View instance lifecycle actions.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::WorkspaceError;
use crate::lifecycle::{create_instance, destroy_instance, update_local_context};
use crate::models::Action;
use crate::registry::ViewRegistry;
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::{decode, required_str};

/// View lifecycle actions.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    /// Allocate an instance without placing it.
    CreateInstance {
        definition_id: String,
        title: Option<String>,
        context: Option<Map<String, Value>>,
    },
    /// Merge keys into an instance's local context.
    UpdateLocalContext { instance_id: String, patch: Map<String, Value> },
    /// Remove an instance and every reference to it.
    DestroyInstance { instance_id: String },
    /// Mark a listed view active.
    SetActiveView { view_id: String },
}

impl ViewAction {
    pub const CREATE_INSTANCE: &'static str = "views/createInstance";
    pub const UPDATE_LOCAL_CONTEXT: &'static str = "views/updateLocalContext";
    pub const DESTROY_INSTANCE: &'static str = "views/destroyInstance";
    pub const SET_ACTIVE_VIEW: &'static str = "views/setActiveView";

    pub const TYPES: [&'static str; 4] = [
        Self::CREATE_INSTANCE,
        Self::UPDATE_LOCAL_CONTEXT,
        Self::DESTROY_INSTANCE,
        Self::SET_ACTIVE_VIEW,
    ];

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        match action.kind() {
            Self::CREATE_INSTANCE => Ok(Self::CreateInstance {
                definition_id: required_str(action, "definitionId")?.to_string(),
                title: action.str_field("title").map(String::from),
                context: action.object_field("context").cloned(),
            }),
            Self::UPDATE_LOCAL_CONTEXT => {
                let instance_id = required_str(action, "instanceId")?.to_string();
                let patch = action.object_field("patch").cloned().ok_or_else(|| {
                    WorkspaceError::invalid_payload(action.kind(), "patch must be an object")
                })?;
                Ok(Self::UpdateLocalContext { instance_id, patch })
            }
            Self::DESTROY_INSTANCE => Ok(Self::DestroyInstance {
                instance_id: required_str(action, "instanceId")?.to_string(),
            }),
            Self::SET_ACTIVE_VIEW => {
                Ok(Self::SetActiveView { view_id: required_str(action, "viewId")?.to_string() })
            }
            other => Err(WorkspaceError::invalid_payload(other, "not a view action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::CreateInstance { definition_id, title, context } => {
                let mut action = Action::new(Self::CREATE_INSTANCE).with("definitionId", definition_id);
                if let Some(title) = title {
                    action = action.with("title", title);
                }
                if let Some(context) = context {
                    action = action.with("context", Value::Object(context));
                }
                action
            }
            Self::UpdateLocalContext { instance_id, patch } => Action::new(Self::UPDATE_LOCAL_CONTEXT)
                .with("instanceId", instance_id)
                .with("patch", Value::Object(patch)),
            Self::DestroyInstance { instance_id } => {
                Action::new(Self::DESTROY_INSTANCE).with("instanceId", instance_id)
            }
            Self::SetActiveView { view_id } => Action::new(Self::SET_ACTIVE_VIEW).with("viewId", view_id),
        }
    }

    fn apply(self, state: &mut WorkspaceState, views: &dyn ViewRegistry) {
        match self {
            Self::CreateInstance { definition_id, title, context } => {
                if create_instance(state, views, &definition_id, title, context).is_none() {
                    tracing::debug!(definition_id = %definition_id, "Unknown definition; nothing created");
                }
            }
            Self::UpdateLocalContext { instance_id, patch } => {
                update_local_context(state, &instance_id, &patch);
            }
            Self::DestroyInstance { instance_id } => {
                destroy_instance(state, &instance_id);
            }
            Self::SetActiveView { view_id } => {
                if state.views.iter().any(|v| v.id == view_id) {
                    state.active_view = Some(view_id);
                }
            }
        }
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry, views: Arc<dyn ViewRegistry>) {
    for kind in ViewAction::TYPES {
        let views = Arc::clone(&views);
        handlers.register(kind, move |state, action| reduce(state, action, views.as_ref()));
    }
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action, views: &dyn ViewRegistry) -> Transition {
    match decode(action, ViewAction::parse) {
        Some(view) => Transition::update(state, |s| view.apply(s, views)),
        None => Transition::unchanged(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewDefinition;
    use crate::registry::{context, StaticViewRegistry};
    use serde_json::json;

    fn views() -> StaticViewRegistry {
        StaticViewRegistry::with_definitions([ViewDefinition::new("notes", "Notes")])
    }

    fn run(state: &Arc<WorkspaceState>, action: ViewAction) -> Arc<WorkspaceState> {
        reduce(state, &action.into_action(), &views()).state
    }

    #[test]
    fn test_counter_is_never_reused() {
        let state = Arc::new(WorkspaceState::default());
        let create = || ViewAction::CreateInstance {
            definition_id: "notes".into(),
            title: None,
            context: Some(context(json!({"text": "a"}))),
        };
        let state = run(&state, create());
        let state = run(&state, ViewAction::DestroyInstance { instance_id: "notes-1".into() });
        let state = run(&state, create());
        assert!(state.instance("notes-1").is_none());
        assert!(state.instance("notes-2").is_some());
        assert_eq!(state.view_instance_counter, 2);
    }

    #[test]
    fn test_unknown_targets_are_no_ops() {
        let state = Arc::new(WorkspaceState::default());
        let next = run(
            &state,
            ViewAction::CreateInstance { definition_id: "ghost".into(), title: None, context: None },
        );
        assert!(Arc::ptr_eq(&state, &next));
        let next = run(
            &state,
            ViewAction::UpdateLocalContext { instance_id: "ghost-1".into(), patch: Map::new() },
        );
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_patch_must_be_object() {
        let state = Arc::new(WorkspaceState::default());
        let action = Action::new(ViewAction::UPDATE_LOCAL_CONTEXT)
            .with("instanceId", "notes-1")
            .with("patch", "nope");
        let next = reduce(&state, &action, &views()).state;
        assert!(Arc::ptr_eq(&state, &next));
    }
}
