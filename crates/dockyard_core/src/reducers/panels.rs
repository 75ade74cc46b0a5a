//! Panel reducer: routes panel actions into the allocator.

use std::sync::Arc;

use serde_json::Value;

use crate::allocator::{
    add_side_panel, apply_main_view_order, assign_view_to_panel, clear_panel, remove_side_panel,
    AssignOptions,
};
use crate::error::WorkspaceError;
use crate::models::{Action, Placement, Region};
use crate::registry::ViewRegistry;
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::{decode, required_str};

/// Panel actions.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// Make the main area show these ids in order.
    SetMainViewOrder(Vec<String>),
    /// Show a view in a panel.
    AssignView { panel_id: String, view_id: String, options: AssignOptions },
    /// Empty a panel.
    ClearPanel { panel_id: String },
    /// Add a side panel, optionally showing a view right away. Without a
    /// region the panel goes to the view's preferred region.
    AddPanel { region: Option<Region>, view_id: Option<String>, placement: Placement },
    /// Remove a side panel.
    RemovePanel { panel_id: String },
}

impl PanelAction {
    pub const SET_MAIN_VIEW_ORDER: &'static str = "panels/setMainViewOrder";
    pub const ASSIGN_VIEW: &'static str = "panels/assignView";
    pub const CLEAR_PANEL: &'static str = "panels/clearPanel";
    pub const ADD_PANEL: &'static str = "panels/addPanel";
    pub const REMOVE_PANEL: &'static str = "panels/removePanel";
    /// Alias of `layout/setMainAreaCount`, handled by the layout reducer.
    pub const SET_MAIN_AREA_COUNT: &'static str = "panels/setMainAreaCount";

    pub const TYPES: [&'static str; 5] = [
        Self::SET_MAIN_VIEW_ORDER,
        Self::ASSIGN_VIEW,
        Self::CLEAR_PANEL,
        Self::ADD_PANEL,
        Self::REMOVE_PANEL,
    ];

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        match action.kind() {
            Self::SET_MAIN_VIEW_ORDER => action
                .string_list("viewOrder")
                .map(Self::SetMainViewOrder)
                .ok_or_else(|| WorkspaceError::invalid_payload(action.kind(), "viewOrder must be a list")),
            Self::ASSIGN_VIEW => Ok(Self::AssignView {
                panel_id: required_str(action, "panelId")?.to_string(),
                view_id: required_str(action, "viewId")?.to_string(),
                options: AssignOptions {
                    data: action.object_field("data").cloned(),
                    placement: placement(action),
                    swap: action.bool_field("swap").unwrap_or(false),
                },
            }),
            Self::CLEAR_PANEL => {
                Ok(Self::ClearPanel { panel_id: required_str(action, "panelId")?.to_string() })
            }
            Self::ADD_PANEL => {
                let region = match action.str_field("region") {
                    Some(raw) => Some(Region::parse(raw).ok_or_else(|| {
                        WorkspaceError::invalid_payload(action.kind(), format!("unknown region '{raw}'"))
                    })?),
                    None => None,
                };
                let view_id = action.str_field("viewId").filter(|s| !s.is_empty()).map(String::from);
                if region.is_none() && view_id.is_none() {
                    return Err(WorkspaceError::invalid_payload(action.kind(), "needs a region or a viewId"));
                }
                Ok(Self::AddPanel { region, view_id, placement: placement(action) })
            }
            Self::REMOVE_PANEL => {
                Ok(Self::RemovePanel { panel_id: required_str(action, "panelId")?.to_string() })
            }
            other => Err(WorkspaceError::invalid_payload(other, "not a panel action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::SetMainViewOrder(order) => {
                Action::new(Self::SET_MAIN_VIEW_ORDER).with("viewOrder", order)
            }
            Self::AssignView { panel_id, view_id, options } => {
                let mut action = Action::new(Self::ASSIGN_VIEW)
                    .with("panelId", panel_id)
                    .with("viewId", view_id)
                    .with("placement", placement_name(options.placement))
                    .with("swap", options.swap);
                if let Some(data) = options.data {
                    action = action.with("data", Value::Object(data));
                }
                action
            }
            Self::ClearPanel { panel_id } => Action::new(Self::CLEAR_PANEL).with("panelId", panel_id),
            Self::AddPanel { region, view_id, placement } => {
                let mut action = Action::new(Self::ADD_PANEL).with("placement", placement_name(placement));
                if let Some(region) = region {
                    action = action.with("region", region.as_str());
                }
                match view_id {
                    Some(view_id) => action.with("viewId", view_id),
                    None => action,
                }
            }
            Self::RemovePanel { panel_id } => {
                Action::new(Self::REMOVE_PANEL).with("panelId", panel_id)
            }
        }
    }

    fn apply(self, state: &mut WorkspaceState, views: &dyn ViewRegistry) {
        match self {
            Self::SetMainViewOrder(order) => apply_main_view_order(state, views, &order),
            Self::AssignView { panel_id, view_id, options } => {
                assign_view_to_panel(state, views, &panel_id, &view_id, options)
            }
            Self::ClearPanel { panel_id } => clear_panel(state, &panel_id),
            Self::AddPanel { region, view_id, placement } => {
                let target = region.or_else(|| {
                    view_id.as_deref().and_then(|id| preferred_region(state, views, id))
                });
                let Some(region) = target else {
                    tracing::warn!(view_id = ?view_id, "View has no preferred region; add refused");
                    return;
                };
                let Some(panel_id) = add_side_panel(state, region) else {
                    tracing::warn!(%region, "Main panels follow the main area count; add refused");
                    return;
                };
                if let Some(view_id) = view_id {
                    let options = AssignOptions { placement, ..Default::default() };
                    assign_view_to_panel(state, views, &panel_id, &view_id, options);
                }
            }
            Self::RemovePanel { panel_id } => {
                if !remove_side_panel(state, &panel_id) {
                    tracing::warn!(panel_id = %panel_id, "Only existing side panels can be removed");
                }
            }
        }
    }
}

/// Preferred region of the definition behind `view_id` (an instance or a
/// definition id).
fn preferred_region(state: &WorkspaceState, views: &dyn ViewRegistry, view_id: &str) -> Option<Region> {
    let definition_id = state.instance(view_id).map_or(view_id, |i| i.definition_id.as_str());
    views.get(definition_id)?.preferred_region
}

fn placement(action: &Action) -> Placement {
    action.str_field("placement").map(Placement::parse).unwrap_or_default()
}

fn placement_name(placement: Placement) -> &'static str {
    match placement {
        Placement::Top => "top",
        Placement::Bottom => "bottom",
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry, views: Arc<dyn ViewRegistry>) {
    for kind in PanelAction::TYPES {
        let views = Arc::clone(&views);
        handlers.register(kind, move |state, action| reduce(state, action, views.as_ref()));
    }
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action, views: &dyn ViewRegistry) -> Transition {
    match decode(action, PanelAction::parse) {
        Some(panel) => Transition::update(state, |s| panel.apply(s, views)),
        None => Transition::unchanged(state),
    }
}
