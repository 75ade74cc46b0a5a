//! Layout reducer: expansion state machine, viewport/capacity coupling,
//! overlay, presets and snapshot hydration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::allocator::{reconcile, set_main_area_count};
use crate::error::WorkspaceError;
use crate::models::{
    Action, ExpansionState, LayoutState, Panel, Side, View, ViewInstance, ViewportWidthMode,
};
use crate::normalize::normalize_in_place;
use crate::registry::ViewRegistry;
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::panels::PanelAction;
use super::{decode, required_str};

/// Layout actions.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutAction {
    /// Put one side into a given expansion state.
    SetExpansion { side: Side, state: ExpansionState },
    /// Advance one side to its next expansion state.
    ToggleExpansion { side: Side },
    /// Show a view in the overlay, or close it.
    SetOverlayView(Option<String>),
    /// Request a viewport mode; a numeric mode also sets the capacity.
    SetViewportWidthMode(ViewportWidthMode),
    /// Resize the main area.
    SetMainAreaCount(i64),
    /// Save the current layout under a name.
    SavePreset { name: String, saved_at: Option<DateTime<Utc>> },
    /// Restore a saved preset.
    ApplyPreset { name: String },
    /// Forget a saved preset.
    DeletePreset { name: String },
    /// Merge a persisted snapshot into the state.
    Hydrate(Map<String, Value>),
}

impl LayoutAction {
    pub const SET_EXPANSION: &'static str = "layout/setExpansion";
    pub const TOGGLE_EXPANSION: &'static str = "layout/toggleExpansion";
    pub const SET_OVERLAY_VIEW: &'static str = "layout/setOverlayView";
    pub const SET_VIEWPORT_WIDTH_MODE: &'static str = "layout/setViewportWidthMode";
    pub const SET_MAIN_AREA_COUNT: &'static str = "layout/setMainAreaCount";
    pub const SAVE_PRESET: &'static str = "layout/savePreset";
    pub const APPLY_PRESET: &'static str = "layout/applyPreset";
    pub const DELETE_PRESET: &'static str = "layout/deletePreset";
    pub const HYDRATE: &'static str = "layout/hydrate";

    pub const TYPES: [&'static str; 10] = [
        Self::SET_EXPANSION,
        Self::TOGGLE_EXPANSION,
        Self::SET_OVERLAY_VIEW,
        Self::SET_VIEWPORT_WIDTH_MODE,
        Self::SET_MAIN_AREA_COUNT,
        PanelAction::SET_MAIN_AREA_COUNT,
        Self::SAVE_PRESET,
        Self::APPLY_PRESET,
        Self::DELETE_PRESET,
        Self::HYDRATE,
    ];

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        let kind = action.kind();
        let invalid = |message: String| WorkspaceError::invalid_payload(kind, message);

        match kind {
            Self::SET_EXPANSION => {
                let side = parse_side(action)?;
                let raw = required_str(action, "state")?;
                let state = ExpansionState::parse(raw)
                    .ok_or_else(|| invalid(format!("unknown expansion state '{raw}'")))?;
                Ok(Self::SetExpansion { side, state })
            }
            Self::TOGGLE_EXPANSION => Ok(Self::ToggleExpansion { side: parse_side(action)? }),
            Self::SET_OVERLAY_VIEW => match action.field("viewId") {
                None | Some(Value::Null) => Ok(Self::SetOverlayView(None)),
                Some(Value::String(id)) if id.is_empty() => Ok(Self::SetOverlayView(None)),
                Some(Value::String(id)) => Ok(Self::SetOverlayView(Some(id.clone()))),
                Some(other) => Err(invalid(format!("viewId must be a string, got {other}"))),
            },
            Self::SET_VIEWPORT_WIDTH_MODE => {
                let mode = match action.field("mode") {
                    Some(Value::String(s)) => ViewportWidthMode::parse(s),
                    Some(Value::Number(n)) => n.as_u64().and_then(ViewportWidthMode::from_columns),
                    _ => None,
                };
                mode.map(Self::SetViewportWidthMode)
                    .ok_or_else(|| invalid("mode must be 'auto' or 'Nx'".to_string()))
            }
            Self::SET_MAIN_AREA_COUNT | PanelAction::SET_MAIN_AREA_COUNT => action
                .i64_field("count")
                .map(Self::SetMainAreaCount)
                .ok_or_else(|| invalid("count must be a number".to_string())),
            Self::SAVE_PRESET => {
                let name = required_str(action, "name")?.to_string();
                let saved_at = action
                    .str_field("savedAt")
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                Ok(Self::SavePreset { name, saved_at })
            }
            Self::APPLY_PRESET => Ok(Self::ApplyPreset { name: required_str(action, "name")?.into() }),
            Self::DELETE_PRESET => {
                Ok(Self::DeletePreset { name: required_str(action, "name")?.into() })
            }
            Self::HYDRATE => action
                .object_field("patch")
                .cloned()
                .map(Self::Hydrate)
                .ok_or_else(|| invalid("missing 'patch' object".to_string())),
            other => Err(WorkspaceError::invalid_payload(other, "not a layout action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::SetExpansion { side, state } => Action::new(Self::SET_EXPANSION)
                .with("side", side_name(side))
                .with("state", state.as_str()),
            Self::ToggleExpansion { side } => {
                Action::new(Self::TOGGLE_EXPANSION).with("side", side_name(side))
            }
            Self::SetOverlayView(view_id) => Action::new(Self::SET_OVERLAY_VIEW)
                .with("viewId", view_id.map(Value::String).unwrap_or(Value::Null)),
            Self::SetViewportWidthMode(mode) => {
                Action::new(Self::SET_VIEWPORT_WIDTH_MODE).with("mode", mode.to_string())
            }
            Self::SetMainAreaCount(count) => Action::new(Self::SET_MAIN_AREA_COUNT).with("count", count),
            Self::SavePreset { name, saved_at } => {
                let action = Action::new(Self::SAVE_PRESET).with("name", name);
                match saved_at {
                    Some(at) => action.with("savedAt", at.to_rfc3339()),
                    None => action,
                }
            }
            Self::ApplyPreset { name } => Action::new(Self::APPLY_PRESET).with("name", name),
            Self::DeletePreset { name } => Action::new(Self::DELETE_PRESET).with("name", name),
            Self::Hydrate(patch) => Action::new(Self::HYDRATE).with("patch", Value::Object(patch)),
        }
    }

    /// Run against `state`, returning follow-up actions.
    fn apply(self, state: &mut WorkspaceState, views: &dyn ViewRegistry) -> Vec<Action> {
        match self {
            Self::SetExpansion { side, state: next } => {
                state.layout.expansion.set(side, next);
            }
            Self::ToggleExpansion { side } => {
                let next = state.layout.expansion.get(side).next();
                state.layout.expansion.set(side, next);
            }
            Self::SetOverlayView(view_id) => {
                state.layout.overlay_view = view_id;
            }
            Self::SetViewportWidthMode(mode) => {
                // An explicit column count sizes the main area to match.
                if let Some(columns) = mode.columns() {
                    if columns != state.layout.main_area_count {
                        set_main_area_count(state, views, columns as i64);
                    }
                }
                state.layout.viewport_width_mode = mode.clamped_to(state.layout.main_area_count);
            }
            Self::SetMainAreaCount(count) => {
                set_main_area_count(state, views, count);
            }
            Self::SavePreset { name, saved_at } => {
                let preset = state.layout.to_preset(name.clone(), saved_at);
                state.layout.presets.insert(name.clone(), preset);
                state.layout.active_preset = Some(name);
            }
            Self::ApplyPreset { name } => return apply_preset(state, &name),
            Self::DeletePreset { name } => {
                if state.layout.presets.remove(&name).is_some()
                    && state.layout.active_preset.as_deref() == Some(name.as_str())
                {
                    state.layout.active_preset = None;
                }
            }
            Self::Hydrate(patch) => return hydrate(state, &patch),
        }
        Vec::new()
    }
}

fn parse_side(action: &Action) -> Result<Side, WorkspaceError> {
    let raw = required_str(action, "side")?;
    Side::parse(raw)
        .ok_or_else(|| WorkspaceError::invalid_payload(action.kind(), format!("unknown side '{raw}'")))
}

fn side_name(side: Side) -> &'static str {
    side.region().as_str()
}

/// Restore expansion and side orders now; viewport mode, capacity and main
/// order go through their own actions so the allocator sees them in order.
///
/// The mode goes first: it sizes the main area to its column count, and the
/// saved capacity (never below the mode) then widens it again.
fn apply_preset(state: &mut WorkspaceState, name: &str) -> Vec<Action> {
    let Some(preset) = state.layout.presets.get(name).cloned() else {
        tracing::debug!(preset = name, "Unknown preset; nothing applied");
        return Vec::new();
    };

    let layout = &mut state.layout;
    layout.expansion = preset.expansion;
    layout.left_view_order = preset.left_view_order;
    layout.right_view_order = preset.right_view_order;
    layout.bottom_view_order = preset.bottom_view_order;
    layout.active_preset = Some(preset.name);
    reconcile(state);

    vec![
        LayoutAction::SetViewportWidthMode(preset.viewport_width_mode).into_action(),
        LayoutAction::SetMainAreaCount(preset.main_area_count as i64).into_action(),
        PanelAction::SetMainViewOrder(preset.main_view_order).into_action(),
    ]
}

/// Merge a persisted snapshot.
///
/// Each recognized key is decoded on its own; a key that fails to decode is
/// skipped. A patch without a `layout` key but with layout fields at the top
/// level is read as a bare layout. The hydrated main order is re-applied by a
/// follow-up so definitions and legacy ids resolve through the allocator.
fn hydrate(state: &mut WorkspaceState, patch: &Map<String, Value>) -> Vec<Action> {
    let layout: Option<LayoutState> = match patch.get("layout") {
        Some(value) => field(patch, "layout", value),
        None if looks_like_layout(patch) => {
            field(patch, "layout", &Value::Object(patch.clone()))
        }
        None => None,
    };
    let requested_order = layout.as_ref().map(|l| l.main_view_order.clone());

    if let Some(layout) = layout {
        state.layout = layout;
    }
    if let Some(panels) = patch.get("panels").and_then(|v| field::<Vec<Panel>>(patch, "panels", v)) {
        state.panels = panels;
    }
    if let Some(instances) = patch
        .get("viewInstances")
        .and_then(|v| field::<std::collections::BTreeMap<String, ViewInstance>>(patch, "viewInstances", v))
    {
        state.view_instances.extend(instances);
    }
    if let Some(counter) = patch.get("viewInstanceCounter").and_then(Value::as_u64) {
        state.view_instance_counter = state.view_instance_counter.max(counter);
    }
    if let Some(views) = patch.get("views").and_then(|v| field::<Vec<View>>(patch, "views", v)) {
        for view in views {
            if !state.views.iter().any(|existing| existing.id == view.id) {
                state.views.push(view);
            }
        }
    }

    // Panels without a snapshot take it from a legacy view of the same id;
    // panels pointing at nothing we know about are emptied.
    let instances = &state.view_instances;
    let legacy = &state.views;
    for panel in &mut state.panels {
        if panel.view.is_some() {
            continue;
        }
        let Some(id) = panel.active_id().map(String::from) else {
            continue;
        };
        if instances.contains_key(&id) {
            continue;
        }
        match legacy.iter().find(|view| view.id == id) {
            Some(view) => panel.show(view.clone()),
            None => panel.clear(),
        }
    }

    normalize_in_place(state);
    reconcile(state);

    match requested_order {
        Some(order) if !order.is_empty() => vec![PanelAction::SetMainViewOrder(order).into_action()],
        _ => Vec::new(),
    }
}

fn looks_like_layout(patch: &Map<String, Value>) -> bool {
    ["expansion", "mainAreaCount", "mainViewOrder", "viewportWidthMode", "presets"]
        .iter()
        .any(|key| patch.contains_key(*key))
}

fn field<T: DeserializeOwned>(patch: &Map<String, Value>, key: &str, value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(key, error = %err, keys = patch.len(), "Snapshot field skipped");
            None
        }
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry, views: Arc<dyn ViewRegistry>) {
    for kind in LayoutAction::TYPES {
        let views = Arc::clone(&views);
        handlers.register(kind, move |state, action| reduce(state, action, views.as_ref()));
    }
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action, views: &dyn ViewRegistry) -> Transition {
    let Some(layout) = decode(action, LayoutAction::parse) else {
        return Transition::unchanged(state);
    };
    let mut follow_ups = Vec::new();
    let transition = Transition::update(state, |s| follow_ups = layout.apply(s, views));
    transition.with_follow_ups(follow_ups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Region, ViewDefinition};
    use crate::registry::StaticViewRegistry;
    use serde_json::json;

    fn views() -> StaticViewRegistry {
        StaticViewRegistry::with_definitions([
            ViewDefinition::new("counter", "Counter"),
            ViewDefinition::new("clock", "Clock"),
        ])
    }

    fn run(state: &Arc<WorkspaceState>, action: Action) -> Transition {
        reduce(state, &action, &views())
    }

    #[test]
    fn test_toggle_cycles_through_all_states() {
        let mut state = Arc::new(WorkspaceState::default());
        state = run(&state, Action::new(LayoutAction::SET_EXPANSION)
            .with("side", "left")
            .with("state", "Closed"))
        .state;

        let mut seen = Vec::new();
        for _ in 0..3 {
            state = run(&state, LayoutAction::ToggleExpansion { side: Side::Left }.into_action()).state;
            seen.push(state.layout.expansion.left);
        }
        assert_eq!(
            seen,
            vec![ExpansionState::Opened, ExpansionState::Expanded, ExpansionState::Collapsed]
        );
    }

    #[test]
    fn test_bad_side_is_ignored() {
        let state = Arc::new(WorkspaceState::default());
        let transition = run(&state, Action::new(LayoutAction::TOGGLE_EXPANSION).with("side", "top"));
        assert!(!transition.changed_from(&state));
    }

    fn set_mode(mode: &str) -> Action {
        Action::new(LayoutAction::SET_VIEWPORT_WIDTH_MODE).with("mode", mode)
    }

    #[test]
    fn test_numeric_mode_sizes_main_area() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, set_mode("5x")).state;
        assert_eq!(state.layout.viewport_width_mode, ViewportWidthMode::Columns(5));
        assert_eq!(state.layout.main_area_count, 5);
        assert_eq!(state.region_len(Region::Main), 5);

        let state = run(&state, LayoutAction::SetMainAreaCount(4).into_action()).state;
        assert_eq!(state.layout.viewport_width_mode, ViewportWidthMode::Columns(4));
        let state = run(&state, set_mode("2x")).state;
        assert_eq!(state.layout.main_area_count, 2);
        assert_eq!(state.region_len(Region::Main), 2);
    }

    #[test]
    fn test_auto_mode_leaves_capacity_alone() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, LayoutAction::SetMainAreaCount(3).into_action()).state;
        let state = run(&state, set_mode("auto")).state;
        assert_eq!(state.layout.viewport_width_mode, ViewportWidthMode::Auto);
        assert_eq!(state.layout.main_area_count, 3);
    }

    #[test]
    fn test_raising_capacity_keeps_numeric_mode() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, set_mode("2x")).state;
        let state = run(&state, LayoutAction::SetMainAreaCount(4).into_action()).state;
        assert_eq!(state.layout.viewport_width_mode, ViewportWidthMode::Columns(2));
        assert_eq!(state.layout.main_area_count, 4);
    }

    #[test]
    fn test_invalid_mode_is_ignored() {
        let state = Arc::new(WorkspaceState::default());
        let transition =
            run(&state, Action::new(LayoutAction::SET_VIEWPORT_WIDTH_MODE).with("mode", "wide"));
        assert!(Arc::ptr_eq(&transition.state, &state));
    }

    #[test]
    fn test_main_area_count_alias() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, Action::new(PanelAction::SET_MAIN_AREA_COUNT).with("count", 42)).state;
        assert_eq!(state.layout.main_area_count, 5);
        assert_eq!(state.region_len(Region::Main), 5);
    }

    #[test]
    fn test_overlay_set_and_clear() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, LayoutAction::SetOverlayView(Some("clock-1".into())).into_action()).state;
        assert_eq!(state.layout.overlay_view.as_deref(), Some("clock-1"));
        let state = run(&state, Action::new(LayoutAction::SET_OVERLAY_VIEW).with("viewId", Value::Null)).state;
        assert!(state.layout.overlay_view.is_none());
    }

    #[test]
    fn test_preset_round_trip_emits_follow_ups_in_order() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(&state, LayoutAction::SetMainAreaCount(2).into_action()).state;
        let state = run(
            &state,
            LayoutAction::SavePreset { name: "wide".into(), saved_at: None }.into_action(),
        )
        .state;
        assert_eq!(state.layout.active_preset.as_deref(), Some("wide"));
        assert_eq!(state.layout.presets["wide"].main_area_count, 2);

        let state = run(&state, LayoutAction::SetMainAreaCount(1).into_action()).state;
        let transition = run(&state, LayoutAction::ApplyPreset { name: "wide".into() }.into_action());
        let kinds: Vec<&str> = transition.follow_ups.iter().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec![
                LayoutAction::SET_VIEWPORT_WIDTH_MODE,
                LayoutAction::SET_MAIN_AREA_COUNT,
                PanelAction::SET_MAIN_VIEW_ORDER
            ]
        );
        assert_eq!(transition.follow_ups[1].i64_field("count"), Some(2));
    }

    #[test]
    fn test_delete_active_preset_clears_marker() {
        let state = Arc::new(WorkspaceState::default());
        let state = run(
            &state,
            LayoutAction::SavePreset { name: "a".into(), saved_at: None }.into_action(),
        )
        .state;
        let state = run(&state, LayoutAction::DeletePreset { name: "a".into() }.into_action()).state;
        assert!(state.layout.presets.is_empty());
        assert!(state.layout.active_preset.is_none());
    }

    #[test]
    fn test_save_preset_reads_timestamp() {
        let state = Arc::new(WorkspaceState::default());
        let action = Action::new(LayoutAction::SAVE_PRESET)
            .with("name", "stamped")
            .with("savedAt", "2024-05-01T12:00:00Z");
        let state = run(&state, action).state;
        let saved_at = state.layout.presets["stamped"].saved_at.unwrap();
        assert_eq!(saved_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_hydrate_without_patch_is_a_no_op() {
        let state = Arc::new(WorkspaceState::default());
        let transition = run(&state, Action::new(LayoutAction::HYDRATE));
        assert!(Arc::ptr_eq(&transition.state, &state));
        assert!(transition.follow_ups.is_empty());
    }

    #[test]
    fn test_hydrate_snapshot_restores_panels_and_requests_order() {
        let state = Arc::new(WorkspaceState::default());
        let patch = json!({
            "layout": {
                "mainAreaCount": 2,
                "mainViewOrder": ["clock-4", "counter"],
                "expansion": {"left": "Collapsed"}
            },
            "panels": [
                {"id": "main-1", "region": "main", "viewId": "clock-4"},
                {"id": "main-2", "region": "main"},
                {"id": "left-1", "region": "left", "viewId": "ghost-1"}
            ],
            "viewInstances": {
                "clock-4": {"instanceId": "clock-4", "definitionId": "clock", "title": "Clock"}
            },
            "viewInstanceCounter": 4
        });
        let transition = run(&state, LayoutAction::Hydrate(crate::registry::context(patch)).into_action());
        let next = &transition.state;

        assert_eq!(next.layout.expansion.left, ExpansionState::Collapsed);
        assert_eq!(next.view_instance_counter, 4);
        assert_eq!(next.layout.main_view_order, vec!["clock-4".to_string()]);
        assert!(next.panel("left-1").unwrap().is_empty());
        assert_eq!(next.region_len(Region::Right), 1);
        assert_eq!(
            transition.follow_ups,
            vec![PanelAction::SetMainViewOrder(vec!["clock-4".into(), "counter".into()]).into_action()]
        );
    }

    #[test]
    fn test_hydrate_keeps_side_panel_on_legacy_view() {
        let state = Arc::new(WorkspaceState::default());
        let patch = json!({
            "views": [{"id": "legacy-w", "component": "widget"}],
            "panels": [
                {"id": "main-1", "region": "main"},
                {"id": "left-1", "region": "left", "viewId": "legacy-w"}
            ]
        });
        let next = run(&state, LayoutAction::Hydrate(crate::registry::context(patch)).into_action()).state;

        let panel = next.panel("left-1").unwrap();
        assert_eq!(panel.active_id(), Some("legacy-w"));
        assert_eq!(panel.view.as_ref().map(|v| v.component.as_str()), Some("widget"));
        assert_eq!(next.layout.left_view_order, vec!["legacy-w".to_string()]);
        assert!(next.views.iter().any(|v| v.id == "legacy-w"));
    }

    #[test]
    fn test_hydrate_accepts_bare_legacy_layout() {
        let state = Arc::new(WorkspaceState::default());
        let patch = json!({"expansion": {"right": true}, "viewportWidthMode": 1});
        let next = run(&state, LayoutAction::Hydrate(crate::registry::context(patch)).into_action()).state;
        assert_eq!(next.layout.expansion.right, ExpansionState::Opened);
        assert_eq!(next.layout.viewport_width_mode, ViewportWidthMode::Columns(1));
    }
}
