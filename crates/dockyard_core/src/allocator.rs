//! Panel/view allocation.
//!
//! Everything here mutates a private working copy of the state handed in by a
//! reducer; the reducer decides whether the result is a new state. The
//! functions never fail: ids that resolve to nothing clear the panel they were
//! aimed at.
//!
//! Invariants maintained on exit:
//! - a view id is active in at most one panel,
//! - `layout.main_view_order` equals the non-empty main panel ids in panel order,
//! - side-region order arrays list exactly the ids shown in that region,
//! - the legacy `views` list starts with the shown views, followed by views
//!   that were shown before and still exist.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::models::{
    clamp_main_area_count, InstanceOverrides, Panel, Placement, Region, View,
};
use crate::registry::ViewRegistry;
use crate::state::WorkspaceState;

// ============================================================================
// Instance allocation
// ============================================================================

/// Allocate a new instance of `definition_id`, returning its id.
///
/// Bumps the state-wide counter and synthesizes `"<definition>-<counter>"`.
/// Returns `None` (and leaves the counter alone) for unknown definitions.
pub fn allocate_instance(
    state: &mut WorkspaceState,
    registry: &dyn ViewRegistry,
    definition_id: &str,
    title: Option<String>,
    context: Option<Map<String, Value>>,
) -> Option<String> {
    registry.get(definition_id)?;

    let mut counter = state.view_instance_counter;
    let instance_id = loop {
        counter += 1;
        let candidate = format!("{definition_id}-{counter}");
        if !state.view_instances.contains_key(&candidate) {
            break candidate;
        }
    };

    let instance = registry.create_instance(
        definition_id,
        InstanceOverrides { instance_id: Some(instance_id.clone()), title, context },
    )?;

    state.view_instance_counter = counter;
    tracing::debug!(instance_id = %instance_id, definition_id, "View instance allocated");
    state.view_instances.insert(instance_id.clone(), instance);
    Some(instance_id)
}

/// What a requested id resolved to.
fn resolved_view(state: &WorkspaceState, id: &str) -> Option<View> {
    state.instance(id).map(View::from).or_else(|| state.legacy_view(id).cloned())
}

// ============================================================================
// Main area ordering
// ============================================================================

/// Make the main area show `requested`, in order.
///
/// Requested ids may name instances, definitions (a main panel already showing
/// an instance of that definition is reused, otherwise a new instance is
/// allocated) or legacy views. Duplicates are dropped and the list is cut to
/// the main-area capacity.
pub fn apply_main_view_order(
    state: &mut WorkspaceState,
    registry: &dyn ViewRegistry,
    requested: &[String],
) {
    let capacity = clamp_main_area_count(state.layout.main_area_count as i64) as usize;

    let mut seen = HashSet::new();
    let effective: Vec<&String> =
        requested.iter().filter(|id| seen.insert(id.as_str())).take(capacity).collect();

    // Definitions resolve to an instance already in the main area when possible.
    let shown_in_main = state.main_active_ids();
    let explicitly_requested: HashSet<&str> = effective.iter().map(|id| id.as_str()).collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut resolved: Vec<Option<View>> = Vec::with_capacity(effective.len());

    for id in &effective {
        let view = if let Some(instance) = state.instance(id) {
            Some(View::from(instance))
        } else if registry.get(id).is_some() {
            let reuse = shown_in_main.iter().find(|candidate| {
                !claimed.contains(*candidate)
                    && !explicitly_requested.contains(candidate.as_str())
                    && state.instance(candidate).is_some_and(|inst| inst.definition_id == **id)
            });
            match reuse.cloned() {
                Some(existing) => resolved_view(state, &existing),
                None => allocate_instance(state, registry, id, None, None)
                    .and_then(|new_id| resolved_view(state, &new_id)),
            }
        } else {
            state.legacy_view(id).cloned()
        };

        // Two requests resolving to the same view keep only the first.
        let view = view.filter(|v| claimed.insert(v.id.clone()));
        if view.is_none() {
            tracing::debug!(requested_id = %id, "Main order entry did not resolve; slot left empty");
        }
        resolved.push(view);
    }

    // A view moving into the main area leaves its side dock.
    for panel in state.panels.iter_mut().filter(|p| p.region.is_side()) {
        if panel.active_id().is_some_and(|id| claimed.contains(id)) {
            panel.clear();
        }
    }

    let mut slots = resolved.into_iter();
    for panel in state.panels.iter_mut().filter(|p| p.region == Region::Main) {
        match slots.next().flatten() {
            Some(view) => panel.show(view),
            None => panel.clear(),
        }
    }

    reconcile(state);
}

// ============================================================================
// Panel assignment
// ============================================================================

/// Options for [`assign_view_to_panel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignOptions {
    /// Context patch for an existing instance, or initial context for a new one.
    pub data: Option<Map<String, Value>>,
    /// Where the view lands in the target region's order.
    pub placement: Placement,
    /// Exchange views with the panel the view came from.
    pub swap: bool,
}

/// Show `input_id` in `panel_id`.
///
/// The view leaves whichever panel showed it before. With `swap`, that panel
/// receives the view the target displaced; otherwise it is cleared, and a
/// cleared side panel is removed when its region has other panels.
pub fn assign_view_to_panel(
    state: &mut WorkspaceState,
    registry: &dyn ViewRegistry,
    panel_id: &str,
    input_id: &str,
    options: AssignOptions,
) {
    let Some(target_idx) = state.panel_index(panel_id) else {
        tracing::debug!(panel_id, "Assign to unknown panel ignored");
        return;
    };

    let view = if let Some(instance) = state.view_instances.get_mut(input_id) {
        if let Some(patch) = &options.data {
            instance.patch_context(patch);
        }
        Some(View::from(&*instance))
    } else if registry.get(input_id).is_some() {
        allocate_instance(state, registry, input_id, None, options.data.clone())
            .and_then(|id| resolved_view(state, &id))
    } else {
        state.legacy_view(input_id).cloned()
    };

    let Some(view) = view else {
        tracing::debug!(panel_id, input_id, "View did not resolve; clearing panel");
        state.panels[target_idx].clear();
        reconcile(state);
        return;
    };

    let view_id = view.id.clone();
    let target_region = state.panels[target_idx].region;
    let displaced = displaced_view(state, &state.panels[target_idx], &view_id);

    state.panels[target_idx].show(view);

    let source_idx = state
        .panels
        .iter()
        .enumerate()
        .position(|(idx, p)| idx != target_idx && p.active_id() == Some(view_id.as_str()));

    if let Some(source_idx) = source_idx {
        match displaced.filter(|_| options.swap) {
            Some(previous) => state.panels[source_idx].show(previous),
            None => {
                state.panels[source_idx].clear();
                let source_region = state.panels[source_idx].region;
                if source_region.is_side() && state.region_len(source_region) > 1 {
                    let removed = state.panels.remove(source_idx);
                    tracing::debug!(panel_id = %removed.id, "Empty side panel collapsed");
                }
            }
        }
    }

    if target_region.is_side() {
        let order = state.layout.region_order_mut(target_region);
        order.retain(|id| *id != view_id);
        match options.placement {
            Placement::Top => order.insert(0, view_id),
            Placement::Bottom => order.push(view_id),
        }
    }

    reconcile(state);
}

/// The view a panel shows before being given `incoming`, if different.
fn displaced_view(state: &WorkspaceState, panel: &Panel, incoming: &str) -> Option<View> {
    let previous = panel.active_id().filter(|id| *id != incoming)?;
    resolved_view(state, previous).or_else(|| panel.view.clone())
}

/// Empty one panel.
pub fn clear_panel(state: &mut WorkspaceState, panel_id: &str) {
    if let Some(idx) = state.panel_index(panel_id) {
        state.panels[idx].clear();
        reconcile(state);
    }
}

// ============================================================================
// Main-area capacity and side panels
// ============================================================================

/// Resize the main area to `requested` panels (clamped to 1..=5).
///
/// Panels are added after the last main panel or dropped from the end. The
/// numeric viewport mode is clamped down to the new capacity and the current
/// main order is re-applied.
pub fn set_main_area_count(state: &mut WorkspaceState, registry: &dyn ViewRegistry, requested: i64) {
    let capacity = clamp_main_area_count(requested);
    state.layout.main_area_count = capacity;
    resize_main_panels(state, capacity as usize);
    state.layout.viewport_width_mode = state.layout.viewport_width_mode.clamped_to(capacity);

    let order = state.layout.main_view_order.clone();
    apply_main_view_order(state, registry, &order);
}

/// Make the number of main panels equal `capacity`.
pub(crate) fn resize_main_panels(state: &mut WorkspaceState, capacity: usize) {
    let mut current = state.region_len(Region::Main);

    while current < capacity {
        let id = state.next_panel_id(Region::Main);
        let at = state
            .panels
            .iter()
            .rposition(|p| p.region == Region::Main)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        state.panels.insert(at, Panel::new(id, Region::Main));
        current += 1;
    }

    while current > capacity {
        if let Some(idx) = state.panels.iter().rposition(|p| p.region == Region::Main) {
            let removed = state.panels.remove(idx);
            tracing::debug!(panel_id = %removed.id, "Main panel removed");
        }
        current -= 1;
    }
}

/// Add an empty panel to a side region and return its id.
///
/// Main panels are only created through the main-area capacity.
pub fn add_side_panel(state: &mut WorkspaceState, region: Region) -> Option<String> {
    if !region.is_side() {
        return None;
    }
    let id = state.next_panel_id(region);
    let at = state
        .panels
        .iter()
        .rposition(|p| p.region == region)
        .map(|idx| idx + 1)
        .unwrap_or(state.panels.len());
    state.panels.insert(at, Panel::new(id.clone(), region));
    Some(id)
}

/// Remove a side panel. The last panel of a region is cleared instead.
///
/// Returns false for main or unknown panels.
pub fn remove_side_panel(state: &mut WorkspaceState, panel_id: &str) -> bool {
    let Some(idx) = state.panel_index(panel_id) else {
        return false;
    };
    let region = state.panels[idx].region;
    if !region.is_side() {
        return false;
    }
    if state.region_len(region) > 1 {
        state.panels.remove(idx);
    } else {
        state.panels[idx].clear();
    }
    reconcile(state);
    true
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Re-derive every secondary structure from the panels.
pub(crate) fn reconcile(state: &mut WorkspaceState) {
    refresh_panel_snapshots(state);
    recompute_views(state);
    state.layout.main_view_order = state.main_active_ids();
    reconcile_side_orders(state);
}

/// Keep each panel's legacy snapshot equal to its instance.
fn refresh_panel_snapshots(state: &mut WorkspaceState) {
    let instances = &state.view_instances;
    for panel in &mut state.panels {
        let fresh = panel.active_id().and_then(|id| instances.get(id)).map(View::from);
        if let Some(view) = fresh {
            if panel.view.as_ref() != Some(&view) {
                panel.show(view);
            }
        }
    }
}

/// Shown views first (deduplicated), then previously listed views that are
/// no longer shown; `active_view` keeps its value while still listed.
fn recompute_views(state: &mut WorkspaceState) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut views: Vec<View> = Vec::with_capacity(state.views.len());

    for panel in &state.panels {
        if let Some(view) = &panel.view {
            if seen.insert(view.id.clone()) {
                views.push(view.clone());
            }
        }
    }

    for view in &state.views {
        if seen.insert(view.id.clone()) {
            let fresh = state.instance(&view.id).map(View::from).unwrap_or_else(|| view.clone());
            views.push(fresh);
        }
    }

    let active = state
        .active_view
        .take()
        .filter(|id| views.iter().any(|v| v.id == *id))
        .or_else(|| views.first().map(|v| v.id.clone()));

    state.views = views;
    state.active_view = active;
}

/// Side orders keep their ordering for shown ids, drop ids no longer shown in
/// the region and append shown ids they were missing.
fn reconcile_side_orders(state: &mut WorkspaceState) {
    for region in Region::SIDES {
        let shown: Vec<String> =
            state.panels_in(region).filter_map(|p| p.active_id().map(String::from)).collect();
        let order = state.layout.region_order_mut(region);
        let mut seen = HashSet::new();
        order.retain(|id| shown.contains(id) && seen.insert(id.clone()));
        for id in shown {
            if !order.contains(&id) {
                order.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewDefinition;
    use crate::registry::{context, StaticViewRegistry};
    use serde_json::json;

    fn registry() -> StaticViewRegistry {
        StaticViewRegistry::with_definitions([
            ViewDefinition::new("counter", "Counter").with_context(context(json!({"count": 0}))),
            ViewDefinition::new("clock", "Clock"),
            ViewDefinition::new("notes", "Notes"),
            ViewDefinition::new("logs", "Logs"),
        ])
    }

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn state_with_main(count: i64, registry: &StaticViewRegistry) -> WorkspaceState {
        let mut state = WorkspaceState::default();
        set_main_area_count(&mut state, registry, count);
        state
    }

    #[test]
    fn test_definitions_allocate_in_order() {
        let registry = registry();
        let mut state = state_with_main(3, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["counter", "clock"]));

        let main: Vec<Option<&str>> = state.main_panels().map(|p| p.active_id()).collect();
        assert_eq!(main, vec![Some("counter-1"), Some("clock-2"), None]);
        assert_eq!(state.layout.main_view_order, order(&["counter-1", "clock-2"]));
        assert_eq!(state.view_instance_counter, 2);
        assert_eq!(state.active_view.as_deref(), Some("counter-1"));
    }

    #[test]
    fn test_apply_is_idempotent_for_definition_ids() {
        let registry = registry();
        let mut state = state_with_main(3, &registry);
        let requested = order(&["counter", "clock"]);
        apply_main_view_order(&mut state, &registry, &requested);
        let once = state.clone();
        apply_main_view_order(&mut state, &registry, &requested);
        assert_eq!(state, once);
    }

    #[test]
    fn test_order_is_deduplicated_and_truncated() {
        let registry = registry();
        let mut state = state_with_main(2, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["clock", "clock", "notes", "logs"]));
        assert_eq!(state.layout.main_view_order, order(&["clock-1", "notes-2"]));
        assert!(state.instance("logs-3").is_none());
    }

    #[test]
    fn test_unresolvable_id_leaves_slot_empty() {
        let registry = registry();
        let mut state = state_with_main(2, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["ghost", "clock"]));
        let main: Vec<Option<&str>> = state.main_panels().map(|p| p.active_id()).collect();
        assert_eq!(main, vec![None, Some("clock-1")]);
        assert_eq!(state.layout.main_view_order, order(&["clock-1"]));
    }

    #[test]
    fn test_view_moving_into_main_leaves_side_panel() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        assign_view_to_panel(&mut state, &registry, "left-1", "notes", AssignOptions::default());
        assert_eq!(state.layout.left_view_order, order(&["notes-1"]));

        apply_main_view_order(&mut state, &registry, &order(&["notes-1"]));
        assert!(state.panel("left-1").unwrap().is_empty());
        assert!(state.layout.left_view_order.is_empty());
        assert_eq!(state.layout.main_view_order, order(&["notes-1"]));
    }

    #[test]
    fn test_assign_moves_instead_of_duplicating() {
        let registry = registry();
        let mut state = state_with_main(2, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["counter", "clock"]));

        assign_view_to_panel(&mut state, &registry, "right-1", "counter-1", AssignOptions::default());
        assert_eq!(state.panel("right-1").unwrap().active_id(), Some("counter-1"));
        assert!(state.panel("main-1").unwrap().is_empty());
        assert_eq!(state.layout.main_view_order, order(&["clock-2"]));
        assert_eq!(state.layout.right_view_order, order(&["counter-1"]));
    }

    #[test]
    fn test_swap_exchanges_views() {
        let registry = registry();
        let mut state = state_with_main(2, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["counter", "clock"]));

        assign_view_to_panel(
            &mut state,
            &registry,
            "main-2",
            "counter-1",
            AssignOptions { swap: true, ..Default::default() },
        );
        assert_eq!(state.panel("main-2").unwrap().active_id(), Some("counter-1"));
        assert_eq!(state.panel("main-1").unwrap().active_id(), Some("clock-2"));
        assert_eq!(state.layout.main_view_order, order(&["clock-2", "counter-1"]));
    }

    #[test]
    fn test_empty_side_source_collapses_when_region_has_more_panels() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        let second = add_side_panel(&mut state, Region::Left).unwrap();
        assign_view_to_panel(&mut state, &registry, &second, "logs", AssignOptions::default());

        assign_view_to_panel(&mut state, &registry, "main-1", "logs-1", AssignOptions::default());
        assert!(state.panel(&second).is_none());
        assert_eq!(state.region_len(Region::Left), 1);
    }

    #[test]
    fn test_last_side_panel_is_kept_when_emptied() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        assign_view_to_panel(&mut state, &registry, "bottom-1", "logs", AssignOptions::default());
        assign_view_to_panel(&mut state, &registry, "main-1", "logs-1", AssignOptions::default());
        assert!(state.panel("bottom-1").unwrap().is_empty());
    }

    #[test]
    fn test_main_source_panel_is_never_removed() {
        let registry = registry();
        let mut state = state_with_main(3, &registry);
        apply_main_view_order(&mut state, &registry, &order(&["clock"]));
        assign_view_to_panel(&mut state, &registry, "left-1", "clock-1", AssignOptions::default());
        assert_eq!(state.region_len(Region::Main), 3);
    }

    #[test]
    fn test_placement_controls_side_order() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        let second = add_side_panel(&mut state, Region::Bottom).unwrap();
        let third = add_side_panel(&mut state, Region::Bottom).unwrap();

        assign_view_to_panel(&mut state, &registry, "bottom-1", "logs", AssignOptions::default());
        assign_view_to_panel(&mut state, &registry, &second, "notes", AssignOptions::default());
        assign_view_to_panel(
            &mut state,
            &registry,
            &third,
            "clock",
            AssignOptions { placement: Placement::Bottom, ..Default::default() },
        );
        assert_eq!(state.layout.bottom_view_order, order(&["notes-2", "logs-1", "clock-3"]));
    }

    #[test]
    fn test_assign_existing_instance_patches_context() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        assign_view_to_panel(&mut state, &registry, "main-1", "counter", AssignOptions::default());
        assign_view_to_panel(
            &mut state,
            &registry,
            "left-1",
            "counter-1",
            AssignOptions { data: Some(context(json!({"count": 5}))), ..Default::default() },
        );
        let instance = state.instance("counter-1").unwrap();
        assert_eq!(instance.local_context["count"], json!(5));
        let snapshot = state.panel("left-1").unwrap().view.as_ref().unwrap();
        assert_eq!(snapshot.data, json!({"count": 5}));
    }

    #[test]
    fn test_unresolvable_assign_clears_panel() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        assign_view_to_panel(&mut state, &registry, "main-1", "clock", AssignOptions::default());
        assign_view_to_panel(&mut state, &registry, "main-1", "missing", AssignOptions::default());
        assert!(state.panel("main-1").unwrap().is_empty());
        assert!(state.layout.main_view_order.is_empty());
        assert_eq!(state.view_instance_counter, 1);
    }

    #[test]
    fn test_legacy_view_fallback() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        state.views.push(View {
            id: "legacy-a".into(),
            name: "Legacy".into(),
            component: "oldwidget".into(),
            data: json!({}),
        });
        apply_main_view_order(&mut state, &registry, &order(&["oldwidget"]));
        assert_eq!(state.panel("main-1").unwrap().active_id(), Some("legacy-a"));
        assert_eq!(state.layout.main_view_order, order(&["legacy-a"]));
    }

    #[test]
    fn test_views_list_keeps_inactive_after_active() {
        let registry = registry();
        let mut state = WorkspaceState::default();
        apply_main_view_order(&mut state, &registry, &order(&["clock"]));
        apply_main_view_order(&mut state, &registry, &order(&["notes"]));
        let ids: Vec<&str> = state.views.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["notes-2", "clock-1"]);
        assert_eq!(state.active_view.as_deref(), Some("clock-1"));
    }

    #[test]
    fn test_shrinking_capacity_drops_trailing_panels_and_clamps_mode() {
        let registry = registry();
        let mut state = state_with_main(5, &registry);
        state.layout.viewport_width_mode = crate::models::ViewportWidthMode::Columns(5);
        apply_main_view_order(&mut state, &registry, &order(&["clock", "notes", "logs"]));

        set_main_area_count(&mut state, &registry, 2);
        assert_eq!(state.region_len(Region::Main), 2);
        assert_eq!(state.layout.main_view_order, order(&["clock-1", "notes-2"]));
        assert_eq!(
            state.layout.viewport_width_mode,
            crate::models::ViewportWidthMode::Columns(2)
        );
        assert!(state.instance("logs-3").is_some());
    }

    #[test]
    fn test_remove_side_panel_rules() {
        let mut state = WorkspaceState::default();
        assert!(!remove_side_panel(&mut state, "main-1"));
        assert!(!remove_side_panel(&mut state, "nope"));
        let extra = add_side_panel(&mut state, Region::Right).unwrap();
        assert!(remove_side_panel(&mut state, &extra));
        assert_eq!(state.region_len(Region::Right), 1);
        assert!(remove_side_panel(&mut state, "right-1"));
        assert_eq!(state.region_len(Region::Right), 1);
        assert!(add_side_panel(&mut state, Region::Main).is_none());
    }
}
