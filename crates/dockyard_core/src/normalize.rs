//! State normalization.
//!
//! Runs before every reducer. Repairs whatever a hydrated or hand-built state
//! may be missing so reducers can rely on the invariants holding on input.
//! Returns the same `Arc` when nothing needed fixing.

use std::collections::HashSet;
use std::sync::Arc;

use crate::allocator::resize_main_panels;
use crate::models::{clamp_main_area_count, instance_serial, Panel, Region};
use crate::state::WorkspaceState;

/// Normalize a state, preserving the reference when already normal.
pub fn normalize(state: &Arc<WorkspaceState>) -> Arc<WorkspaceState> {
    let mut next = WorkspaceState::clone(state);
    normalize_in_place(&mut next);
    if next == **state {
        Arc::clone(state)
    } else {
        tracing::trace!("State normalized");
        Arc::new(next)
    }
}

/// Normalize a state owned by the caller.
pub fn normalize_in_place(state: &mut WorkspaceState) {
    normalize_layout(state);
    normalize_panels(state);
    normalize_instances(state);
    normalize_auth(state);
}

fn normalize_layout(state: &mut WorkspaceState) {
    let layout = &mut state.layout;
    let capacity = clamp_main_area_count(layout.main_area_count as i64);
    layout.main_area_count = capacity;
    layout.viewport_width_mode = layout.viewport_width_mode.clamped_to(capacity);

    for region in Region::ALL {
        let mut seen = HashSet::new();
        layout.region_order_mut(region).retain(|id| !id.is_empty() && seen.insert(id.clone()));
    }
    layout.main_view_order.truncate(capacity as usize);

    if let Some(active) = &layout.active_preset {
        if !layout.presets.contains_key(active) {
            layout.active_preset = None;
        }
    }
    for (name, preset) in layout.presets.iter_mut() {
        if preset.name != *name {
            preset.name = name.clone();
        }
        preset.main_area_count = clamp_main_area_count(preset.main_area_count as i64);
    }
}

fn normalize_panels(state: &mut WorkspaceState) {
    let capacity = state.layout.main_area_count as usize;
    if state.region_len(Region::Main) != capacity {
        resize_main_panels(state, capacity);
    }
    for region in Region::SIDES {
        if state.region_len(region) == 0 {
            let id = state.next_panel_id(region);
            state.panels.push(Panel::new(id, region));
        }
    }

    let mut seen_ids = HashSet::new();
    state.panels.retain(|panel| seen_ids.insert(panel.id.clone()));

    // Older snapshots carry only the embedded view; later writers keep all
    // three references equal.
    let mut shown = HashSet::new();
    for panel in &mut state.panels {
        let Some(active) = panel.active_id().map(String::from) else {
            continue;
        };
        if !shown.insert(active.clone()) {
            tracing::debug!(panel_id = %panel.id, view_id = %active, "Duplicate occupancy cleared");
            panel.clear();
            continue;
        }
        if panel.view_id.as_deref() != Some(active.as_str()) {
            panel.view_id = Some(active.clone());
        }
        if panel.active_view_id.as_deref() != Some(active.as_str()) {
            panel.active_view_id = Some(active);
        }
    }
}

fn normalize_instances(state: &mut WorkspaceState) {
    let highest = state
        .view_instances
        .values()
        .filter_map(|instance| {
            let (prefix, _) = instance.instance_id.rsplit_once('-')?;
            if prefix != instance.definition_id {
                return None;
            }
            instance_serial(&instance.instance_id)
        })
        .max()
        .unwrap_or(0);
    if state.view_instance_counter < highest {
        state.view_instance_counter = highest;
    }

    if let Some(active) = &state.active_view {
        if !state.views.iter().any(|v| v.id == *active) {
            state.active_view = state.views.first().map(|v| v.id.clone());
        }
    }
}

fn normalize_auth(state: &mut WorkspaceState) {
    if !state.auth.is_logged_in {
        state.auth.user = None;
        state.auth.is_admin = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ViewInstance, ViewportWidthMode};
    use serde_json::{json, Map};

    #[test]
    fn test_normal_state_keeps_reference() {
        let state = Arc::new(WorkspaceState::default());
        let normalized = normalize(&state);
        assert!(Arc::ptr_eq(&state, &normalized));
    }

    #[test]
    fn test_legacy_panel_snapshot_fills_ids() {
        let state = WorkspaceState::from_json(json!({
            "panels": [
                {"id": "main-1", "region": "main", "view": {"id": "old", "component": "notes"}},
                {"id": "left-1", "region": "left"}
            ]
        }))
        .unwrap();
        let normalized = normalize(&Arc::new(state));
        let panel = normalized.panel("main-1").unwrap();
        assert_eq!(panel.view_id.as_deref(), Some("old"));
        assert_eq!(panel.active_view_id.as_deref(), Some("old"));
    }

    #[test]
    fn test_capacity_and_mode_are_repaired() {
        let mut state = WorkspaceState::default();
        state.layout.viewport_width_mode = ViewportWidthMode::Columns(5);
        state.layout.main_view_order = (1..=7).map(|n| format!("v{n}")).collect();
        state.layout.main_area_count = 0;

        normalize_in_place(&mut state);
        assert_eq!(state.layout.main_area_count, 1);
        assert_eq!(state.layout.viewport_width_mode, ViewportWidthMode::Columns(1));
        assert_eq!(state.layout.main_view_order, vec!["v1".to_string()]);
        assert_eq!(state.region_len(Region::Main), 1);
    }

    #[test]
    fn test_main_panels_follow_capacity() {
        let mut state = WorkspaceState::default();
        state.layout.main_area_count = 3;
        normalize_in_place(&mut state);
        let ids: Vec<&str> = state.main_panels().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["main-1", "main-2", "main-3"]);
    }

    #[test]
    fn test_duplicate_occupancy_keeps_first() {
        let mut state = WorkspaceState::default();
        state.panels[0].view_id = Some("clock-1".into());
        state.panels[1].active_view_id = Some("clock-1".into());
        normalize_in_place(&mut state);
        assert_eq!(state.panels[0].active_id(), Some("clock-1"));
        assert!(state.panels[1].is_empty());
    }

    #[test]
    fn test_counter_never_below_existing_serials() {
        let mut state = WorkspaceState::default();
        state.view_instances.insert(
            "clock-7".into(),
            ViewInstance {
                instance_id: "clock-7".into(),
                definition_id: "clock".into(),
                title: "Clock".into(),
                local_context: Map::new(),
            },
        );
        state.panels.push(Panel::new("left-2", Region::Left));
        normalize_in_place(&mut state);
        assert_eq!(state.view_instance_counter, 7);
    }

    #[test]
    fn test_logged_out_session_has_no_identity() {
        let mut state = WorkspaceState::default();
        state.auth.is_admin = true;
        state.auth.user = Some(crate::models::AuthUser {
            id: "u1".into(),
            name: "Ada".into(),
            email: None,
        });
        normalize_in_place(&mut state);
        assert!(!state.auth.is_admin);
        assert!(state.auth.user.is_none());
    }
}
