//! Structural checks run after each transition when validation is enabled.
//!
//! A failing check makes the store keep its previous state; see
//! [`crate::store::Store`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{instance_serial, Region, MAX_MAIN_AREA_COUNT, MIN_MAIN_AREA_COUNT};
use crate::state::WorkspaceState;

/// A broken structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("view '{view_id}' is active in panels '{first}' and '{second}'")]
    DuplicateOccupancy { view_id: String, first: String, second: String },

    #[error("main area count {count} outside 1..=5")]
    CapacityOutOfRange { count: u8 },

    #[error("{panels} main panels for a main area count of {count}")]
    MainPanelCount { panels: usize, count: u8 },

    #[error("main view order has {len} entries for a capacity of {count}")]
    MainOrderTooLong { len: usize, count: u8 },

    #[error("viewport mode {mode} exceeds main area count {count}")]
    ViewportExceedsCapacity { mode: String, count: u8 },

    #[error("instance id '{key}' does not match its record '{instance_id}'")]
    InstanceKeyMismatch { key: String, instance_id: String },

    #[error("instance '{instance_id}' serial is above the counter {counter}")]
    CounterBehind { instance_id: String, counter: u64 },

    #[error("main view order {order:?} does not match main panels {panels:?}")]
    MainOrderMismatch { order: Vec<String>, panels: Vec<String> },

    #[error("panel id '{0}' is used twice")]
    DuplicatePanelId(String),
}

/// Check every structural invariant, returning all violations found.
pub fn validate(state: &WorkspaceState) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_panels(state, &mut violations);
    check_capacity(state, &mut violations);
    check_instances(state, &mut violations);
    violations
}

fn check_panels(state: &WorkspaceState, violations: &mut Vec<Violation>) {
    let mut panel_ids = HashSet::new();
    let mut occupied: HashMap<&str, &str> = HashMap::new();

    for panel in &state.panels {
        if !panel_ids.insert(panel.id.as_str()) {
            violations.push(Violation::DuplicatePanelId(panel.id.clone()));
        }
        if let Some(view_id) = panel.active_id() {
            if let Some(first) = occupied.insert(view_id, panel.id.as_str()) {
                violations.push(Violation::DuplicateOccupancy {
                    view_id: view_id.to_string(),
                    first: first.to_string(),
                    second: panel.id.clone(),
                });
            }
        }
    }

    let panels = state.main_active_ids();
    if state.layout.main_view_order != panels {
        violations.push(Violation::MainOrderMismatch {
            order: state.layout.main_view_order.clone(),
            panels,
        });
    }
}

fn check_capacity(state: &WorkspaceState, violations: &mut Vec<Violation>) {
    let layout = &state.layout;
    let count = layout.main_area_count;

    if !(MIN_MAIN_AREA_COUNT..=MAX_MAIN_AREA_COUNT).contains(&count) {
        violations.push(Violation::CapacityOutOfRange { count });
    }

    let panels = state.region_len(Region::Main);
    if panels != count as usize {
        violations.push(Violation::MainPanelCount { panels, count });
    }

    if layout.main_view_order.len() > count as usize {
        violations.push(Violation::MainOrderTooLong { len: layout.main_view_order.len(), count });
    }

    if layout.viewport_width_mode.columns().is_some_and(|n| n > count) {
        violations.push(Violation::ViewportExceedsCapacity {
            mode: layout.viewport_width_mode.to_string(),
            count,
        });
    }
}

fn check_instances(state: &WorkspaceState, violations: &mut Vec<Violation>) {
    for (key, instance) in &state.view_instances {
        if *key != instance.instance_id {
            violations.push(Violation::InstanceKeyMismatch {
                key: key.clone(),
                instance_id: instance.instance_id.clone(),
            });
        }
        let allocated = instance
            .instance_id
            .rsplit_once('-')
            .is_some_and(|(prefix, _)| prefix == instance.definition_id);
        if allocated
            && instance_serial(&instance.instance_id).is_some_and(|n| n > state.view_instance_counter)
        {
            violations.push(Violation::CounterBehind {
                instance_id: instance.instance_id.clone(),
                counter: state.view_instance_counter,
            });
        }
    }
}
