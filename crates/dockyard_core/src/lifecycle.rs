//! View instance lifecycle: create, patch, destroy.

use serde_json::{Map, Value};

use crate::allocator::{allocate_instance, reconcile};
use crate::models::Region;
use crate::registry::ViewRegistry;
use crate::state::WorkspaceState;

/// Create an instance without showing it anywhere.
pub fn create_instance(
    state: &mut WorkspaceState,
    registry: &dyn ViewRegistry,
    definition_id: &str,
    title: Option<String>,
    context: Option<Map<String, Value>>,
) -> Option<String> {
    allocate_instance(state, registry, definition_id, title, context)
}

/// Shallow-merge `patch` into an instance's local context.
///
/// Returns false when the instance is unknown or nothing changed.
pub fn update_local_context(
    state: &mut WorkspaceState,
    instance_id: &str,
    patch: &Map<String, Value>,
) -> bool {
    let changed = match state.view_instances.get_mut(instance_id) {
        Some(instance) => instance.patch_context(patch),
        None => return false,
    };
    if changed {
        reconcile(state);
    }
    changed
}

/// Remove an instance and every reference to it.
///
/// Panels showing it are cleared, it leaves every order array and the legacy
/// view list, and the overlay closes if it showed the instance.
pub fn destroy_instance(state: &mut WorkspaceState, instance_id: &str) -> bool {
    if state.view_instances.remove(instance_id).is_none() {
        return false;
    }

    for panel in &mut state.panels {
        if panel.active_id() == Some(instance_id) {
            panel.clear();
        }
    }
    for region in Region::ALL {
        state.layout.region_order_mut(region).retain(|id| id != instance_id);
    }
    state.views.retain(|view| view.id != instance_id);
    if state.layout.overlay_view.as_deref() == Some(instance_id) {
        state.layout.overlay_view = None;
    }
    if state.active_view.as_deref() == Some(instance_id) {
        state.active_view = None;
    }

    tracing::debug!(instance_id, "View instance destroyed");
    reconcile(state);
    true
}
