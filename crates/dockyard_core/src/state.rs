//! The workspace state tree.
//!
//! One `WorkspaceState` holds everything the engine manages. The store keeps it
//! behind an `Arc` and replaces it wholesale on every committed change, so an
//! unchanged `Arc` pointer means unchanged content.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;
use crate::models::{
    AuthState, AuthUiState, LayoutState, Panel, Region, UiState, View, ViewInstance,
};

/// The complete workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceState {
    /// All panels across regions; main panels in render order.
    pub panels: Vec<Panel>,
    /// Materialized view instances by instance id.
    pub view_instances: BTreeMap<String, ViewInstance>,
    /// Last serial handed out to an instance; never decreases.
    pub view_instance_counter: u64,
    /// Legacy flattened views: active ones first, then previously shown ones.
    pub views: Vec<View>,
    /// Legacy active view id.
    pub active_view: Option<String>,
    /// Layout configuration.
    pub layout: LayoutState,
    /// Session identity.
    pub auth: AuthState,
    /// Auth UI flags.
    pub auth_ui: AuthUiState,
    /// Workspace-wide messages.
    pub ui: UiState,
}

impl Default for WorkspaceState {
    /// One empty main panel and one empty panel per side region.
    fn default() -> Self {
        Self {
            panels: vec![
                Panel::new("main-1", Region::Main),
                Panel::new("left-1", Region::Left),
                Panel::new("right-1", Region::Right),
                Panel::new("bottom-1", Region::Bottom),
            ],
            view_instances: BTreeMap::new(),
            view_instance_counter: 0,
            views: Vec::new(),
            active_view: None,
            layout: LayoutState::default(),
            auth: AuthState::default(),
            auth_ui: AuthUiState::default(),
            ui: UiState::default(),
        }
    }
}

impl WorkspaceState {
    /// Parse a state tree; missing sub-trees take their defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, WorkspaceError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize the state tree.
    pub fn to_json(&self) -> Result<serde_json::Value, WorkspaceError> {
        Ok(serde_json::to_value(self)?)
    }

    // ========== Panel Queries ==========

    /// Panel by id.
    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    /// Index of a panel in the panel array.
    pub fn panel_index(&self, id: &str) -> Option<usize> {
        self.panels.iter().position(|p| p.id == id)
    }

    /// Panels of one region in array order.
    pub fn panels_in(&self, region: Region) -> impl Iterator<Item = &Panel> + '_ {
        self.panels.iter().filter(move |p| p.region == region)
    }

    /// Main-region panels in render order.
    pub fn main_panels(&self) -> impl Iterator<Item = &Panel> + '_ {
        self.panels_in(Region::Main)
    }

    /// Number of panels in a region.
    pub fn region_len(&self, region: Region) -> usize {
        self.panels_in(region).count()
    }

    /// Active ids of the main panels, skipping empty ones.
    pub fn main_active_ids(&self) -> Vec<String> {
        self.main_panels().filter_map(|p| p.active_id().map(String::from)).collect()
    }

    /// Smallest unused `"<region>-<n>"` panel id.
    pub fn next_panel_id(&self, region: Region) -> String {
        (1..)
            .map(|n| format!("{}-{n}", region.as_str()))
            .find(|candidate| self.panel(candidate).is_none())
            .unwrap_or_else(|| format!("{}-{}", region.as_str(), self.panels.len() + 1))
    }

    // ========== View Queries ==========

    /// Instance by id.
    pub fn instance(&self, instance_id: &str) -> Option<&ViewInstance> {
        self.view_instances.get(instance_id)
    }

    /// Legacy view by id, falling back to the first view whose component matches.
    pub fn legacy_view(&self, id: &str) -> Option<&View> {
        self.views
            .iter()
            .find(|v| v.id == id)
            .or_else(|| self.views.iter().find(|v| v.component == id))
    }

    /// Snapshot of the persistent parts of the state.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            layout: self.layout.clone(),
            panels: self.panels.clone(),
            view_instances: self.view_instances.clone(),
            view_instance_counter: self.view_instance_counter,
        }
    }
}

/// The part of the state that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSnapshot {
    /// Layout configuration.
    pub layout: LayoutState,
    /// Panels with their assignments.
    pub panels: Vec<Panel>,
    /// Instances by id.
    pub view_instances: BTreeMap<String, ViewInstance>,
    /// Instance counter at save time.
    pub view_instance_counter: u64,
}
