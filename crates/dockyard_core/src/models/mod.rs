//! Data models for the workspace engine.
//!
//! This module contains all core data structures:
//! - `action` - The `{type, payload}` action envelope
//! - `panel` - Panel, Region, Placement
//! - `view` - ViewDefinition, ViewInstance, legacy View
//! - `layout` - LayoutState, expansion state machine, viewport mode, presets
//! - `auth` - AuthState, AuthUiState, UiState

pub mod action;
pub mod auth;
pub mod layout;
pub mod panel;
pub mod view;

pub use action::Action;
pub use auth::{AuthState, AuthUiState, AuthUser, UiState};
pub use layout::{
    clamp_main_area_count, Expansion, ExpansionState, LayoutPreset, LayoutState, Side,
    ViewportWidthMode, MAX_MAIN_AREA_COUNT, MIN_MAIN_AREA_COUNT,
};
pub use panel::{Panel, Placement, Region};
pub use view::{instance_serial, InstanceOverrides, View, ViewDefinition, ViewInstance};
