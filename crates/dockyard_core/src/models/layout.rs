//! Global layout configuration: side expansion, viewport mode, main-area
//! capacity, per-region ordering and presets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::panel::Region;

/// Smallest allowed main-area capacity.
pub const MIN_MAIN_AREA_COUNT: u8 = 1;
/// Largest allowed main-area capacity.
pub const MAX_MAIN_AREA_COUNT: u8 = 5;

/// Clamp any requested capacity into `MIN_MAIN_AREA_COUNT..=MAX_MAIN_AREA_COUNT`.
pub fn clamp_main_area_count(requested: i64) -> u8 {
    requested.clamp(MIN_MAIN_AREA_COUNT as i64, MAX_MAIN_AREA_COUNT as i64) as u8
}

// ============================================================================
// Expansion
// ============================================================================

/// Side-panel expansion, ordered `Collapsed < Closed < Opened < Expanded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpansionState {
    /// Hidden along with its toggle button.
    Collapsed,
    /// Hidden, toggle button visible.
    Closed,
    /// Visible at its normal size.
    Opened,
    /// Visible and enlarged.
    Expanded,
}

impl ExpansionState {
    /// Next state in the toggle cycle; wraps from `Expanded` to `Collapsed`.
    pub fn next(self) -> Self {
        match self {
            Self::Collapsed => Self::Closed,
            Self::Closed => Self::Opened,
            Self::Opened => Self::Expanded,
            Self::Expanded => Self::Collapsed,
        }
    }

    /// The panel is open exactly when `Opened` or `Expanded`.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Opened | Self::Expanded)
    }

    /// The toggle button is hidden exactly when `Collapsed`.
    pub fn toggle_visible(self) -> bool {
        self != Self::Collapsed
    }

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collapsed => "Collapsed",
            Self::Closed => "Closed",
            Self::Opened => "Opened",
            Self::Expanded => "Expanded",
        }
    }

    /// Parse a state name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collapsed" => Some(Self::Collapsed),
            "closed" => Some(Self::Closed),
            "opened" | "open" => Some(Self::Opened),
            "expanded" => Some(Self::Expanded),
            _ => None,
        }
    }
}

impl Serialize for ExpansionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpansionRepr {
    Flag(bool),
    Name(String),
}

/// Accepts the current names and the old boolean open/closed shape.
impl<'de> Deserialize<'de> for ExpansionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ExpansionRepr::deserialize(deserializer)? {
            ExpansionRepr::Flag(true) => Ok(Self::Opened),
            ExpansionRepr::Flag(false) => Ok(Self::Closed),
            ExpansionRepr::Name(name) => Self::parse(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown expansion state '{name}'"))),
        }
    }
}

/// A side of the workspace that can expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left dock.
    Left,
    /// Right dock.
    Right,
    /// Bottom dock.
    Bottom,
}

impl Side {
    /// Parse a side name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    /// The panel region docked on this side.
    pub fn region(self) -> Region {
        match self {
            Self::Left => Region::Left,
            Self::Right => Region::Right,
            Self::Bottom => Region::Bottom,
        }
    }
}

/// Expansion state for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expansion {
    /// Left side.
    pub left: ExpansionState,
    /// Right side.
    pub right: ExpansionState,
    /// Bottom side.
    pub bottom: ExpansionState,
}

impl Default for Expansion {
    fn default() -> Self {
        Self {
            left: ExpansionState::Opened,
            right: ExpansionState::Closed,
            bottom: ExpansionState::Closed,
        }
    }
}

impl Expansion {
    /// State of one side.
    pub fn get(&self, side: Side) -> ExpansionState {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
        }
    }

    /// Set one side.
    pub fn set(&mut self, side: Side, state: ExpansionState) {
        match side {
            Side::Left => self.left = state,
            Side::Right => self.right = state,
            Side::Bottom => self.bottom = state,
        }
    }
}

// ============================================================================
// Viewport width mode
// ============================================================================

/// How many main panels the viewport shows side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewportWidthMode {
    /// Let the host decide; never clamped.
    #[default]
    Auto,
    /// Exactly N columns (`"Nx"`), 1..=5.
    Columns(u8),
}

impl ViewportWidthMode {
    /// Parse `"auto"` or `"Nx"`. Column counts above the maximum clamp down.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        let digits = s.strip_suffix('x').or_else(|| s.strip_suffix('X')).unwrap_or(s);
        digits.parse::<u64>().ok().and_then(Self::from_columns)
    }

    /// Build a numeric mode; zero is invalid.
    pub fn from_columns(n: u64) -> Option<Self> {
        if n == 0 {
            None
        } else {
            Some(Self::Columns(n.min(MAX_MAIN_AREA_COUNT as u64) as u8))
        }
    }

    /// Column count, `None` for `Auto`.
    pub fn columns(self) -> Option<u8> {
        match self {
            Self::Auto => None,
            Self::Columns(n) => Some(n),
        }
    }

    /// Clamp a numeric mode down to `capacity`; `Auto` is always valid.
    pub fn clamped_to(self, capacity: u8) -> Self {
        match self {
            Self::Columns(n) if n > capacity => Self::Columns(capacity.max(MIN_MAIN_AREA_COUNT)),
            other => other,
        }
    }
}

impl std::fmt::Display for ViewportWidthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Columns(n) => write!(f, "{n}x"),
        }
    }
}

impl Serialize for ViewportWidthMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ViewportRepr {
    Number(u64),
    Text(String),
}

/// Accepts `"auto"`, `"Nx"` and the older bare column number.
impl<'de> Deserialize<'de> for ViewportWidthMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ViewportRepr::deserialize(deserializer)? {
            ViewportRepr::Number(n) => Self::from_columns(n)
                .ok_or_else(|| D::Error::custom("viewport column count must be positive")),
            ViewportRepr::Text(s) => Self::parse(&s)
                .ok_or_else(|| D::Error::custom(format!("unknown viewport width mode '{s}'"))),
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

/// A named snapshot of the layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutPreset {
    /// Preset name.
    pub name: String,
    /// Side expansion.
    pub expansion: Expansion,
    /// Viewport mode.
    pub viewport_width_mode: ViewportWidthMode,
    /// Main-area capacity.
    pub main_area_count: u8,
    /// Main order.
    pub main_view_order: Vec<String>,
    /// Left order.
    pub left_view_order: Vec<String>,
    /// Right order.
    pub right_view_order: Vec<String>,
    /// Bottom order.
    pub bottom_view_order: Vec<String>,
    /// When the preset was saved; supplied by the action so reducers stay pure.
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for LayoutPreset {
    fn default() -> Self {
        Self {
            name: String::new(),
            expansion: Expansion::default(),
            viewport_width_mode: ViewportWidthMode::Auto,
            main_area_count: MIN_MAIN_AREA_COUNT,
            main_view_order: Vec::new(),
            left_view_order: Vec::new(),
            right_view_order: Vec::new(),
            bottom_view_order: Vec::new(),
            saved_at: None,
        }
    }
}

// ============================================================================
// LayoutState
// ============================================================================

/// Global layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutState {
    /// Per-side expansion.
    pub expansion: Expansion,
    /// View shown in the overlay, if any.
    pub overlay_view: Option<String>,
    /// Requested side-by-side main columns.
    pub viewport_width_mode: ViewportWidthMode,
    /// Number of main panels (1..=5).
    pub main_area_count: u8,
    /// Render order of the main area; source of truth for main rendering.
    pub main_view_order: Vec<String>,
    /// Order of views docked left.
    pub left_view_order: Vec<String>,
    /// Order of views docked right.
    pub right_view_order: Vec<String>,
    /// Order of views docked bottom.
    pub bottom_view_order: Vec<String>,
    /// Saved presets by name.
    pub presets: BTreeMap<String, LayoutPreset>,
    /// Most recently saved or applied preset.
    pub active_preset: Option<String>,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            expansion: Expansion::default(),
            overlay_view: None,
            viewport_width_mode: ViewportWidthMode::Auto,
            main_area_count: MIN_MAIN_AREA_COUNT,
            main_view_order: Vec::new(),
            left_view_order: Vec::new(),
            right_view_order: Vec::new(),
            bottom_view_order: Vec::new(),
            presets: BTreeMap::new(),
            active_preset: None,
        }
    }
}

impl LayoutState {
    /// Mutable order array for a region.
    pub fn region_order_mut(&mut self, region: Region) -> &mut Vec<String> {
        match region {
            Region::Main => &mut self.main_view_order,
            Region::Left => &mut self.left_view_order,
            Region::Right => &mut self.right_view_order,
            Region::Bottom => &mut self.bottom_view_order,
        }
    }

    /// Main columns actually shown: the numeric mode bounded by capacity.
    pub fn effective_columns(&self) -> u8 {
        self.viewport_width_mode
            .clamped_to(self.main_area_count)
            .columns()
            .unwrap_or(self.main_area_count)
    }

    /// Capture the current layout as a preset.
    pub fn to_preset(&self, name: impl Into<String>, saved_at: Option<DateTime<Utc>>) -> LayoutPreset {
        LayoutPreset {
            name: name.into(),
            expansion: self.expansion,
            viewport_width_mode: self.viewport_width_mode,
            main_area_count: self.main_area_count,
            main_view_order: self.main_view_order.clone(),
            left_view_order: self.left_view_order.clone(),
            right_view_order: self.right_view_order.clone(),
            bottom_view_order: self.bottom_view_order.clone(),
            saved_at,
        }
    }
}
