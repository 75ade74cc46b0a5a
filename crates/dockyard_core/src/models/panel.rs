//! Panels: the layout slots views are docked into.

use serde::{Deserialize, Serialize};

use super::view::View;

/// Region of the workspace a panel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Capacity-bounded central row.
    #[default]
    Main,
    /// Left side dock.
    Left,
    /// Right side dock.
    Right,
    /// Bottom dock.
    Bottom,
}

impl Region {
    /// All regions in panel-array order.
    pub const ALL: [Region; 4] = [Region::Main, Region::Left, Region::Right, Region::Bottom];

    /// Side (non-main) regions.
    pub const SIDES: [Region; 3] = [Region::Left, Region::Right, Region::Bottom];

    /// Whether this is a side region.
    pub fn is_side(self) -> bool {
        !matches!(self, Region::Main)
    }

    /// Lowercase name, also used as the panel id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Main => "main",
            Region::Left => "left",
            Region::Right => "right",
            Region::Bottom => "bottom",
        }
    }

    /// Parse a region name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Some(Region::Main),
            "left" => Some(Region::Left),
            "right" => Some(Region::Right),
            "bottom" => Some(Region::Bottom),
            _ => None,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a view lands in its region's order array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Front of the order.
    #[default]
    Top,
    /// Back of the order.
    Bottom,
}

impl Placement {
    /// Parse a placement; anything other than `"bottom"` means top.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("bottom") {
            Placement::Bottom
        } else {
            Placement::Top
        }
    }
}

/// A layout slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    /// Unique panel id, `"<region>-<n>"` for generated panels.
    pub id: String,
    /// Region the panel lives in.
    #[serde(default)]
    pub region: Region,
    /// Instance (or legacy view) id shown in the panel.
    #[serde(default)]
    pub view_id: Option<String>,
    /// Active id; kept equal to `view_id`.
    #[serde(default)]
    pub active_view_id: Option<String>,
    /// Legacy embedded snapshot of the shown view.
    #[serde(default)]
    pub view: Option<View>,
}

impl Panel {
    /// Create an empty panel.
    pub fn new(id: impl Into<String>, region: Region) -> Self {
        Self { id: id.into(), region, view_id: None, active_view_id: None, view: None }
    }

    /// The id of the view this panel currently shows.
    pub fn active_id(&self) -> Option<&str> {
        self.active_view_id
            .as_deref()
            .or(self.view_id.as_deref())
            .or_else(|| self.view.as_ref().map(|v| v.id.as_str()))
    }

    /// Whether the panel shows nothing.
    pub fn is_empty(&self) -> bool {
        self.active_id().is_none()
    }

    /// Show `view` in this panel, keeping all three references in sync.
    pub fn show(&mut self, view: View) {
        self.view_id = Some(view.id.clone());
        self.active_view_id = Some(view.id.clone());
        self.view = Some(view);
    }

    /// Remove whatever the panel shows.
    pub fn clear(&mut self) {
        self.view_id = None;
        self.active_view_id = None;
        self.view = None;
    }
}
