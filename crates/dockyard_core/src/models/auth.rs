//! Session identity and transient UI flags.

use serde::{Deserialize, Serialize};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Stable user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Session/identity state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthState {
    /// Whether a session is active.
    pub is_logged_in: bool,
    /// Whether the session has admin rights.
    pub is_admin: bool,
    /// The signed-in user.
    pub user: Option<AuthUser>,
}

/// Transient auth UI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthUiState {
    /// A login/logout request is in flight.
    pub loading: bool,
    /// Last auth error shown to the user.
    pub error: Option<String>,
    /// Last auth success message.
    pub success: Option<String>,
}

/// Workspace-wide transient messages (effect failures, save confirmations).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    /// Visible error message.
    pub error: Option<String>,
    /// Visible informational message.
    pub notice: Option<String>,
}
