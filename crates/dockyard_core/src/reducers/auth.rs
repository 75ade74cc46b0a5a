//! Session identity reducers.
//!
//! `auth/login` and `auth/logout` are effect-only (see
//! [`crate::effects::auth`]); the reducers here track the UI side of a request
//! and record its outcome.

use std::sync::Arc;

use serde_json::Value;

use crate::error::WorkspaceError;
use crate::models::{Action, AuthState, AuthUser};
use crate::state::WorkspaceState;
use crate::store::{HandlerRegistry, Transition};

use super::{decode, required_str};

/// Auth actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// Ask the provider for a session.
    Login { username: String, password: String },
    /// End the session with the provider.
    Logout,
    /// A login request is in flight.
    LoginStarted,
    /// The provider accepted the credentials.
    LoginSucceeded { user: AuthUser, is_admin: bool },
    /// The provider refused or failed.
    LoginFailed { message: String },
    /// A logout request is in flight.
    LogoutStarted,
    /// The provider could not end the session; it stays signed in.
    LogoutFailed { message: String },
    /// The session ended.
    LoggedOut,
    /// Dismiss the error and success messages.
    ClearMessages,
}

impl AuthAction {
    pub const LOGIN: &'static str = "auth/login";
    pub const LOGOUT: &'static str = "auth/logout";
    pub const LOGIN_STARTED: &'static str = "auth/loginStarted";
    pub const LOGIN_SUCCEEDED: &'static str = "auth/loginSucceeded";
    pub const LOGIN_FAILED: &'static str = "auth/loginFailed";
    pub const LOGOUT_STARTED: &'static str = "auth/logoutStarted";
    pub const LOGOUT_FAILED: &'static str = "auth/logoutFailed";
    pub const LOGGED_OUT: &'static str = "auth/loggedOut";
    pub const CLEAR_MESSAGES: &'static str = "auth/clearMessages";

    /// Types with a reducer.
    pub const TYPES: [&'static str; 7] = [
        Self::LOGIN_STARTED,
        Self::LOGIN_SUCCEEDED,
        Self::LOGIN_FAILED,
        Self::LOGOUT_STARTED,
        Self::LOGOUT_FAILED,
        Self::LOGGED_OUT,
        Self::CLEAR_MESSAGES,
    ];

    /// Decode from the envelope.
    pub fn parse(action: &Action) -> Result<Self, WorkspaceError> {
        match action.kind() {
            Self::LOGIN => Ok(Self::Login {
                username: required_str(action, "username")?.to_string(),
                password: action.str_field("password").unwrap_or_default().to_string(),
            }),
            Self::LOGOUT => Ok(Self::Logout),
            Self::LOGIN_STARTED => Ok(Self::LoginStarted),
            Self::LOGIN_SUCCEEDED => {
                let user = action
                    .field("user")
                    .cloned()
                    .ok_or_else(|| WorkspaceError::invalid_payload(action.kind(), "missing 'user'"))
                    .and_then(|value| {
                        serde_json::from_value::<AuthUser>(value).map_err(|e| {
                            WorkspaceError::invalid_payload(action.kind(), e.to_string())
                        })
                    })?;
                Ok(Self::LoginSucceeded {
                    user,
                    is_admin: action.bool_field("isAdmin").unwrap_or(false),
                })
            }
            Self::LOGIN_FAILED => Ok(Self::LoginFailed {
                message: action.str_field("message").unwrap_or("Login failed").to_string(),
            }),
            Self::LOGOUT_STARTED => Ok(Self::LogoutStarted),
            Self::LOGOUT_FAILED => Ok(Self::LogoutFailed {
                message: action.str_field("message").unwrap_or("Sign-out failed").to_string(),
            }),
            Self::LOGGED_OUT => Ok(Self::LoggedOut),
            Self::CLEAR_MESSAGES => Ok(Self::ClearMessages),
            other => Err(WorkspaceError::invalid_payload(other, "not an auth action")),
        }
    }

    /// Encode as an envelope.
    pub fn into_action(self) -> Action {
        match self {
            Self::Login { username, password } => Action::new(Self::LOGIN)
                .with("username", username)
                .with("password", password),
            Self::Logout => Action::new(Self::LOGOUT),
            Self::LoginStarted => Action::new(Self::LOGIN_STARTED),
            Self::LoginSucceeded { user, is_admin } => Action::new(Self::LOGIN_SUCCEEDED)
                .with("user", serde_json::to_value(user).unwrap_or(Value::Null))
                .with("isAdmin", is_admin),
            Self::LoginFailed { message } => Action::new(Self::LOGIN_FAILED).with("message", message),
            Self::LogoutStarted => Action::new(Self::LOGOUT_STARTED),
            Self::LogoutFailed { message } => Action::new(Self::LOGOUT_FAILED).with("message", message),
            Self::LoggedOut => Action::new(Self::LOGGED_OUT),
            Self::ClearMessages => Action::new(Self::CLEAR_MESSAGES),
        }
    }

    fn apply(self, state: &mut WorkspaceState) {
        let ui = &mut state.auth_ui;
        match self {
            Self::Login { .. } | Self::Logout => {}
            Self::LoginStarted => {
                ui.loading = true;
                ui.error = None;
                ui.success = None;
            }
            Self::LoginSucceeded { user, is_admin } => {
                ui.loading = false;
                ui.error = None;
                ui.success = Some(format!("Signed in as {}", user.name));
                state.auth = AuthState { is_logged_in: true, is_admin, user: Some(user) };
            }
            Self::LoginFailed { message } => {
                ui.loading = false;
                ui.success = None;
                ui.error = Some(message);
            }
            Self::LogoutStarted => {
                ui.loading = true;
                ui.error = None;
            }
            Self::LogoutFailed { message } => {
                ui.loading = false;
                ui.error = Some(message);
            }
            Self::LoggedOut => {
                ui.loading = false;
                ui.error = None;
                ui.success = Some("Signed out".to_string());
                state.auth = AuthState::default();
            }
            Self::ClearMessages => {
                ui.error = None;
                ui.success = None;
            }
        }
    }
}

pub(crate) fn register(handlers: &mut HandlerRegistry) {
    for kind in AuthAction::TYPES {
        handlers.register(kind, reduce);
    }
}

fn reduce(state: &Arc<WorkspaceState>, action: &Action) -> Transition {
    match decode(action, AuthAction::parse) {
        Some(auth) => Transition::update(state, |s| auth.apply(s)),
        None => Transition::unchanged(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> AuthUser {
        AuthUser { id: "u1".into(), name: "Ada".into(), email: Some("ada@example.com".into()) }
    }

    #[test]
    fn test_login_flow() {
        let state = Arc::new(WorkspaceState::default());
        let state = reduce(&state, &AuthAction::LoginStarted.into_action()).state;
        assert!(state.auth_ui.loading);

        let success = AuthAction::LoginSucceeded { user: user(), is_admin: true }.into_action();
        let state = reduce(&state, &success).state;
        assert!(state.auth.is_logged_in);
        assert!(state.auth.is_admin);
        assert!(!state.auth_ui.loading);
        assert_eq!(state.auth_ui.success.as_deref(), Some("Signed in as Ada"));

        let state = reduce(&state, &AuthAction::LoggedOut.into_action()).state;
        assert!(!state.auth.is_logged_in);
        assert!(state.auth.user.is_none());
    }

    #[test]
    fn test_failure_keeps_session_and_shows_error() {
        let state = Arc::new(WorkspaceState::default());
        let failed = Action::new(AuthAction::LOGIN_FAILED).with("message", "bad password");
        let state = reduce(&state, &failed).state;
        assert_eq!(state.auth_ui.error.as_deref(), Some("bad password"));
        assert!(!state.auth.is_logged_in);

        let state = reduce(&state, &AuthAction::ClearMessages.into_action()).state;
        assert!(state.auth_ui.error.is_none());
    }

    #[test]
    fn test_failed_logout_keeps_session() {
        let state = Arc::new(WorkspaceState::default());
        let success = AuthAction::LoginSucceeded { user: user(), is_admin: false }.into_action();
        let state = reduce(&state, &success).state;

        let state = reduce(&state, &AuthAction::LogoutStarted.into_action()).state;
        assert!(state.auth_ui.loading);
        assert_eq!(state.auth_ui.success.as_deref(), Some("Signed in as Ada"));

        let failed = Action::new(AuthAction::LOGOUT_FAILED).with("message", "provider offline");
        let state = reduce(&state, &failed).state;
        assert!(state.auth.is_logged_in);
        assert!(!state.auth_ui.loading);
        assert_eq!(state.auth_ui.error.as_deref(), Some("provider offline"));
    }

    #[test]
    fn test_malformed_user_is_ignored() {
        let state = Arc::new(WorkspaceState::default());
        let action = Action::new(AuthAction::LOGIN_SUCCEEDED).with("user", json!({"name": 3}));
        let next = reduce(&state, &action).state;
        assert!(Arc::ptr_eq(&state, &next));
    }
}
