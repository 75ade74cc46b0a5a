//! Error types for the Dockyard workspace engine.
//!
//! Reducers never fail; they clamp or no-op. Errors only surface from services
//! (storage, auth) and are turned into ordinary actions at the effect boundary.

use thiserror::Error;

/// Main error type for the workspace engine.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Persistence backend failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication provider rejected or failed a request.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
    },

    /// An action payload could not be decoded.
    #[error("Invalid payload for '{action_type}': {message}")]
    InvalidPayload {
        /// The action type that carried the payload.
        action_type: String,
        /// What was wrong with it.
        message: String,
    },

    /// An effect could not run to completion.
    #[error("Effect '{action_type}' failed: {message}")]
    Effect {
        /// The action type whose effect failed.
        action_type: String,
        /// Human-readable error message.
        message: String,
    },

    /// Configuration error.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },
}

impl WorkspaceError {
    // ========== Constructors ==========

    /// Create a new storage error.
    pub fn storage(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Storage { message: message.into(), hint: hint.map(String::from), source: None }
    }

    /// Create a new storage error with source.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage { message: message.into(), hint: None, source: Some(Box::new(source)) }
    }

    /// Create a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            hint: Some("Check username and password".to_string()),
        }
    }

    /// Create a new invalid payload error.
    pub fn invalid_payload(action_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload { action_type: action_type.into(), message: message.into() }
    }

    /// Create a new effect error.
    pub fn effect(action_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Effect { action_type: action_type.into(), message: message.into() }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    // ========== Methods ==========

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "Storage",
            Self::Authentication { .. } => "Authentication",
            Self::InvalidPayload { .. } => "Payload",
            Self::Effect { .. } => "Effect",
            Self::Config { .. } => "Config",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Storage { hint, .. } => hint.as_deref(),
            Self::Authentication { hint, .. } => hint.as_deref(),
            Self::InvalidPayload { .. } => None,
            Self::Effect { .. } => Some("Try the operation again"),
            Self::Config { .. } => Some("Check DOCKYARD_* environment variables"),
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::InvalidPayload { action_type, .. } | Self::Effect { action_type, .. } => {
                Some(format!("Action: {action_type}"))
            }
            Self::Storage { source: Some(source), .. } => Some(source.to_string()),
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Category name (e.g., "Storage Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail for "Show Details" expansion.
    pub technical_detail: Option<String>,
}

impl ErrorInfo {
    /// Single-line text suitable for a UI error field.
    pub fn display_text(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{} ({hint})", self.message),
            None => self.message.clone(),
        }
    }
}

// ========== Error Conversions ==========

/// Convert from rusqlite::Error to WorkspaceError.
impl From<rusqlite::Error> for WorkspaceError {
    fn from(err: rusqlite::Error) -> Self {
        WorkspaceError::Storage {
            message: err.to_string(),
            hint: Some("The local database may be corrupted".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from std::io::Error to WorkspaceError.
impl From<std::io::Error> for WorkspaceError {
    fn from(err: std::io::Error) -> Self {
        WorkspaceError::Storage {
            message: err.to_string(),
            hint: Some("Check file permissions and disk space".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from serde_json::Error to WorkspaceError.
impl From<serde_json::Error> for WorkspaceError {
    fn from(err: serde_json::Error) -> Self {
        WorkspaceError::Storage {
            message: format!("JSON error: {err}"),
            hint: Some("Saved layout may be corrupted".to_string()),
            source: Some(Box::new(err)),
        }
    }
}
