//! Store configuration.
//!
//! Defaults are tuned per build type; `StoreConfig::from_env` lets hosts flip
//! the dev-mode validator or the per-cycle action guard without recompiling.

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;

/// Environment variable toggling the transition validator (`1`/`true`/`0`/`false`).
pub const VALIDATE_ENV: &str = "DOCKYARD_VALIDATE";

/// Environment variable overriding `max_actions_per_cycle`.
pub const MAX_ACTIONS_ENV: &str = "DOCKYARD_MAX_ACTIONS";

/// Storage key used for the persisted layout when none is configured.
pub const DEFAULT_LAYOUT_KEY: &str = "workspace_layout";

/// Runtime configuration for a [`crate::store::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Run the structural validator after each transition and reject violations.
    pub validate_transitions: bool,
    /// Upper bound on actions processed in one dispatch cycle (follow-up loop guard).
    pub max_actions_per_cycle: usize,
    /// Key under which the layout snapshot is saved and loaded.
    pub layout_storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            validate_transitions: cfg!(debug_assertions),
            max_actions_per_cycle: 10_000,
            layout_storage_key: DEFAULT_LAYOUT_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Result<Self, WorkspaceError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(VALIDATE_ENV) {
            config.validate_transitions = parse_flag(&raw).ok_or_else(|| {
                WorkspaceError::config(format!("{VALIDATE_ENV} must be a boolean, got '{raw}'"))
            })?;
        }

        if let Ok(raw) = std::env::var(MAX_ACTIONS_ENV) {
            let max = raw.trim().parse::<usize>().map_err(|e| {
                WorkspaceError::config(format!("{MAX_ACTIONS_ENV} must be a number: {e}"))
            })?;
            if max == 0 {
                return Err(WorkspaceError::config(format!("{MAX_ACTIONS_ENV} must be > 0")));
            }
            config.max_actions_per_cycle = max;
        }

        Ok(config)
    }

    /// Enable or disable the transition validator.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_transitions = enabled;
        self
    }

    /// Set the per-cycle action limit.
    pub fn with_max_actions(mut self, max: usize) -> Self {
        self.max_actions_per_cycle = max.max(1);
        self
    }

    /// Set the layout storage key.
    pub fn with_layout_key(mut self, key: impl Into<String>) -> Self {
        self.layout_storage_key = key.into();
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"maxActionsPerCycle": 5}"#).unwrap();
        assert_eq!(config.max_actions_per_cycle, 5);
        assert_eq!(config.layout_storage_key, DEFAULT_LAYOUT_KEY);
    }
}
