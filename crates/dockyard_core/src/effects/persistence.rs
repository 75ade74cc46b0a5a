//! Saving and restoring the workspace layout.

use std::sync::Arc;

use serde_json::Value;

use crate::error::WorkspaceError;
use crate::models::Action;
use crate::reducers::{LayoutAction, UiAction};
use crate::services::StorageProvider;
use crate::store::{EffectContext, EffectRegistry};

/// Persist the current layout snapshot.
pub const SAVE_LAYOUT: &str = "layout/save";
/// Restore the persisted layout snapshot.
pub const LOAD_LAYOUT: &str = "layout/load";

pub(crate) fn register(effects: &mut EffectRegistry, storage: Arc<dyn StorageProvider>) {
    let save = Arc::clone(&storage);
    effects.register(SAVE_LAYOUT, move |ctx, action| save_layout(&ctx, action, save.as_ref()));
    effects.register(LOAD_LAYOUT, move |ctx, action| load_layout(&ctx, action, storage.as_ref()));
}

fn save_layout(
    ctx: &EffectContext,
    action: &Action,
    storage: &dyn StorageProvider,
) -> Result<(), WorkspaceError> {
    let key = ctx.config().layout_storage_key.as_str();
    let snapshot = ctx.state().snapshot();
    let value = serde_json::to_value(&snapshot)?;

    storage.save(key, &value).map_err(|err| {
        tracing::warn!(action_type = %action, provider = storage.name(), error = %err, "Layout save failed");
        err
    })?;

    tracing::info!(
        key,
        provider = storage.name(),
        panels = snapshot.panels.len(),
        instances = snapshot.view_instances.len(),
        "Layout saved"
    );
    ctx.dispatch([UiAction::SetNotice("Layout saved".to_string()).into_action()]);
    Ok(())
}

fn load_layout(
    ctx: &EffectContext,
    action: &Action,
    storage: &dyn StorageProvider,
) -> Result<(), WorkspaceError> {
    let key = ctx.config().layout_storage_key.as_str();

    match storage.load(key)? {
        Some(Value::Object(patch)) => {
            tracing::info!(key, provider = storage.name(), "Layout loaded");
            ctx.dispatch([LayoutAction::Hydrate(patch).into_action()]);
            Ok(())
        }
        Some(other) => Err(WorkspaceError::effect(
            action.kind(),
            format!("saved layout under '{key}' is not an object (found {})", kind_of(&other)),
        )),
        None => {
            tracing::debug!(key, provider = storage.name(), "No saved layout");
            Ok(())
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
