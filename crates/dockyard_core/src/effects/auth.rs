//! Login and logout against the configured [`AuthProvider`].
//!
//! Both share one effect key, so a newer request supersedes any request still
//! in flight and the older completion is dropped.

use std::sync::Arc;

use crate::error::WorkspaceError;
use crate::models::Action;
use crate::reducers::AuthAction;
use crate::services::AuthProvider;
use crate::store::{EffectContext, EffectRegistry};

/// Generation key shared by login and logout.
pub const SESSION_KEY: &str = "auth/session";

pub(crate) fn register(effects: &mut EffectRegistry, provider: Arc<dyn AuthProvider>) {
    let login_provider = Arc::clone(&provider);
    effects.register(AuthAction::LOGIN, move |ctx, action| {
        login(&ctx, action, Arc::clone(&login_provider))
    });
    effects.register(AuthAction::LOGOUT, move |ctx, action| {
        logout(&ctx, action, Arc::clone(&provider))
    });
}

fn login(
    ctx: &EffectContext,
    action: &Action,
    provider: Arc<dyn AuthProvider>,
) -> Result<(), WorkspaceError> {
    let AuthAction::Login { username, password } = AuthAction::parse(action)? else {
        return Ok(());
    };

    let ticket = ctx.begin(SESSION_KEY);
    ctx.dispatch([AuthAction::LoginStarted.into_action()]);
    tracing::debug!(
        provider = provider.name(),
        generation = ticket.generation(),
        "Login requested"
    );

    let started = ctx.spawn(action.kind(), async move {
        let outcome = tokio::select! {
            _ = ticket.cancelled() => {
                tracing::debug!(generation = ticket.generation(), "Login superseded");
                return Ok(());
            }
            outcome = provider.login(&username, &password) => outcome,
        };

        let result = match outcome {
            Ok(session) => {
                tracing::info!(user = %session.user.id, elapsed_ms = ticket.elapsed_ms(), "Login succeeded");
                AuthAction::LoginSucceeded { user: session.user, is_admin: session.is_admin }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Login failed");
                AuthAction::LoginFailed { message: err.to_error_info().display_text() }
            }
        };
        ticket.complete([result.into_action()]);
        Ok(())
    });

    if !started {
        ctx.dispatch([AuthAction::LoginFailed {
            message: "Sign-in is unavailable right now".to_string(),
        }
        .into_action()]);
    }
    Ok(())
}

fn logout(
    ctx: &EffectContext,
    action: &Action,
    provider: Arc<dyn AuthProvider>,
) -> Result<(), WorkspaceError> {
    let ticket = ctx.begin(SESSION_KEY);
    ctx.dispatch([AuthAction::LogoutStarted.into_action()]);

    let started = ctx.spawn(action.kind(), async move {
        let result = match provider.logout().await {
            Ok(()) => AuthAction::LoggedOut,
            Err(err) => {
                tracing::warn!(error = %err, "Logout failed");
                AuthAction::LogoutFailed { message: err.to_error_info().display_text() }
            }
        };
        ticket.complete([result.into_action()]);
        Ok(())
    });

    if !started {
        ctx.dispatch([AuthAction::LoggedOut.into_action()]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::models::AuthUser;
    use crate::reducers::builtin_handlers;
    use crate::registry::StaticViewRegistry;
    use crate::services::StaticAuthProvider;
    use crate::store::Store;
    use std::time::Duration;

    fn store() -> Store {
        let provider = StaticAuthProvider::new()
            .with_account(
                "ada",
                "lovelace",
                AuthUser { id: "u1".into(), name: "Ada".into(), email: None },
                true,
            )
            .with_account(
                "slow",
                "pw",
                AuthUser { id: "u2".into(), name: "Slow".into(), email: None },
                false,
            )
            .with_delay("slow", Duration::from_millis(200));
        let mut effects = EffectRegistry::new();
        register(&mut effects, Arc::new(provider));
        Store::new(StoreConfig::default())
            .with_handlers(builtin_handlers(Arc::new(StaticViewRegistry::default())))
            .with_effects(effects)
    }

    fn login_action(username: &str, password: &str) -> Action {
        AuthAction::Login { username: username.into(), password: password.into() }.into_action()
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut store = store();
        store.dispatch_one(login_action("ada", "lovelace"));
        assert!(store.state().auth_ui.loading);

        store.process_next().await;
        let state = store.state();
        assert!(state.auth.is_logged_in);
        assert!(state.auth.is_admin);
        assert!(!state.auth_ui.loading);
    }

    #[tokio::test]
    async fn test_wrong_password_sets_error() {
        let mut store = store();
        store.dispatch_one(login_action("ada", "nope"));
        store.process_next().await;
        let state = store.state();
        assert!(!state.auth.is_logged_in);
        assert!(state.auth_ui.error.as_deref().unwrap_or_default().contains("Invalid password"));
    }

    #[tokio::test]
    async fn test_superseded_login_is_dropped() {
        let mut store = store();
        store.dispatch([login_action("slow", "pw"), login_action("ada", "lovelace")]);
        store.process_next().await;
        assert_eq!(store.state().auth.user.as_ref().map(|u| u.id.as_str()), Some("u1"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        store.drain_pending();
        assert_eq!(store.state().auth.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let mut store = store();
        store.dispatch_one(login_action("ada", "lovelace"));
        store.process_next().await;
        store.dispatch_one(AuthAction::Logout.into_action());
        let pending = store.state();
        assert!(pending.auth_ui.loading);
        assert!(pending.auth.is_logged_in);
        assert_eq!(pending.auth_ui.success.as_deref(), Some("Signed in as Ada"));

        store.process_next().await;
        let state = store.state();
        assert!(!state.auth.is_logged_in);
        assert_eq!(state.auth_ui.success.as_deref(), Some("Signed out"));
    }

    #[test]
    fn test_missing_username_becomes_ui_error() {
        let mut store = store();
        store.dispatch_one(Action::new(AuthAction::LOGIN));
        assert!(store.state().ui.error.is_some());
        assert!(!store.state().auth_ui.loading);
    }

    #[test]
    fn test_login_without_runtime_fails_fast() {
        let mut store = store();
        store.dispatch_one(login_action("ada", "lovelace"));
        let state = store.state();
        assert!(!state.auth_ui.loading);
        assert!(state.auth_ui.error.is_some());
    }
}
