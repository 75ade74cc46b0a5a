//! Authentication provider contract.
//!
//! The engine never talks to an identity backend directly. Hosts plug one in
//! behind [`AuthProvider`]; the `auth/login` and `auth/logout` effects drive it.

use crate::error::WorkspaceError;
use crate::models::AuthUser;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// An accepted login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// The signed-in user.
    pub user: AuthUser,
    /// Whether the session has admin rights.
    pub is_admin: bool,
}

/// Pluggable identity backend.
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session.
    fn login(&self, username: &str, password: &str)
        -> BoxFuture<'static, Result<AuthSession, WorkspaceError>>;

    /// End the current session.
    fn logout(&self) -> BoxFuture<'static, Result<(), WorkspaceError>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    session: AuthSession,
    delay: Option<Duration>,
}

/// Fixed set of accounts held in memory.
///
/// Used by tests and the demo host. A per-account delay makes responses
/// arrive out of order.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
}

impl StaticAuthProvider {
    /// Create a provider with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account.
    pub fn with_account(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
        user: AuthUser,
        is_admin: bool,
    ) -> Self {
        self.accounts.write().insert(
            username.into(),
            Account {
                password: password.into(),
                session: AuthSession { user, is_admin },
                delay: None,
            },
        );
        self
    }

    /// Make logins for `username` take at least `delay`.
    pub fn with_delay(self, username: &str, delay: Duration) -> Self {
        if let Some(account) = self.accounts.write().get_mut(username) {
            account.delay = Some(delay);
        }
        self
    }
}

impl AuthProvider for StaticAuthProvider {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> BoxFuture<'static, Result<AuthSession, WorkspaceError>> {
        let account = self.accounts.read().get(username).cloned();
        let password = password.to_string();

        async move {
            let Some(account) = account else {
                return Err(WorkspaceError::authentication("Unknown user"));
            };
            if let Some(delay) = account.delay {
                tokio::time::sleep(delay).await;
            }
            if account.password != password {
                return Err(WorkspaceError::authentication("Invalid password"));
            }
            Ok(account.session)
        }
        .boxed()
    }

    fn logout(&self) -> BoxFuture<'static, Result<(), WorkspaceError>> {
        async { Ok(()) }.boxed()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
