use crate::api::client::ApiClient;
use crate::session::{SessionStore, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: User,
}

/// Tagged result handed to the login form. Network and credential failures
/// both land here; nothing is thrown at the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub user: Option<User>,
}

impl AuthOutcome {
    fn ok(user: User) -> Self {
        Self {
            success: true,
            error: None,
            user: Some(user),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            user: None,
        }
    }
}

/// Thin wrapper over the `/auth/*` endpoints plus the local session cache.
pub struct AuthService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    pub fn login(&self, username: &str, password: &str) -> AuthOutcome {
        let body = LoginRequest { username, password };
        match self.api.post_json::<_, LoginResponse>("auth/login", &body) {
            Ok(resp) => {
                if let Err(err) = self.session.save(&resp.token, &resp.user) {
                    tracing::warn!("failed to persist session: {err}");
                }
                AuthOutcome::ok(resp.user)
            }
            Err(err) => AuthOutcome::failed(err.to_string()),
        }
    }

    /// Clears the local session; the backend notification is best effort.
    pub fn logout(&self) {
        if let Err(err) = self
            .api
            .post_json::<_, serde_json::Value>("auth/logout", &serde_json::json!({}))
        {
            tracing::debug!("logout notification failed: {err}");
        }
        self.session.clear();
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_active()
    }
}
