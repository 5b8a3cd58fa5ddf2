use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Authenticated user as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// The two persisted session keys, kept together in one file so they can
/// only ever be written and cleared as a pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PersistedSession {
    auth_token: String,
    auth_user: User,
}

/// File-backed token and user cache.
///
/// A malformed session file is treated as "no session": the file is removed
/// and the user is silently logged out.
pub struct SessionStore {
    path: PathBuf,
    state: Mutex<Option<PersistedSession>>,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::load_from(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    fn load_from(path: &Path) -> Option<PersistedSession> {
        let content = std::fs::read_to_string(path).ok()?;
        if content.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!("discarding malformed session file: {err}");
                let _ = std::fs::remove_file(path);
                None
            }
        }
    }

    pub fn save(&self, token: &str, user: &User) -> anyhow::Result<()> {
        let session = PersistedSession {
            auth_token: token.to_string(),
            auth_user: user.clone(),
        };
        let json = serde_json::to_string_pretty(&session)?;
        std::fs::write(&self.path, json)?;
        if let Ok(mut state) = self.state.lock() {
            *state = Some(session);
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.auth_token.clone()))
    }

    pub fn user(&self) -> Option<User> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.auth_user.clone()))
    }

    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// Drop the cached session and remove the file. Both keys go together.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = None;
        }
        let _ = std::fs::remove_file(&self.path);
    }
}
