use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_backend_url() -> String {
    "http://127.0.0.1:7700".into()
}

fn default_poll_interval() -> f32 {
    15.0
}

/// Application-level settings stored next to the dashboard config.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Base URL of the companion backend used for auth, credential storage
    /// and the per-integration proxy endpoints.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Interval in seconds between dashboard version polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f32,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Fallback location for widgets that want one (e.g. weather).
    #[serde(default)]
    pub default_location: Option<String>,
    /// Override for the dashboard config file path.
    #[serde(default)]
    pub dashboard_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_secs: default_poll_interval(),
            debug_logging: false,
            default_location: None,
            dashboard_path: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(self.poll_interval_secs.max(1.0))
    }
}

static CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs_next::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tileboard")
});

/// Directory holding settings, session and dashboard files. Resolved once
/// so every service sees the same location for the process lifetime.
pub fn config_dir() -> PathBuf {
    CONFIG_DIR.clone()
}
