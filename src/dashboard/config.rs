use crate::dashboard::registry::WidgetRegistry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

fn default_id() -> String {
    "default".into()
}

fn default_name() -> String {
    "Dashboard".into()
}

fn default_rows() -> u8 {
    3
}

fn default_cols() -> u8 {
    3
}

fn default_span() -> u8 {
    1
}

/// Grid definition for the dashboard layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: u8,
    #[serde(default = "default_cols")]
    pub cols: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
        }
    }
}

/// Widget slot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub widget: String,
    pub row: i32,
    pub col: i32,
    #[serde(default = "default_span")]
    pub row_span: u8,
    #[serde(default = "default_span")]
    pub col_span: u8,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl SlotConfig {
    pub fn with_widget(widget: &str, row: i32, col: i32) -> Self {
        Self {
            id: None,
            widget: widget.to_string(),
            row,
            col,
            row_span: default_span(),
            col_span: default_span(),
            settings: serde_json::Value::Object(Default::default()),
        }
    }

    /// Stable label used by events and headers.
    pub fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.widget.clone())
    }
}

/// A named, versioned collection of widget slots. The version is bumped on
/// every save and is what staleness detection compares against the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            name: default_name(),
            version: 0,
            grid: GridConfig::default(),
            slots: vec![
                SlotConfig::with_widget("clock", 0, 0),
                SlotConfig::with_widget("weather", 0, 1),
                SlotConfig::with_widget("rss_headlines", 0, 2),
                SlotConfig::with_widget("service_health", 1, 0),
                SlotConfig::with_widget("system_status", 1, 1),
            ],
        }
    }
}

impl DashboardConfig {
    /// Load a configuration from disk. Slots naming unknown widget types
    /// are dropped; the widget types that remain are loaded into the
    /// registry and null settings replaced by descriptor defaults.
    pub fn load(path: impl AsRef<Path>, registry: &mut WidgetRegistry) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).unwrap_or_default();
        let mut cfg: DashboardConfig = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(&content)?
        };
        let warnings = cfg.sanitize(registry);
        for w in warnings {
            tracing::warn!("{w}");
        }
        Ok(cfg)
    }

    /// Save the configuration to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Drop nameless slots, load the named widget types and normalize empty
    /// settings. Unknown widget types are kept and flagged; they render as
    /// placeholders rather than being stripped from the user's config.
    pub fn sanitize(&mut self, registry: &mut WidgetRegistry) -> Vec<String> {
        let mut warnings = Vec::new();
        self.slots.retain(|slot| !slot.widget.is_empty());
        for slot in &self.slots {
            if !registry.contains(&slot.widget) {
                tracing::warn!(widget = %slot.widget, "unknown dashboard widget");
                warnings.push(format!(
                    "unknown dashboard widget '{}' will render as a placeholder",
                    slot.widget
                ));
            }
        }
        let known: Vec<&str> = self
            .slots
            .iter()
            .map(|s| s.widget.as_str())
            .filter(|w| registry.contains(w))
            .collect();
        registry.load_many(known);
        for slot in &mut self.slots {
            if slot.settings.is_null() {
                slot.settings = registry
                    .default_settings(&slot.widget)
                    .unwrap_or_else(|| json!({}));
            }
        }
        warnings
    }

    pub fn path_for(base: &str) -> PathBuf {
        let base = Path::new(base);
        if base.is_dir() {
            base.join("dashboard.json")
        } else {
            PathBuf::from(base)
        }
    }
}
