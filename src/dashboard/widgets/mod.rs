use crate::dashboard::dashboard::DashboardContext;
use eframe::egui;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

mod clock;
mod missing;
mod rss_headlines;
mod service_health;
mod system_status;
mod weather;

pub use clock::ClockWidget;
pub use missing::MissingWidget;
pub use rss_headlines::RssHeadlinesWidget;
pub use service_health::ServiceHealthWidget;
pub use system_status::SystemStatusWidget;
pub use weather::WeatherWidget;

/// Result of interacting with a widget or its slot chrome.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetAction {
    OpenUrl(String),
    /// Indices refer to the slot's position in the dashboard config.
    RemoveSlot(usize),
    CopySlot(usize),
    EditSlot(usize),
}

/// Result of editing widget settings.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct WidgetSettingsUiResult {
    pub changed: bool,
    pub error: Option<String>,
}

/// Context available to widget settings UIs.
#[derive(Clone, Copy, Default)]
pub struct WidgetSettingsContext<'a> {
    pub default_location: Option<&'a str>,
}

impl<'a> WidgetSettingsContext<'a> {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Handler used to render widget settings.
pub type SettingsUiFn =
    fn(&mut egui::Ui, &mut Value, &WidgetSettingsContext<'_>) -> WidgetSettingsUiResult;

/// Widget trait implemented by all dashboard tiles.
pub trait Widget: Send {
    fn render(&mut self, ui: &mut egui::Ui, ctx: &DashboardContext<'_>) -> Option<WidgetAction>;

    fn on_config_updated(&mut self, _settings: &Value) {}

    fn header_ui(
        &mut self,
        _ui: &mut egui::Ui,
        _ctx: &DashboardContext<'_>,
    ) -> Option<WidgetAction> {
        None
    }
}

pub(crate) fn merge_json(base: &Value, updates: &Value) -> Value {
    match (base, updates) {
        (Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            for (k, v) in b {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => updates.clone(),
    }
}

/// Deserialize the slot settings, run a typed settings UI and write the
/// result back, preserving fields the UI does not know about.
pub(crate) fn edit_typed_settings<C: DeserializeOwned + Serialize + Default>(
    ui: &mut egui::Ui,
    value: &mut Value,
    ctx: &WidgetSettingsContext<'_>,
    render: impl FnOnce(&mut egui::Ui, &mut C, &WidgetSettingsContext<'_>) -> bool,
) -> WidgetSettingsUiResult {
    let mut changed = false;
    let mut error = None;
    if value.is_null() {
        *value = serde_json::to_value(C::default()).unwrap_or_else(|_| json!({}));
        changed = true;
    }

    let original = value.clone();
    let mut cfg: C = match serde_json::from_value(original.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error = Some(format!("Failed to parse settings: {e}"));
            C::default()
        }
    };

    changed |= render(ui, &mut cfg, ctx);
    let serialized = serde_json::to_value(&cfg).unwrap_or_else(|_| json!({}));

    let merged = merge_json(&original, &serialized);
    if merged != *value {
        *value = merged;
        changed = true;
    }

    WidgetSettingsUiResult { changed, error }
}

/// Inline failure card with a retry affordance. Returns true when the user
/// asked to retry.
pub(crate) fn error_card(ui: &mut egui::Ui, message: &str) -> bool {
    let mut retry = false;
    ui.colored_label(ui.visuals().error_fg_color, message);
    if ui.small_button("Retry").clicked() {
        retry = true;
    }
    retry
}

pub(crate) fn refresh_interval_setting(
    ui: &mut egui::Ui,
    seconds: &mut f32,
    tooltip: &str,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label("Refresh every");
        let resp = ui
            .add(
                egui::DragValue::new(seconds)
                    .clamp_range(5.0..=3600.0)
                    .speed(1.0),
            )
            .on_hover_text(tooltip);
        changed |= resp.changed();
        ui.label("seconds");
    });
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_json_preserves_unknown_fields() {
        let base = json!({"known": 1, "extra": {"keep": true}});
        let updates = json!({"known": 2});
        let merged = merge_json(&base, &updates);
        assert_eq!(merged["known"], json!(2));
        assert_eq!(merged["extra"], json!({"keep": true}));
    }
}
