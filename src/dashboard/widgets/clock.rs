use super::{edit_typed_settings, Widget, WidgetAction, WidgetSettingsContext, WidgetSettingsUiResult};
use crate::dashboard::dashboard::DashboardContext;
use chrono::{FixedOffset, Local, Utc};
use eframe::egui;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub use_24h: bool,
    #[serde(default = "default_true")]
    pub show_seconds: bool,
    #[serde(default)]
    pub show_date: bool,
    /// Fixed UTC offset in minutes; local time when absent.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            label: None,
            use_24h: true,
            show_seconds: true,
            show_date: false,
            utc_offset_minutes: None,
        }
    }
}

pub struct ClockWidget {
    cfg: ClockConfig,
}

impl ClockWidget {
    pub fn new(cfg: ClockConfig) -> Self {
        Self { cfg }
    }

    pub fn settings_ui(
        ui: &mut egui::Ui,
        value: &mut serde_json::Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> WidgetSettingsUiResult {
        edit_typed_settings(ui, value, ctx, |ui, cfg: &mut ClockConfig, _ctx| {
            let mut changed = false;
            let mut label = cfg.label.clone().unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label("Label");
                if ui.text_edit_singleline(&mut label).changed() {
                    cfg.label = if label.is_empty() { None } else { Some(label.clone()) };
                    changed = true;
                }
            });
            changed |= ui.checkbox(&mut cfg.use_24h, "24-hour format").changed();
            changed |= ui.checkbox(&mut cfg.show_seconds, "Show seconds").changed();
            changed |= ui.checkbox(&mut cfg.show_date, "Show date").changed();
            let mut fixed = cfg.utc_offset_minutes.is_some();
            if ui.checkbox(&mut fixed, "Fixed UTC offset").changed() {
                cfg.utc_offset_minutes = if fixed { Some(0) } else { None };
                changed = true;
            }
            if let Some(minutes) = &mut cfg.utc_offset_minutes {
                changed |= ui
                    .add(egui::DragValue::new(minutes).clamp_range(-720..=840).suffix(" min"))
                    .changed();
            }
            changed
        })
    }

    fn time_format(&self) -> &'static str {
        match (self.cfg.use_24h, self.cfg.show_seconds) {
            (true, true) => "%H:%M:%S",
            (true, false) => "%H:%M",
            (false, true) => "%I:%M:%S %p",
            (false, false) => "%I:%M %p",
        }
    }
}

impl Default for ClockWidget {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl Widget for ClockWidget {
    fn render(&mut self, ui: &mut egui::Ui, _ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        let format = self.time_format();
        // An out-of-range offset from a hand-edited config falls back to
        // local time.
        let offset = self
            .cfg
            .utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60));
        let (time, date) = match offset {
            Some(offset) => {
                let now = Utc::now().with_timezone(&offset);
                (
                    now.format(format).to_string(),
                    now.format("%A, %d %B %Y").to_string(),
                )
            }
            None => {
                let now = Local::now();
                (
                    now.format(format).to_string(),
                    now.format("%A, %d %B %Y").to_string(),
                )
            }
        };
        if let Some(label) = &self.cfg.label {
            ui.label(label);
        }
        ui.heading(time);
        if self.cfg.show_date {
            ui.label(date);
        }
        None
    }

    fn on_config_updated(&mut self, settings: &serde_json::Value) {
        if let Ok(cfg) = serde_json::from_value::<ClockConfig>(settings.clone()) {
            self.cfg = cfg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_format_follows_config() {
        let mut widget = ClockWidget::default();
        assert_eq!(widget.time_format(), "%H:%M:%S");
        widget.cfg.use_24h = false;
        widget.cfg.show_seconds = false;
        assert_eq!(widget.time_format(), "%I:%M %p");
    }
}
