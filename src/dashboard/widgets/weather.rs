use super::{
    edit_typed_settings, error_card, refresh_interval_setting, Widget, WidgetAction,
    WidgetSettingsContext, WidgetSettingsUiResult,
};
use crate::dashboard::dashboard::DashboardContext;
use crate::net::{FetchState, FreshCell};
use chrono::{DateTime, Utc};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_refresh_interval() -> f32 {
    300.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub units: Units,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            location: None,
            units: Units::Metric,
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// Current conditions as returned by the backend weather proxy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub temperature: f64,
    pub condition: String,
    #[serde(default)]
    pub humidity_percent: Option<u8>,
    #[serde(default)]
    pub wind_kph: Option<f64>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

pub struct WeatherWidget {
    cfg: WeatherConfig,
    report: FreshCell<WeatherReport>,
    refresh_pending: bool,
    last_started: Instant,
}

impl WeatherWidget {
    pub fn new(cfg: WeatherConfig) -> Self {
        let interval = Duration::from_secs_f32(cfg.refresh_interval_secs.max(5.0));
        Self {
            cfg,
            report: FreshCell::new(),
            refresh_pending: false,
            last_started: Instant::now() - interval,
        }
    }

    pub fn settings_ui(
        ui: &mut egui::Ui,
        value: &mut serde_json::Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> WidgetSettingsUiResult {
        edit_typed_settings(ui, value, ctx, |ui, cfg: &mut WeatherConfig, ctx| {
            let mut changed = false;
            let mut location = cfg.location.clone().unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label("Location");
                let hint = ctx.default_location.unwrap_or("e.g. Berlin");
                if ui
                    .add(egui::TextEdit::singleline(&mut location).hint_text(hint))
                    .changed()
                {
                    cfg.location = if location.is_empty() {
                        None
                    } else {
                        Some(location.clone())
                    };
                    changed = true;
                }
            });
            ui.horizontal(|ui| {
                ui.label("Units");
                changed |= ui
                    .selectable_value(&mut cfg.units, Units::Metric, "Metric")
                    .changed();
                changed |= ui
                    .selectable_value(&mut cfg.units, Units::Imperial, "Imperial")
                    .changed();
            });
            changed |= refresh_interval_setting(
                ui,
                &mut cfg.refresh_interval_secs,
                "Conditions are cached between refreshes.",
            );
            changed
        })
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f32(self.cfg.refresh_interval_secs.max(5.0))
    }

    fn effective_location<'a>(&'a self, ctx: &'a DashboardContext<'_>) -> Option<&'a str> {
        self.cfg.location.as_deref().or(ctx.default_location)
    }

    fn start_fetch(&mut self, ctx: &DashboardContext<'_>, location: &str) {
        let api = Arc::clone(ctx.api);
        let location = location.to_string();
        let units = self.cfg.units;
        self.last_started = Instant::now();
        self.report.spawn(move || {
            api.get_json_query::<WeatherReport>(
                "api/weather",
                &[("location", location.as_str()), ("units", units.as_str())],
            )
            .map_err(|err| err.to_string())
        });
    }
}

impl Default for WeatherWidget {
    fn default() -> Self {
        Self::new(WeatherConfig::default())
    }
}

impl Widget for WeatherWidget {
    fn render(&mut self, ui: &mut egui::Ui, ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        let Some(location) = self.effective_location(ctx).map(|l| l.to_string()) else {
            ui.label("No location configured.");
            return None;
        };

        let due = self.last_started.elapsed() >= self.refresh_interval();
        let pending = matches!(self.report.state(), FetchState::Pending);
        if (due || self.refresh_pending) && !pending {
            self.refresh_pending = false;
            self.start_fetch(ctx, &location);
        }

        ui.label(&location);
        match self.report.state() {
            FetchState::Idle | FetchState::Pending => {
                ui.label("Fetching weather…");
            }
            FetchState::Failed(err) => {
                if error_card(ui, &format!("Weather unavailable: {err}")) {
                    self.refresh_pending = true;
                }
            }
            FetchState::Ready(report) => {
                ui.heading(format!(
                    "{:.0}{}",
                    report.temperature,
                    self.cfg.units.temperature_suffix()
                ));
                ui.label(&report.condition);
                if let Some(humidity) = report.humidity_percent {
                    ui.label(format!("Humidity: {humidity}%"));
                }
                if let Some(wind) = report.wind_kph {
                    ui.label(format!("Wind: {wind:.0} km/h"));
                }
                if let Some(observed) = report.observed_at {
                    ui.weak(format!("as of {}", observed.format("%H:%M")));
                }
            }
        }
        None
    }

    fn on_config_updated(&mut self, settings: &serde_json::Value) {
        if let Ok(cfg) = serde_json::from_value::<WeatherConfig>(settings.clone()) {
            self.cfg = cfg;
            self.refresh_pending = true;
        }
    }

    fn header_ui(
        &mut self,
        ui: &mut egui::Ui,
        _ctx: &DashboardContext<'_>,
    ) -> Option<WidgetAction> {
        if ui.small_button("Refresh").clicked() {
            self.refresh_pending = true;
        }
        None
    }
}
