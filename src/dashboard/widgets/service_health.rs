use super::{
    edit_typed_settings, error_card, refresh_interval_setting, Widget, WidgetAction,
    WidgetSettingsContext, WidgetSettingsUiResult,
};
use crate::api::ApiClient;
use crate::dashboard::dashboard::DashboardContext;
use crate::net::{FetchState, FreshCell};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_refresh_interval() -> f32 {
    60.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealthConfig {
    /// Hostnames or addresses checked through the backend ping proxy.
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: f32,
}

impl Default for ServiceHealthConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct PingReply {
    reachable: bool,
    #[serde(default)]
    latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetHealth {
    pub target: String,
    pub reachable: bool,
    pub latency_ms: Option<f64>,
}

pub struct ServiceHealthWidget {
    cfg: ServiceHealthConfig,
    health: FreshCell<Vec<TargetHealth>>,
    refresh_pending: bool,
    last_started: Instant,
}

impl ServiceHealthWidget {
    pub fn new(cfg: ServiceHealthConfig) -> Self {
        let interval = Duration::from_secs_f32(cfg.refresh_interval_secs.max(5.0));
        Self {
            cfg,
            health: FreshCell::new(),
            refresh_pending: false,
            last_started: Instant::now() - interval,
        }
    }

    pub fn settings_ui(
        ui: &mut egui::Ui,
        value: &mut serde_json::Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> WidgetSettingsUiResult {
        edit_typed_settings(ui, value, ctx, |ui, cfg: &mut ServiceHealthConfig, _ctx| {
            let mut changed = false;
            let mut targets = cfg.targets.join("\n");
            ui.label("Targets (one per line)");
            if ui.text_edit_multiline(&mut targets).changed() {
                cfg.targets = targets
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                changed = true;
            }
            changed |= refresh_interval_setting(
                ui,
                &mut cfg.refresh_interval_secs,
                "Reachability is cached between refreshes.",
            );
            changed
        })
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f32(self.cfg.refresh_interval_secs.max(5.0))
    }

    fn check_targets(api: &ApiClient, targets: &[String]) -> Vec<TargetHealth> {
        targets
            .iter()
            .map(|target| match api.get_json::<PingReply>(&format!("ping/{target}")) {
                Ok(reply) => TargetHealth {
                    target: target.clone(),
                    reachable: reply.reachable,
                    latency_ms: reply.latency_ms,
                },
                // An unreachable proxy reads the same as a down target.
                Err(_) => TargetHealth {
                    target: target.clone(),
                    reachable: false,
                    latency_ms: None,
                },
            })
            .collect()
    }

    fn start_fetch(&mut self, ctx: &DashboardContext<'_>) {
        let api = Arc::clone(ctx.api);
        let targets = self.cfg.targets.clone();
        self.last_started = Instant::now();
        self.health
            .spawn(move || Ok(Self::check_targets(&api, &targets)));
    }
}

impl Default for ServiceHealthWidget {
    fn default() -> Self {
        Self::new(ServiceHealthConfig::default())
    }
}

impl Widget for ServiceHealthWidget {
    fn render(&mut self, ui: &mut egui::Ui, ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        if self.cfg.targets.is_empty() {
            ui.label("No targets configured.");
            return None;
        }

        let due = self.last_started.elapsed() >= self.refresh_interval();
        let pending = matches!(self.health.state(), FetchState::Pending);
        if (due || self.refresh_pending) && !pending {
            self.refresh_pending = false;
            self.start_fetch(ctx);
        }

        match self.health.state() {
            FetchState::Idle | FetchState::Pending => {
                ui.label("Checking targets…");
            }
            FetchState::Failed(err) => {
                if error_card(ui, &format!("Health check failed: {err}")) {
                    self.refresh_pending = true;
                }
            }
            FetchState::Ready(results) => {
                let up = results.iter().filter(|r| r.reachable).count();
                ui.label(format!("{up}/{} reachable", results.len()));
                ui.separator();
                for result in &results {
                    let (mark, color) = if result.reachable {
                        ("●", egui::Color32::from_rgb(0x3f, 0xb9, 0x50))
                    } else {
                        ("●", ui.visuals().error_fg_color)
                    };
                    ui.horizontal(|ui| {
                        ui.colored_label(color, mark);
                        ui.label(&result.target);
                        if let Some(latency) = result.latency_ms {
                            ui.weak(format!("{latency:.0} ms"));
                        }
                    });
                }
            }
        }
        None
    }

    fn on_config_updated(&mut self, settings: &serde_json::Value) {
        if let Ok(cfg) = serde_json::from_value::<ServiceHealthConfig>(settings.clone()) {
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
