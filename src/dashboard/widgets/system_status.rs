use super::{
    edit_typed_settings, refresh_interval_setting, Widget, WidgetAction, WidgetSettingsContext,
    WidgetSettingsUiResult,
};
use crate::dashboard::dashboard::DashboardContext;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use sysinfo::System;

fn default_refresh_interval() -> f32 {
    5.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatusConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: f32,
    #[serde(default = "default_true")]
    pub show_cpu: bool,
    #[serde(default = "default_true")]
    pub show_memory: bool,
}

impl Default for SystemStatusConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            show_cpu: true,
            show_memory: true,
        }
    }
}

/// Local machine stats; the one widget that does not go through the
/// backend proxy.
pub struct SystemStatusWidget {
    cfg: SystemStatusConfig,
    system: System,
    last_refresh: Instant,
    refresh_pending: bool,
}

impl SystemStatusWidget {
    pub fn new(cfg: SystemStatusConfig) -> Self {
        let interval = Duration::from_secs_f32(cfg.refresh_interval_secs.max(1.0));
        Self {
            cfg,
            system: System::new(),
            last_refresh: Instant::now() - interval,
            refresh_pending: false,
        }
    }

    pub fn settings_ui(
        ui: &mut egui::Ui,
        value: &mut serde_json::Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> WidgetSettingsUiResult {
        edit_typed_settings(ui, value, ctx, |ui, cfg: &mut SystemStatusConfig, _ctx| {
            let mut changed = false;
            changed |= refresh_interval_setting(
                ui,
                &mut cfg.refresh_interval_secs,
                "System stats are sampled between refreshes.",
            );
            ui.separator();
            ui.label("Show");
            changed |= ui.checkbox(&mut cfg.show_cpu, "CPU usage").changed();
            changed |= ui.checkbox(&mut cfg.show_memory, "Memory usage").changed();
            changed
        })
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f32(self.cfg.refresh_interval_secs.max(1.0))
    }

    fn mem_percent(&self) -> f64 {
        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.system.used_memory() as f64 / total as f64 * 100.0
    }
}

impl Default for SystemStatusWidget {
    fn default() -> Self {
        Self::new(SystemStatusConfig::default())
    }
}

impl Widget for SystemStatusWidget {
    fn render(&mut self, ui: &mut egui::Ui, _ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        if self.refresh_pending || self.last_refresh.elapsed() >= self.refresh_interval() {
            self.refresh_pending = false;
            self.system.refresh_cpu_usage();
            self.system.refresh_memory();
            self.last_refresh = Instant::now();
        }

        if self.cfg.show_cpu {
            ui.label(format!("CPU: {:.0}%", self.system.global_cpu_usage()));
        }
        if self.cfg.show_memory {
            ui.label(format!("Mem: {:.0}%", self.mem_percent()));
        }
        None
    }

    fn on_config_updated(&mut self, settings: &serde_json::Value) {
        if let Ok(cfg) = serde_json::from_value::<SystemStatusConfig>(settings.clone()) {
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
