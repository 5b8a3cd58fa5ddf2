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
    900.0
}

fn default_max_items() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssHeadlinesConfig {
    #[serde(default)]
    pub feed_url: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: f32,
}

impl Default for RssHeadlinesConfig {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            max_items: default_max_items(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// One feed entry as returned by the backend feed proxy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

pub struct RssHeadlinesWidget {
    cfg: RssHeadlinesConfig,
    items: FreshCell<Vec<Headline>>,
    refresh_pending: bool,
    last_started: Instant,
}

impl RssHeadlinesWidget {
    pub fn new(cfg: RssHeadlinesConfig) -> Self {
        let interval = Duration::from_secs_f32(cfg.refresh_interval_secs.max(5.0));
        Self {
            cfg,
            items: FreshCell::new(),
            refresh_pending: false,
            last_started: Instant::now() - interval,
        }
    }

    pub fn settings_ui(
        ui: &mut egui::Ui,
        value: &mut serde_json::Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> WidgetSettingsUiResult {
        edit_typed_settings(ui, value, ctx, |ui, cfg: &mut RssHeadlinesConfig, _ctx| {
            let mut changed = false;
            ui.horizontal(|ui| {
                ui.label("Feed URL");
                changed |= ui.text_edit_singleline(&mut cfg.feed_url).changed();
            });
            ui.horizontal(|ui| {
                ui.label("Show at most");
                changed |= ui
                    .add(egui::DragValue::new(&mut cfg.max_items).clamp_range(1..=50))
                    .changed();
                ui.label("items");
            });
            changed |= refresh_interval_setting(
                ui,
                &mut cfg.refresh_interval_secs,
                "Headlines are cached between refreshes.",
            );
            changed
        })
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f32(self.cfg.refresh_interval_secs.max(5.0))
    }

    fn start_fetch(&mut self, ctx: &DashboardContext<'_>) {
        let api = Arc::clone(ctx.api);
        let feed_url = self.cfg.feed_url.clone();
        let limit = self.cfg.max_items.to_string();
        self.last_started = Instant::now();
        self.items.spawn(move || {
            api.get_json_query::<Vec<Headline>>(
                "api/rss",
                &[("url", feed_url.as_str()), ("limit", limit.as_str())],
            )
            .map_err(|err| err.to_string())
        });
    }
}

impl Default for RssHeadlinesWidget {
    fn default() -> Self {
        Self::new(RssHeadlinesConfig::default())
    }
}

impl Widget for RssHeadlinesWidget {
    fn render(&mut self, ui: &mut egui::Ui, ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        if self.cfg.feed_url.is_empty() {
            ui.label("No feed configured.");
            return None;
        }

        let due = self.last_started.elapsed() >= self.refresh_interval();
        let pending = matches!(self.items.state(), FetchState::Pending);
        if (due || self.refresh_pending) && !pending {
            self.refresh_pending = false;
            self.start_fetch(ctx);
        }

        let mut action = None;
        match self.items.state() {
            FetchState::Idle | FetchState::Pending => {
                ui.label("Fetching headlines…");
            }
            FetchState::Failed(err) => {
                if error_card(ui, &format!("Feed unavailable: {err}")) {
                    self.refresh_pending = true;
                }
            }
            FetchState::Ready(items) => {
                if items.is_empty() {
                    ui.label("Feed has no items.");
                }
                for item in items.iter().take(self.cfg.max_items) {
                    match &item.link {
                        Some(link) => {
                            if ui.link(&item.title).clicked() {
                                action = Some(WidgetAction::OpenUrl(link.clone()));
                            }
                        }
                        None => {
                            ui.label(&item.title);
                        }
                    }
                    if let Some(published) = item.published {
                        ui.weak(published.format("%d %b %H:%M").to_string());
                    }
                }
            }
        }
        action
    }

    fn on_config_updated(&mut self, settings: &serde_json::Value) {
        if let Ok(cfg) = serde_json::from_value::<RssHeadlinesConfig>(settings.clone()) {
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
