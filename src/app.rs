use crate::api::{ApiClient, DashboardApi};
use crate::dashboard::widgets::{WidgetAction, WidgetSettingsContext};
use crate::dashboard::{Dashboard, DashboardContext};
use crate::session::SessionStore;
use crate::settings::Settings;
use crate::sync::SyncService;
use eframe::egui;
use std::sync::Arc;
use std::time::Duration;

/// Open widget settings dialog, editing a draft until saved.
struct SlotEditor {
    index: usize,
    widget: String,
    draft: serde_json::Value,
}

pub struct DashApp {
    settings: Settings,
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    sync: Arc<SyncService>,
    dashboards: Arc<DashboardApi>,
    dashboard: Dashboard,
    slot_editor: Option<SlotEditor>,
}

impl DashApp {
    pub fn new(
        settings: Settings,
        api: Arc<ApiClient>,
        session: Arc<SessionStore>,
        sync: Arc<SyncService>,
        dashboards: Arc<DashboardApi>,
        dashboard: Dashboard,
    ) -> Self {
        sync.set_current_dashboard(&dashboard.config.id, Some(dashboard.config.version));
        dashboard
            .events()
            .subscribe(|event| tracing::debug!(?event, "dashboard event"));
        Self {
            settings,
            api,
            session,
            sync,
            dashboards,
            dashboard,
            slot_editor: None,
        }
    }

    /// Best-effort mirror of the local config to the backend so other
    /// devices can detect the new version.
    fn push_remote(&self) {
        if !self.session.is_active() {
            return;
        }
        if let Err(err) = self.dashboards.push(&self.dashboard.config) {
            tracing::debug!("dashboard push failed: {err}");
        }
    }

    fn stale_banner(&mut self, ctx: &egui::Context) {
        let status = self.sync.sync_status();
        if !status.is_out_of_sync {
            return;
        }
        egui::TopBottomPanel::top("stale-banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(
                    ui.visuals().warn_fg_color,
                    "This dashboard was changed elsewhere.",
                );
                if ui.button("Reload").clicked() {
                    // Prefer the server copy; another device may hold the
                    // newer config. Fall back to the local file.
                    let id = self.dashboard.config.id.clone();
                    match self.dashboards.fetch(&id) {
                        Ok(remote) => {
                            if let Err(err) = self.dashboard.adopt(remote) {
                                tracing::warn!("failed to adopt remote dashboard: {err}");
                                self.dashboard.reload();
                            }
                        }
                        Err(err) => {
                            tracing::debug!("remote dashboard fetch failed: {err}");
                            self.dashboard.reload();
                        }
                    }
                    self.sync.update_dashboard_version(
                        &self.dashboard.config.id,
                        self.dashboard.config.version,
                    );
                    self.sync.mark_in_sync();
                }
            });
        });
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top-bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.dashboard.config.name);
                ui.toggle_value(&mut self.dashboard.edit_mode, "Edit");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match self.session.user() {
                        Some(user) => {
                            ui.label(user.display_name.unwrap_or(user.username));
                        }
                        None => {
                            ui.weak("not signed in");
                        }
                    }
                });
            });
        });
    }

    fn handle_action(&mut self, action: WidgetAction) {
        let result = match action {
            WidgetAction::OpenUrl(url) => open::that(&url)
                .map_err(|err| anyhow::anyhow!("failed to open '{url}': {err}")),
            WidgetAction::RemoveSlot(index) => self
                .dashboard
                .remove_slot(index)
                .map(|()| self.push_remote()),
            WidgetAction::CopySlot(index) => self
                .dashboard
                .copy_slot(index)
                .map(|()| self.push_remote()),
            WidgetAction::EditSlot(index) => {
                if let Some(slot) = self.dashboard.config.slots.get(index) {
                    self.slot_editor = Some(SlotEditor {
                        index,
                        widget: slot.widget.clone(),
                        draft: slot.settings.clone(),
                    });
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            tracing::warn!("{err}");
        }
    }

    fn slot_editor_window(&mut self, ctx: &egui::Context) {
        let Some(editor) = &mut self.slot_editor else {
            return;
        };
        let mut open = true;
        let mut save = false;
        egui::Window::new("Widget settings")
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                let settings_ctx = WidgetSettingsContext {
                    default_location: self.settings.default_location.as_deref(),
                };
                match self.dashboard.registry().render_settings_ui(
                    &editor.widget,
                    ui,
                    &mut editor.draft,
                    &settings_ctx,
                ) {
                    Some(result) => {
                        if let Some(error) = &result.error {
                            ui.colored_label(ui.visuals().error_fg_color, error);
                        }
                    }
                    None => {
                        ui.label("This widget has no settings.");
                    }
                }
                ui.separator();
                if ui.button("Save").clicked() {
                    save = true;
                }
            });
        if save {
            let editor = self.slot_editor.take();
            if let Some(editor) = editor {
                match self.dashboard.set_slot_settings(editor.index, editor.draft) {
                    Ok(()) => self.push_remote(),
                    Err(err) => tracing::warn!("failed to save widget settings: {err}"),
                }
            }
        } else if !open {
            self.slot_editor = None;
        }
    }
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.stale_banner(ctx);
        self.top_bar(ctx);
        self.slot_editor_window(ctx);

        let action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let dctx = DashboardContext {
                    api: &self.api,
                    default_location: self.settings.default_location.as_deref(),
                };
                self.dashboard.ui(ui, &dctx)
            })
            .inner;
        if let Some(action) = action {
            self.handle_action(action);
        }

        // Clocks and fetch completions repaint on a coarse cadence.
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

impl Drop for DashApp {
    fn drop(&mut self) {
        self.sync.destroy();
    }
}
