use std::sync::Arc;

use tileboard::api::{ApiClient, DashboardApi};
use tileboard::app::DashApp;
use tileboard::dashboard::{Dashboard, DashboardConfig, WidgetRegistry};
use tileboard::events::EventBus;
use tileboard::logging;
use tileboard::session::SessionStore;
use tileboard::settings::{self, Settings};
use tileboard::sync::{SessionGate, SyncBus, SyncService, VersionSource};

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let dir = settings::config_dir();
    std::fs::create_dir_all(&dir)?;
    let settings_path = dir.join("settings.json");
    let settings = Settings::load(&settings_path.to_string_lossy())?;
    logging::init(settings.debug_logging);

    let session = Arc::new(SessionStore::new(dir.join("session.json")));
    let api = Arc::new(ApiClient::new(&settings.backend_url, Arc::clone(&session))?);
    let dashboards = Arc::new(DashboardApi::new(Arc::clone(&api)));

    let bus = SyncBus::new();
    let sync = Arc::new(
        SyncService::new(
            Arc::clone(&dashboards) as Arc<dyn VersionSource>,
            Arc::clone(&session) as Arc<dyn SessionGate>,
            Some(bus),
        )
        .with_poll_interval(settings.poll_interval()),
    );

    let events = Arc::new(EventBus::new());
    let registry = WidgetRegistry::with_builtin_loaders();
    let dashboard_path = match &settings.dashboard_path {
        Some(path) => DashboardConfig::path_for(path),
        None => dir.join("dashboard.json"),
    };
    let dashboard = Dashboard::new(
        &dashboard_path,
        registry,
        Arc::clone(&events),
        Some(Arc::clone(&sync)),
    );
    for warning in &dashboard.warnings {
        tracing::warn!("{warning}");
    }

    let app = DashApp::new(settings, api, session, sync, dashboards, dashboard);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native("Tileboard", native_options, Box::new(move |_cc| Box::new(app)))
        .map_err(|err| anyhow::anyhow!("failed to start ui: {err}"))
}
