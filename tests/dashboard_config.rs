use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tileboard::dashboard::{Dashboard, DashboardConfig, GridConfig, SlotConfig, WidgetRegistry};
use tileboard::events::{DashboardEvent, EventBus};
use tileboard::sync::{SessionGate, SyncBus, SyncService, VersionSource};

struct NoVersions;

impl VersionSource for NoVersions {
    fn latest_versions(&self) -> anyhow::Result<HashMap<String, u64>> {
        Ok(HashMap::new())
    }
}

struct NoSession;

impl SessionGate for NoSession {
    fn is_active(&self) -> bool {
        false
    }
}

fn sync_service(bus: Option<Arc<SyncBus>>) -> Arc<SyncService> {
    Arc::new(
        SyncService::new(Arc::new(NoVersions), Arc::new(NoSession), bus)
            .with_poll_interval(Duration::from_secs(3600)),
    )
}

fn write_config(path: &std::path::Path, cfg: &DashboardConfig) {
    cfg.save(path).unwrap();
}

#[test]
fn unknown_widgets_warn_but_keep_their_slot() {
    let mut cfg = DashboardConfig {
        grid: GridConfig { rows: 2, cols: 2 },
        slots: vec![
            SlotConfig::with_widget("clock", 0, 0),
            SlotConfig::with_widget("pihole_stats", 0, 1),
        ],
        ..DashboardConfig::default()
    };
    let mut registry = WidgetRegistry::with_builtin_loaders();
    let warnings = cfg.sanitize(&mut registry);

    assert_eq!(cfg.slots.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("pihole_stats"));
}

#[test]
fn nameless_slots_are_dropped() {
    let mut cfg = DashboardConfig {
        slots: vec![
            SlotConfig::with_widget("", 0, 0),
            SlotConfig::with_widget("clock", 0, 1),
        ],
        ..DashboardConfig::default()
    };
    let mut registry = WidgetRegistry::with_builtin_loaders();
    cfg.sanitize(&mut registry);

    assert_eq!(cfg.slots.len(), 1);
    assert_eq!(cfg.slots[0].widget, "clock");
}

#[test]
fn sanitize_loads_named_types_and_fills_null_settings() {
    let mut cfg = DashboardConfig {
        slots: vec![SlotConfig {
            settings: serde_json::Value::Null,
            ..SlotConfig::with_widget("clock", 0, 0)
        }],
        ..DashboardConfig::default()
    };
    let mut registry = WidgetRegistry::with_builtin_loaders();
    cfg.sanitize(&mut registry);

    assert!(registry.is_loaded("clock"));
    assert!(!registry.is_loaded("weather"));
    assert_eq!(cfg.slots[0].settings["use_24h"], serde_json::json!(true));
}

#[test]
fn missing_file_yields_default_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = WidgetRegistry::with_builtin_loaders();
    let cfg = DashboardConfig::load(dir.path().join("dashboard.json"), &mut registry).unwrap();
    assert_eq!(cfg.id, "default");
    assert_eq!(cfg.version, 0);
    assert!(!cfg.slots.is_empty());
}

#[test]
fn save_bumps_version_and_sync_cache_follows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let sync = sync_service(None);
    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::new(EventBus::new()),
        Some(Arc::clone(&sync)),
    );
    assert_eq!(dashboard.config.version, 0);

    dashboard.save().unwrap();
    assert_eq!(dashboard.config.version, 1);
    assert_eq!(sync.dashboard_version("default"), Some(1));

    let mut registry = WidgetRegistry::with_builtin_loaders();
    let persisted = DashboardConfig::load(&path, &mut registry).unwrap();
    assert_eq!(persisted.version, 1);
}

#[test]
fn saving_flags_other_instances_but_not_the_saver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let bus = SyncBus::new();
    let saver = sync_service(Some(Arc::clone(&bus)));
    let observer = sync_service(Some(Arc::clone(&bus)));
    saver.set_current_dashboard("default", Some(0));
    observer.set_current_dashboard("default", Some(0));

    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::new(EventBus::new()),
        Some(Arc::clone(&saver)),
    );
    dashboard.save().unwrap();

    assert!(!saver.sync_status().is_out_of_sync);
    let status = observer.sync_status();
    assert!(status.is_out_of_sync);
    assert_eq!(status.conflicting_dashboard_id.as_deref(), Some("default"));
    assert_eq!(observer.dashboard_version("default"), Some(1));
}

#[test]
fn remove_slot_publishes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            grid: GridConfig { rows: 2, cols: 2 },
            slots: vec![
                SlotConfig {
                    id: Some("main-clock".into()),
                    ..SlotConfig::with_widget("clock", 0, 0)
                },
                SlotConfig::with_widget("system_status", 0, 1),
            ],
            ..DashboardConfig::default()
        },
    );

    let events = Arc::new(EventBus::new());
    let seen: Arc<Mutex<Vec<DashboardEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    events.subscribe(move |event| seen2.lock().unwrap().push(event.clone()));

    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::clone(&events),
        None,
    );
    dashboard.remove_slot(0).unwrap();

    assert_eq!(dashboard.config.slots.len(), 1);
    assert_eq!(dashboard.config.version, 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![DashboardEvent::WidgetRemoved {
            id: "main-clock".into()
        }]
    );
}

#[test]
fn copy_slot_lands_in_a_free_cell() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            grid: GridConfig { rows: 1, cols: 2 },
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::new(EventBus::new()),
        None,
    );
    dashboard.copy_slot(0).unwrap();

    assert_eq!(dashboard.config.slots.len(), 2);
    assert_eq!(dashboard.config.slots[1].row, 0);
    assert_eq!(dashboard.config.slots[1].col, 1);
    assert_eq!(dashboard.slots.len(), 2);

    // Grid is now full; a further copy is rejected.
    assert!(dashboard.copy_slot(0).is_err());
}

#[test]
fn set_slot_settings_publishes_widget_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let events = Arc::new(EventBus::new());
    let seen: Arc<Mutex<Vec<DashboardEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    events.subscribe(move |event| seen2.lock().unwrap().push(event.clone()));

    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::clone(&events),
        None,
    );
    let new_settings = serde_json::json!({"use_24h": false});
    dashboard.set_slot_settings(0, new_settings.clone()).unwrap();

    assert_eq!(dashboard.config.slots[0].settings, new_settings);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![DashboardEvent::WidgetContent {
            id: "clock".into(),
            content: new_settings,
        }]
    );
}

#[test]
fn adopt_takes_the_server_config_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let sync = sync_service(None);
    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::new(EventBus::new()),
        Some(Arc::clone(&sync)),
    );

    let remote = DashboardConfig {
        version: 7,
        slots: vec![
            SlotConfig::with_widget("clock", 0, 0),
            SlotConfig::with_widget("system_status", 0, 1),
        ],
        ..DashboardConfig::default()
    };
    dashboard.adopt(remote).unwrap();

    assert_eq!(dashboard.config.version, 7);
    assert_eq!(dashboard.slots.len(), 2);
    assert_eq!(sync.dashboard_version("default"), Some(7));

    let mut registry = WidgetRegistry::with_builtin_loaders();
    let persisted = DashboardConfig::load(&path, &mut registry).unwrap();
    assert_eq!(persisted.version, 7);
}

#[test]
fn reload_publishes_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.json");
    write_config(
        &path,
        &DashboardConfig {
            slots: vec![SlotConfig::with_widget("clock", 0, 0)],
            ..DashboardConfig::default()
        },
    );

    let events = Arc::new(EventBus::new());
    let seen: Arc<Mutex<Vec<DashboardEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    events.subscribe(move |event| seen2.lock().unwrap().push(event.clone()));

    let mut dashboard = Dashboard::new(
        &path,
        WidgetRegistry::with_builtin_loaders(),
        Arc::clone(&events),
        None,
    );
    dashboard.reload();

    assert_eq!(*seen.lock().unwrap(), vec![DashboardEvent::Reloaded]);
}
