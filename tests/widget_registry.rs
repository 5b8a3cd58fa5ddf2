use std::sync::atomic::{AtomicUsize, Ordering};

use tileboard::dashboard::widgets::ClockWidget;
use tileboard::dashboard::{WidgetDescriptor, WidgetRegistry};

static IDEMPOTENT_CALLS: AtomicUsize = AtomicUsize::new(0);
static DEDUP_CALLS: AtomicUsize = AtomicUsize::new(0);

fn counting_idempotent_loader() -> WidgetDescriptor {
    IDEMPOTENT_CALLS.fetch_add(1, Ordering::SeqCst);
    WidgetDescriptor::new(ClockWidget::new)
}

fn counting_dedup_loader() -> WidgetDescriptor {
    DEDUP_CALLS.fetch_add(1, Ordering::SeqCst);
    WidgetDescriptor::new(ClockWidget::new)
}

#[test]
fn unknown_types_warn_and_no_op() {
    let mut reg = WidgetRegistry::with_builtin_loaders();
    assert!(!reg.load("docker_swarm"));
    assert!(!reg.contains("docker_swarm"));
    assert!(reg.loaded_names().is_empty());
}

#[test]
fn load_is_idempotent_per_type() {
    let mut reg = WidgetRegistry::default();
    reg.declare("counting", counting_idempotent_loader);

    assert!(reg.load("counting"));
    assert!(reg.load("counting"));
    assert!(reg.load("counting"));

    assert_eq!(IDEMPOTENT_CALLS.load(Ordering::SeqCst), 1);
    assert!(reg.is_loaded("counting"));
}

#[test]
fn load_many_deduplicates_and_skips_unknowns() {
    let mut reg = WidgetRegistry::default();
    reg.declare("counting", counting_dedup_loader);

    reg.load_many(["counting", "counting", "nope", "counting"]);

    assert_eq!(DEDUP_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(reg.loaded_names(), vec!["counting".to_string()]);
}

#[test]
fn register_is_last_write_wins() {
    let mut reg = WidgetRegistry::default();
    reg.register(
        "clock",
        WidgetDescriptor::new(ClockWidget::new).with_display_name("First"),
    );
    reg.register(
        "clock",
        WidgetDescriptor::new(ClockWidget::new).with_display_name("Second"),
    );

    let meta = reg.metadata_for("clock").unwrap();
    assert_eq!(meta.display_name, "Second");
}

#[test]
fn create_requires_a_loaded_type() {
    let mut reg = WidgetRegistry::with_builtin_loaders();
    assert!(reg.create("clock", &serde_json::Value::Null).is_none());
    assert!(reg.load("clock"));
    assert!(reg.create("clock", &serde_json::Value::Null).is_some());
}

#[test]
fn null_settings_fall_back_to_descriptor_defaults() {
    let mut reg = WidgetRegistry::with_builtin_loaders();
    reg.load("clock");
    let defaults = reg.default_settings("clock").unwrap();
    assert_eq!(defaults["use_24h"], serde_json::json!(true));
    // Instantiation with null settings must not fail either.
    assert!(reg.create("clock", &serde_json::Value::Null).is_some());
}

#[test]
fn metadata_covers_loaded_types_only() {
    let mut reg = WidgetRegistry::with_builtin_loaders();
    reg.load("clock");
    reg.load("weather");
    let names: Vec<String> = reg.metadata().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["clock".to_string(), "weather".to_string()]);
    assert!(reg.metadata_for("clock").unwrap().has_settings);
}
