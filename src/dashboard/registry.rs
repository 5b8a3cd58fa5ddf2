use crate::dashboard::widgets::{
    ClockWidget, RssHeadlinesWidget, ServiceHealthWidget, SettingsUiFn, SystemStatusWidget,
    Widget, WidgetSettingsContext, WidgetSettingsUiResult, WeatherWidget,
};
use eframe::egui;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Descriptor for building widgets from JSON settings, plus the metadata a
/// widget picker needs without instantiating anything.
#[derive(Clone)]
pub struct WidgetDescriptor {
    ctor: Arc<dyn Fn(&Value) -> Box<dyn Widget> + Send + Sync>,
    default_settings: Arc<dyn Fn() -> Value + Send + Sync>,
    settings_ui: Option<SettingsUiFn>,
    display_name: String,
    icon: &'static str,
}

impl WidgetDescriptor {
    pub fn new<
        T: Widget + 'static,
        C: DeserializeOwned + Serialize + Default + 'static,
    >(
        build: fn(C) -> T,
    ) -> Self {
        Self {
            ctor: Arc::new(move |v| {
                let cfg = serde_json::from_value::<C>(v.clone()).unwrap_or_default();
                Box::new(build(cfg))
            }),
            default_settings: Arc::new(|| {
                serde_json::to_value(C::default()).unwrap_or_else(|_| json!({}))
            }),
            settings_ui: None,
            display_name: String::new(),
            icon: "▦",
        }
    }

    pub fn with_settings_ui(mut self, settings_ui: SettingsUiFn) -> Self {
        self.settings_ui = Some(settings_ui);
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = icon;
        self
    }

    pub fn default_settings(&self) -> Value {
        (self.default_settings)()
    }

    pub fn settings_ui(&self) -> Option<SettingsUiFn> {
        self.settings_ui
    }

    pub fn create(&self, settings: &Value) -> Box<dyn Widget> {
        (self.ctor)(settings)
    }

    pub fn metadata(&self, name: &str) -> WidgetMetadata {
        WidgetMetadata {
            name: name.to_string(),
            display_name: if self.display_name.is_empty() {
                name.to_string()
            } else {
                self.display_name.clone()
            },
            icon: self.icon,
            has_settings: self.settings_ui.is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetMetadata {
    pub name: String,
    pub display_name: String,
    pub icon: &'static str,
    pub has_settings: bool,
}

/// Deferred producer of a widget descriptor. Runs at most once per type.
pub type WidgetLoader = fn() -> WidgetDescriptor;

/// Explicitly constructed widget registry.
///
/// Types are declared up front as loaders and materialised on demand, so a
/// dashboard only pays for the widget types it actually names. A type is
/// either absent, declared, or loaded; loading an unknown type warns and
/// no-ops rather than failing the caller.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    loaders: HashMap<String, WidgetLoader>,
    loaded: HashMap<String, WidgetDescriptor>,
}

impl WidgetRegistry {
    /// Registry pre-declaring every built-in widget type.
    pub fn with_builtin_loaders() -> Self {
        let mut reg = Self::default();
        reg.declare("clock", || {
            WidgetDescriptor::new(ClockWidget::new)
                .with_settings_ui(ClockWidget::settings_ui)
                .with_display_name("Clock")
                .with_icon("🕑")
        });
        reg.declare("weather", || {
            WidgetDescriptor::new(WeatherWidget::new)
                .with_settings_ui(WeatherWidget::settings_ui)
                .with_display_name("Weather")
                .with_icon("⛅")
        });
        reg.declare("rss_headlines", || {
            WidgetDescriptor::new(RssHeadlinesWidget::new)
                .with_settings_ui(RssHeadlinesWidget::settings_ui)
                .with_display_name("RSS headlines")
                .with_icon("📰")
        });
        reg.declare("service_health", || {
            WidgetDescriptor::new(ServiceHealthWidget::new)
                .with_settings_ui(ServiceHealthWidget::settings_ui)
                .with_display_name("Service health")
                .with_icon("📡")
        });
        reg.declare("system_status", || {
            WidgetDescriptor::new(SystemStatusWidget::new)
                .with_settings_ui(SystemStatusWidget::settings_ui)
                .with_display_name("System status")
                .with_icon("🖥")
        });
        reg
    }

    /// Declare a type without materialising its descriptor yet.
    pub fn declare(&mut self, name: &str, loader: WidgetLoader) {
        self.loaders.insert(name.to_string(), loader);
    }

    /// Insert a ready descriptor directly. Last write wins.
    pub fn register(&mut self, name: &str, descriptor: WidgetDescriptor) {
        self.loaded.insert(name.to_string(), descriptor);
    }

    /// Materialise one declared type. Idempotent: already-loaded types
    /// return immediately, unknown types log a warning and report false.
    pub fn load(&mut self, name: &str) -> bool {
        if self.loaded.contains_key(name) {
            return true;
        }
        match self.loaders.get(name) {
            Some(loader) => {
                let descriptor = loader();
                self.loaded.insert(name.to_string(), descriptor);
                true
            }
            None => {
                tracing::warn!(widget = %name, "unknown widget type requested");
                false
            }
        }
    }

    /// Load every not-yet-loaded type from `names`, deduplicating first.
    pub fn load_many<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        let mut requested: Vec<&str> = names.into_iter().collect();
        requested.sort_unstable();
        requested.dedup();
        for name in requested {
            self.load(name);
        }
    }

    /// Whether the type is known at all, loaded or not.
    pub fn contains(&self, name: &str) -> bool {
        self.loaded.contains_key(name) || self.loaders.contains_key(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&WidgetDescriptor> {
        self.loaded.get(name)
    }

    /// Instantiate a loaded widget; null settings fall back to defaults.
    pub fn create(&self, name: &str, settings: &Value) -> Option<Box<dyn Widget>> {
        let descriptor = self.loaded.get(name)?;
        let settings = if settings.is_null() {
            descriptor.default_settings()
        } else {
            settings.clone()
        };
        Some(descriptor.create(&settings))
    }

    pub fn default_settings(&self, name: &str) -> Option<Value> {
        self.loaded.get(name).map(|d| d.default_settings())
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loaders
            .keys()
            .chain(self.loaded.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn metadata(&self) -> Vec<WidgetMetadata> {
        let mut meta: Vec<WidgetMetadata> = self
            .loaded
            .iter()
            .map(|(name, descriptor)| descriptor.metadata(name))
            .collect();
        meta.sort_by(|a, b| a.name.cmp(&b.name));
        meta
    }

    pub fn metadata_for(&self, name: &str) -> Option<WidgetMetadata> {
        self.loaded.get(name).map(|d| d.metadata(name))
    }

    pub fn settings_ui_fn(&self, name: &str) -> Option<SettingsUiFn> {
        self.loaded.get(name).and_then(|d| d.settings_ui())
    }

    pub fn render_settings_ui(
        &self,
        name: &str,
        ui: &mut egui::Ui,
        settings: &mut Value,
        ctx: &WidgetSettingsContext<'_>,
    ) -> Option<WidgetSettingsUiResult> {
        let descriptor = self.loaded.get(name)?;
        let render = descriptor.settings_ui()?;
        if settings.is_null() {
            *settings = descriptor.default_settings();
        }
        Some(render(ui, settings, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_reports_settings_ui() {
        let descriptor = WidgetDescriptor::new(ClockWidget::new);
        let descriptor_with_ui =
            WidgetDescriptor::new(ClockWidget::new).with_settings_ui(ClockWidget::settings_ui);
        assert!(!descriptor.metadata("clock").has_settings);
        assert!(descriptor_with_ui.metadata("clock").has_settings);
    }

    #[test]
    fn builtin_types_are_declared_not_loaded() {
        let reg = WidgetRegistry::with_builtin_loaders();
        assert!(reg.contains("clock"));
        assert!(!reg.is_loaded("clock"));
        assert!(reg.loaded_names().is_empty());
        assert_eq!(reg.registered_names().len(), 5);
    }
}
