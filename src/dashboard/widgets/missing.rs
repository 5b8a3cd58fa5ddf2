use super::{Widget, WidgetAction};
use crate::dashboard::dashboard::DashboardContext;
use eframe::egui;

/// Placeholder rendered for slots whose widget type is not registered,
/// e.g. a config written by a newer build. The slot keeps its place so the
/// config is never silently rewritten.
pub struct MissingWidget {
    type_name: String,
}

impl MissingWidget {
    pub fn new(type_name: String) -> Self {
        Self { type_name }
    }
}

impl Widget for MissingWidget {
    fn render(&mut self, ui: &mut egui::Ui, _ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        ui.label(format!("Unknown widget '{}'.", self.type_name));
        ui.weak("This slot is kept as configured but cannot be rendered.");
        None
    }
}
