pub mod config;
pub mod dashboard;
pub mod layout;
pub mod registry;
pub mod widgets;

pub use config::{DashboardConfig, GridConfig, SlotConfig};
pub use dashboard::{Dashboard, DashboardContext};
pub use registry::{WidgetDescriptor, WidgetMetadata, WidgetRegistry};
pub use widgets::{Widget, WidgetAction};
