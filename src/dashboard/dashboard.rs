use crate::api::ApiClient;
use crate::dashboard::config::{DashboardConfig, SlotConfig};
use crate::dashboard::layout::{normalize_slots, NormalizedSlot};
use crate::dashboard::registry::WidgetRegistry;
use crate::dashboard::widgets::{MissingWidget, Widget, WidgetAction};
use crate::events::{DashboardEvent, EventBus};
use crate::sync::SyncService;
use eframe::egui;
use eframe::egui::scroll_area::ScrollBarVisibility;
use siphasher::sip::SipHasher24;
use std::collections::HashMap;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context shared with widgets at render time.
pub struct DashboardContext<'a> {
    pub api: &'a Arc<ApiClient>,
    pub default_location: Option<&'a str>,
}

struct SlotRuntime {
    slot: NormalizedSlot,
    hash: u64,
    widget: Box<dyn Widget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    Id {
        id: String,
        widget: String,
    },
    Position {
        widget: String,
        row: usize,
        col: usize,
    },
}

impl SlotKey {
    fn from_slot(slot: &NormalizedSlot) -> Self {
        if let Some(id) = &slot.id {
            SlotKey::Id {
                id: id.clone(),
                widget: slot.widget.clone(),
            }
        } else {
            SlotKey::Position {
                widget: slot.widget.clone(),
                row: slot.row,
                col: slot.col,
            }
        }
    }
}

fn slot_hash(slot: &NormalizedSlot) -> u64 {
    let mut hasher = SipHasher24::new_with_keys(0, 0);
    hasher.write(slot.widget.as_bytes());
    hasher.write_u64(slot.row as u64);
    hasher.write_u64(slot.col as u64);
    hasher.write_u64(slot.row_span as u64);
    hasher.write_u64(slot.col_span as u64);
    if let Ok(bytes) = serde_json::to_vec(&slot.settings) {
        hasher.write(&bytes);
    }
    hasher.finish()
}

/// Owns the dashboard config, the widget registry and the live widget
/// instances. Saving bumps the config version and announces the change to
/// the sync service and the event bus.
pub struct Dashboard {
    config_path: PathBuf,
    pub config: DashboardConfig,
    pub slots: Vec<NormalizedSlot>,
    runtime_slots: Vec<SlotRuntime>,
    registry: WidgetRegistry,
    events: Arc<EventBus>,
    sync: Option<Arc<SyncService>>,
    pub warnings: Vec<String>,
    pub edit_mode: bool,
}

impl Dashboard {
    pub fn new(
        config_path: impl AsRef<Path>,
        mut registry: WidgetRegistry,
        events: Arc<EventBus>,
        sync: Option<Arc<SyncService>>,
    ) -> Self {
        let path = config_path.as_ref().to_path_buf();
        let (config, slots, warnings) = Self::load_internal(&path, &mut registry);
        let mut dashboard = Self {
            config_path: path,
            config,
            slots: Vec::new(),
            runtime_slots: Vec::new(),
            registry,
            events,
            sync,
            warnings,
            edit_mode: false,
        };
        dashboard.rebuild_runtime_slots(slots);
        dashboard
    }

    fn load_internal(
        path: &Path,
        registry: &mut WidgetRegistry,
    ) -> (DashboardConfig, Vec<NormalizedSlot>, Vec<String>) {
        let cfg = DashboardConfig::load(path, registry).unwrap_or_default();
        let (slots, mut warnings) = normalize_slots(&cfg);
        if slots.is_empty() {
            warnings.push("dashboard has no valid slots".into());
        }
        (cfg, slots, warnings)
    }

    fn rebuild_runtime_slots(&mut self, slots: Vec<NormalizedSlot>) {
        let mut reusable: HashMap<SlotKey, SlotRuntime> = self
            .runtime_slots
            .drain(..)
            .map(|rt| (SlotKey::from_slot(&rt.slot), rt))
            .collect();

        let mut runtime_slots = Vec::with_capacity(slots.len());
        for slot in &slots {
            let new_hash = slot_hash(slot);
            let key = SlotKey::from_slot(slot);
            if let Some(mut runtime) = reusable.remove(&key) {
                if runtime.hash != new_hash {
                    runtime.widget.on_config_updated(&slot.settings);
                }
                runtime.slot = slot.clone();
                runtime.hash = new_hash;
                runtime_slots.push(runtime);
            } else {
                let widget = self
                    .registry
                    .create(&slot.widget, &slot.settings)
                    .unwrap_or_else(|| Box::new(MissingWidget::new(slot.widget.clone())));
                runtime_slots.push(SlotRuntime {
                    slot: slot.clone(),
                    hash: new_hash,
                    widget,
                });
            }
        }

        self.slots = slots;
        self.runtime_slots = runtime_slots;
    }

    fn refresh_slots(&mut self) {
        let (slots, warnings) = normalize_slots(&self.config);
        self.warnings = warnings;
        self.rebuild_runtime_slots(slots);
    }

    pub fn reload(&mut self) {
        let mut registry = std::mem::take(&mut self.registry);
        let (cfg, slots, warnings) = Self::load_internal(&self.config_path, &mut registry);
        self.registry = registry;
        self.config = cfg;
        self.warnings = warnings;
        self.rebuild_runtime_slots(slots);
        self.events.publish(&DashboardEvent::Reloaded);
    }

    /// Replace the local config with one fetched from the backend, keeping
    /// the server's version number so the next poll sees us caught up.
    pub fn adopt(&mut self, mut config: DashboardConfig) -> anyhow::Result<()> {
        let mut warnings = config.sanitize(&mut self.registry);
        config.save(&self.config_path)?;
        self.config = config;
        let (slots, more) = normalize_slots(&self.config);
        warnings.extend(more);
        self.warnings = warnings;
        self.rebuild_runtime_slots(slots);
        if let Some(sync) = &self.sync {
            sync.update_dashboard_version(&self.config.id, self.config.version);
        }
        self.events.publish(&DashboardEvent::Reloaded);
        Ok(())
    }

    /// Persist the config under a bumped version and broadcast the change
    /// so other instances can flag themselves stale.
    pub fn save(&mut self) -> anyhow::Result<()> {
        self.config.version += 1;
        self.config.save(&self.config_path)?;
        if let Some(sync) = &self.sync {
            sync.broadcast_dashboard_update(&self.config.id, Some(self.config.version));
        }
        Ok(())
    }

    pub fn remove_slot(&mut self, index: usize) -> anyhow::Result<()> {
        if index >= self.config.slots.len() {
            anyhow::bail!("slot index {index} out of range");
        }
        let removed = self.config.slots.remove(index);
        self.save()?;
        self.refresh_slots();
        self.events.publish(&DashboardEvent::WidgetRemoved {
            id: removed.label(),
        });
        Ok(())
    }

    pub fn copy_slot(&mut self, index: usize) -> anyhow::Result<()> {
        let Some(source) = self.config.slots.get(index) else {
            anyhow::bail!("slot index {index} out of range");
        };
        let Some((row, col)) = self.free_cell() else {
            anyhow::bail!("dashboard grid is full");
        };
        let mut copy = source.clone();
        copy.id = None;
        copy.row = row as i32;
        copy.col = col as i32;
        copy.row_span = 1;
        copy.col_span = 1;
        let label = copy.label();
        self.config.slots.push(copy);
        self.save()?;
        self.refresh_slots();
        self.events
            .publish(&DashboardEvent::WidgetCopied { id: label });
        Ok(())
    }

    pub fn set_slot_settings(
        &mut self,
        index: usize,
        settings: serde_json::Value,
    ) -> anyhow::Result<()> {
        let Some(slot) = self.config.slots.get_mut(index) else {
            anyhow::bail!("slot index {index} out of range");
        };
        slot.settings = settings.clone();
        let id = slot.label();
        self.save()?;
        self.refresh_slots();
        self.events.publish(&DashboardEvent::WidgetContent {
            id,
            content: settings,
        });
        Ok(())
    }

    pub fn replace_slot(&mut self, index: usize, slot: SlotConfig) -> anyhow::Result<()> {
        if index >= self.config.slots.len() {
            anyhow::bail!("slot index {index} out of range");
        }
        self.config.slots[index] = slot.clone();
        self.save()?;
        self.refresh_slots();
        self.events
            .publish(&DashboardEvent::WidgetReplaced { slot });
        Ok(())
    }

    fn free_cell(&self) -> Option<(usize, usize)> {
        let rows = self.config.grid.rows.max(1) as usize;
        let cols = self.config.grid.cols.max(1) as usize;
        let mut occupied = vec![vec![false; cols]; rows];
        for slot in &self.slots {
            for r in slot.row..(slot.row + slot.row_span).min(rows) {
                for c in slot.col..(slot.col + slot.col_span).min(cols) {
                    occupied[r][c] = true;
                }
            }
        }
        for r in 0..rows {
            for c in 0..cols {
                if !occupied[r][c] {
                    return Some((r, c));
                }
            }
        }
        None
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, ctx: &DashboardContext<'_>) -> Option<WidgetAction> {
        let mut action = None;

        let available_size = egui::vec2(ui.available_width(), ui.available_height());
        let grid_cols = self.config.grid.cols.max(1) as usize;
        let grid_rows = self.config.grid.rows.max(1) as usize;
        let col_width = available_size.x / grid_cols as f32;
        let row_height = available_size.y / grid_rows as f32;
        let (rect, _) = ui.allocate_exact_size(available_size, egui::Sense::hover());
        let mut child = ui.child_ui(rect, egui::Layout::top_down(egui::Align::LEFT));

        let edit_mode = self.edit_mode;
        for slot in &mut self.runtime_slots {
            let normalized = &slot.slot;
            let slot_rect = egui::Rect::from_min_size(
                rect.min
                    + egui::vec2(
                        col_width * normalized.col as f32,
                        row_height * normalized.row as f32,
                    ),
                egui::vec2(
                    col_width * normalized.col_span as f32,
                    row_height * normalized.row_span as f32,
                ),
            );
            let slot_clip = slot_rect.intersect(child.clip_rect());
            let response = child.allocate_ui_at_rect(slot_rect, |slot_ui| {
                slot_ui.set_clip_rect(slot_clip);
                slot_ui.set_min_size(slot_rect.size());
                Self::render_slot(slot, edit_mode, slot_rect, slot_clip, slot_ui, ctx)
            });
            action = action.or(response.inner);
        }

        action
    }

    fn render_slot(
        slot: &mut SlotRuntime,
        edit_mode: bool,
        slot_rect: egui::Rect,
        slot_clip: egui::Rect,
        ui: &mut egui::Ui,
        ctx: &DashboardContext<'_>,
    ) -> Option<WidgetAction> {
        let heading = slot.slot.label();
        let source_index = slot.slot.source_index;

        ui.set_clip_rect(slot_clip);
        ui.set_min_size(slot_rect.size());
        egui::Frame::group(ui.style())
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    let mut header_action = None;
                    let heading_rect = ui
                        .horizontal(|ui| {
                            let resp = ui.heading(&heading);
                            header_action = slot.widget.header_ui(ui, ctx);
                            if edit_mode {
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui.small_button("✕").on_hover_text("Remove").clicked() {
                                            header_action =
                                                Some(WidgetAction::RemoveSlot(source_index));
                                        }
                                        if ui.small_button("⧉").on_hover_text("Duplicate").clicked()
                                        {
                                            header_action =
                                                Some(WidgetAction::CopySlot(source_index));
                                        }
                                        if ui.small_button("⚙").on_hover_text("Settings").clicked()
                                        {
                                            header_action =
                                                Some(WidgetAction::EditSlot(source_index));
                                        }
                                    },
                                );
                            }
                            resp.rect
                        })
                        .inner;
                    let header_height = heading_rect.height();
                    let body_height =
                        (slot_rect.height() - header_height - ui.spacing().item_spacing.y).max(0.0);

                    let scroll_id = egui::Id::new((
                        "slot-scroll",
                        slot.slot.id.as_deref().unwrap_or(&slot.slot.widget),
                        slot.slot.row,
                        slot.slot.col,
                    ));
                    let action = egui::ScrollArea::both()
                        .id_source(scroll_id)
                        .auto_shrink([false; 2])
                        .max_height(body_height)
                        .scroll_bar_visibility(ScrollBarVisibility::VisibleWhenNeeded)
                        .show(ui, |ui| {
                            ui.set_clip_rect(ui.clip_rect().intersect(slot_clip));
                            ui.set_min_height(body_height);
                            slot.widget.render(ui, ctx)
                        })
                        .inner;

                    header_action.or(action)
                })
                .inner
            })
            .inner
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}
