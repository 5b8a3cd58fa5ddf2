use crate::dashboard::config::{DashboardConfig, SlotConfig};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSlot {
    pub id: Option<String>,
    pub widget: String,
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub settings: Value,
    /// Index of the originating entry in `DashboardConfig::slots`, so edit
    /// actions can reach back to the config.
    pub source_index: usize,
}

impl NormalizedSlot {
    pub fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.widget.clone())
    }
}

/// Validate and normalize slot positions to the configured grid size.
/// Unknown widget types are kept; the dashboard renders a placeholder for
/// them so the config is never silently rewritten.
pub fn normalize_slots(cfg: &DashboardConfig) -> (Vec<NormalizedSlot>, Vec<String>) {
    let rows = cfg.grid.rows.max(1) as usize;
    let cols = cfg.grid.cols.max(1) as usize;
    let mut occupied = vec![vec![false; cols]; rows];
    let mut normalized = Vec::new();
    let mut warnings = Vec::new();

    for (index, slot) in cfg.slots.iter().enumerate() {
        if let Some(ns) = normalize_slot(slot, index, rows, cols, &mut occupied) {
            normalized.push(ns);
        } else {
            warnings.push(format!(
                "slot for widget '{}' is outside the grid and was ignored",
                slot.widget
            ));
        }
    }

    (normalized, warnings)
}

fn normalize_slot(
    slot: &SlotConfig,
    source_index: usize,
    rows: usize,
    cols: usize,
    occupied: &mut [Vec<bool>],
) -> Option<NormalizedSlot> {
    if slot.row < 0 || slot.col < 0 {
        return None;
    }
    let row = slot.row as usize;
    let col = slot.col as usize;
    if row >= rows || col >= cols {
        return None;
    }
    let row_span = slot.row_span.max(1).min((rows - row).max(1) as u8) as usize;
    let col_span = slot.col_span.max(1).min((cols - col).max(1) as u8) as usize;

    for r in row..row + row_span {
        for c in col..col + col_span {
            if occupied[r][c] {
                return None;
            }
        }
    }
    for r in row..row + row_span {
        for c in col..col + col_span {
            occupied[r][c] = true;
        }
    }

    Some(NormalizedSlot {
        id: slot.id.clone(),
        widget: slot.widget.clone(),
        row,
        col,
        row_span,
        col_span,
        settings: slot.settings.clone(),
        source_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::config::GridConfig;
    use serde_json::json;

    fn cfg_with_slots(rows: u8, cols: u8, slots: Vec<SlotConfig>) -> DashboardConfig {
        DashboardConfig {
            grid: GridConfig { rows, cols },
            slots,
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn clamps_out_of_bounds_spans() {
        let cfg = cfg_with_slots(
            2,
            2,
            vec![SlotConfig {
                row_span: 5,
                col_span: 5,
                settings: json!({}),
                ..SlotConfig::with_widget("clock", 0, 0)
            }],
        );
        let (slots, _) = normalize_slots(&cfg);
        assert_eq!(slots[0].row_span, 2);
        assert_eq!(slots[0].col_span, 2);
    }

    #[test]
    fn prevents_overlap() {
        let cfg = cfg_with_slots(
            2,
            2,
            vec![
                SlotConfig::with_widget("clock", 0, 0),
                SlotConfig::with_widget("clock", 0, 0),
            ],
        );
        let (slots, warnings) = normalize_slots(&cfg);
        assert_eq!(slots.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn ignores_negative_positions() {
        let cfg = cfg_with_slots(2, 2, vec![SlotConfig::with_widget("clock", -1, 0)]);
        let (slots, warnings) = normalize_slots(&cfg);
        assert!(slots.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unknown_widget_types_keep_their_slot() {
        let cfg = cfg_with_slots(2, 2, vec![SlotConfig::with_widget("pihole_stats", 0, 0)]);
        let (slots, warnings) = normalize_slots(&cfg);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].widget, "pihole_stats");
        assert!(warnings.is_empty());
    }

    #[test]
    fn source_index_survives_dropped_neighbours() {
        let cfg = cfg_with_slots(
            2,
            2,
            vec![
                SlotConfig::with_widget("clock", -1, 0),
                SlotConfig::with_widget("clock", 0, 1),
            ],
        );
        let (slots, warnings) = normalize_slots(&cfg);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].source_index, 1);
        assert_eq!(warnings.len(), 1);
    }
}
