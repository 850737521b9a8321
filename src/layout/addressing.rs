//! Absolute-beat addressing for uniform rows (every row holds
//! `beats_per_row` beats).

use serde::{Deserialize, Serialize};

use super::constants::NOTE_CENTER_OFFSET;
use super::responsive::LayoutConfig;

/// Where a beat lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPosition {
    pub row: usize,
    pub beat_in_row: f64,
    /// X of the note glyph center
    pub x: f64,
}

/// Snap a beat to the half-beat placement grid, rounding halves up
/// (0.25 -> 0.5, 0.75 -> 1.0).
pub fn snap_to_half_beat(beat: f64) -> f64 {
    (beat * 2.0 + 0.5).floor() / 2.0
}

/// X of a note centered in the column of `beat_in_row`.
pub fn beat_to_x(beat_in_row: f64, layout: &LayoutConfig) -> f64 {
    layout.left_margin + beat_in_row * layout.beat_width + NOTE_CENTER_OFFSET
}

/// Resolve an absolute beat to its row and x position.
/// Negative or non-finite beats resolve to the start of row 0.
pub fn locate(absolute_beat: f64, layout: &LayoutConfig) -> RowPosition {
    let beat = sanitize_beat(absolute_beat);
    let per_row = layout.beats_per_row_f64();
    let row = (beat / per_row).floor();
    let beat_in_row = beat.rem_euclid(per_row);
    RowPosition {
        row: row as usize,
        beat_in_row,
        x: beat_to_x(beat_in_row, layout),
    }
}

/// Absolute beat of a row-relative position.
pub fn absolute_beat(row: usize, beat_in_row: f64, layout: &LayoutConfig) -> f64 {
    row as f64 * layout.beats_per_row_f64() + beat_in_row
}

/// Convert a click/drag x on `row` back to an absolute beat, snapped to the
/// half-beat grid and kept inside the row.
pub fn from_x_pixel(x: f64, row: usize, layout: &LayoutConfig) -> f64 {
    let raw = (x - layout.left_margin - NOTE_CENTER_OFFSET) / layout.beat_width;
    let last_slot = (layout.beats_per_row_f64() - 0.5).max(0.0);
    let beat_in_row = if raw.is_finite() {
        snap_to_half_beat(raw).clamp(0.0, last_slot)
    } else {
        0.0
    };
    absolute_beat(row, beat_in_row, layout)
}

pub(crate) fn sanitize_beat(beat: f64) -> f64 {
    if beat.is_finite() && beat > 0.0 {
        beat
    } else {
        0.0
    }
}
