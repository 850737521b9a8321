//! Shared constants for the layout engine (all in CSS pixels).

// ── Margins ─────────────────────────────────────────────────────────
pub const DEFAULT_LEFT_MARGIN: f64 = 100.0; // clef + time signature column
pub const DEFAULT_RIGHT_MARGIN: f64 = 20.0;
pub const DEFAULT_CONTAINER_WIDTH: f64 = 800.0;

// ── Beat columns ────────────────────────────────────────────────────
pub const DEFAULT_MIN_BEAT_WIDTH: f64 = 40.0; // narrowest readable beat
pub const DEFAULT_MAX_BEAT_WIDTH: f64 = 100.0;
pub const MIN_SAFE_BEAT_WIDTH: f64 = 1.0; // floor for nonsense bounds
pub const NOTE_CENTER_OFFSET: f64 = 10.0; // glyph center inside its beat column

// ── Measures per row ────────────────────────────────────────────────
pub const AUTO_MAX_MEASURES_PER_ROW: u32 = 4;

// ── Rows ────────────────────────────────────────────────────────────
pub const MAX_RENDERED_ROWS: usize = 10_000; // row spans one projection lays out

// ── Staff ───────────────────────────────────────────────────────────
pub const STAFF_LINE_SPACING: f64 = 10.0; // distance between staff lines
pub const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces

// ── Note heads (durations in beats) ─────────────────────────────────
pub const WHOLE_NOTE_MIN_BEATS: f64 = 4.0;
pub const HALF_NOTE_MIN_BEATS: f64 = 2.0;

// ── Playback ────────────────────────────────────────────────────────
pub const DEFAULT_TEMPO: f64 = 120.0;
