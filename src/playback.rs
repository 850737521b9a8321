//! Playback head positioning: maps elapsed playback time onto the same
//! row/x coordinates that note placement uses, so the cursor passes
//! through note centers.

use serde::{Deserialize, Serialize};

use crate::layout::constants::DEFAULT_TEMPO;
use crate::legacy::LegacyAdapter;
use crate::model::Event;

/// Cursor position at a moment of playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playhead {
    /// Continuous (unsnapped) position in beats
    pub absolute_beat: f64,
    pub row: usize,
    pub beat_in_row: f64,
    pub x: f64,
}

fn effective_tempo(tempo_bpm: f64) -> f64 {
    if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        tempo_bpm
    } else {
        DEFAULT_TEMPO
    }
}

/// Beats elapsed after `elapsed_ms` at a constant tempo.
pub fn beats_at(elapsed_ms: f64, tempo_bpm: f64) -> f64 {
    let ms_per_beat = 60_000.0 / effective_tempo(tempo_bpm);
    (elapsed_ms / ms_per_beat).max(0.0)
}

/// Where the playback cursor is drawn after `elapsed_ms`.
pub fn playhead_at(elapsed_ms: f64, tempo_bpm: f64, adapter: &LegacyAdapter<'_>) -> Playhead {
    let absolute_beat = beats_at(elapsed_ms, tempo_bpm);
    let pos = adapter.locate(absolute_beat);
    Playhead {
        absolute_beat,
        row: pos.row,
        beat_in_row: pos.beat_in_row,
        x: pos.x,
    }
}

/// Playing time of the notes, up to the last note end, in milliseconds.
pub fn composition_duration_ms(notes: &[Event], tempo_bpm: f64) -> f64 {
    let end = notes.iter().map(Event::end_beat).fold(0.0, f64::max);
    end * 60_000.0 / effective_tempo(tempo_bpm)
}
