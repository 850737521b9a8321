//! Projection between canonical absolute-beat data and the row-relative
//! shapes the older renderer understands.
//!
//! Legacy values are derived from one `LayoutConfig` snapshot and are never
//! stored; recompute them whenever the layout changes.

use serde::{Deserialize, Serialize};

use crate::layout::{addressing, LayoutConfig, RowResolver};
use crate::model::{Event, RepeatMarker, RepeatType, TimeSignatureChanges};

/// An event addressed by row and beat within the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEvent {
    pub id: String,
    pub pitch: String,
    pub duration: f64,
    /// Beat offset within the row
    pub beat: f64,
    /// Row index
    pub system: usize,
}

/// A repeat marker addressed by row and measure within the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRepeatMarker {
    pub id: String,
    pub pair_id: String,
    #[serde(rename = "type")]
    pub marker_type: RepeatType,
    /// Measure offset within the row
    pub measure: u32,
    /// Row index
    pub system: usize,
}

/// Converts against a single layout snapshot. Uses the time-signature
/// aware resolver when changes exist and uniform rows otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LegacyAdapter<'a> {
    layout: &'a LayoutConfig,
    resolver: Option<RowResolver<'a>>,
}

impl<'a> LegacyAdapter<'a> {
    pub fn new(layout: &'a LayoutConfig, changes: &'a TimeSignatureChanges) -> Self {
        let resolver = (!changes.is_empty()).then(|| RowResolver::for_layout(layout, changes));
        Self { layout, resolver }
    }

    /// Adapter for compositions without time-signature changes.
    pub fn uniform(layout: &'a LayoutConfig) -> Self {
        Self {
            layout,
            resolver: None,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        self.layout
    }

    /// Row and beat-in-row of an absolute beat.
    pub fn locate(&self, absolute_beat: f64) -> addressing::RowPosition {
        match &self.resolver {
            Some(resolver) => resolver.locate(absolute_beat, self.layout),
            None => addressing::locate(absolute_beat, self.layout),
        }
    }

    /// Absolute beat of a row-relative position.
    pub fn absolute_beat(&self, system: usize, beat_in_row: f64) -> f64 {
        match &self.resolver {
            Some(resolver) => resolver.absolute_beat(system, beat_in_row),
            None => addressing::absolute_beat(system, beat_in_row, self.layout),
        }
    }

    pub fn to_legacy_note(&self, note: &Event) -> LegacyEvent {
        let pos = self.locate(note.absolute_beat);
        LegacyEvent {
            id: note.id.clone(),
            pitch: note.pitch.clone(),
            duration: note.duration,
            beat: pos.beat_in_row,
            system: pos.row,
        }
    }

    pub fn from_legacy_note(&self, note: &LegacyEvent) -> Event {
        Event {
            id: note.id.clone(),
            pitch: note.pitch.clone(),
            duration: note.duration,
            absolute_beat: self.absolute_beat(note.system, note.beat),
        }
    }

    pub fn to_legacy_notes(&self, notes: &[Event]) -> Vec<LegacyEvent> {
        notes.iter().map(|n| self.to_legacy_note(n)).collect()
    }

    pub fn from_legacy_notes(&self, notes: &[LegacyEvent]) -> Vec<Event> {
        notes.iter().map(|n| self.from_legacy_note(n)).collect()
    }

    // Repeat markers stay on the uniform measures-per-row grid even when
    // time-signature changes exist.

    pub fn to_legacy_repeat_marker(&self, marker: &RepeatMarker) -> LegacyRepeatMarker {
        let per_row = self.layout.measures_per_row.max(1);
        LegacyRepeatMarker {
            id: marker.id.clone(),
            pair_id: marker.pair_id.clone(),
            marker_type: marker.marker_type,
            measure: marker.measure_number % per_row,
            system: (marker.measure_number / per_row) as usize,
        }
    }

    pub fn from_legacy_repeat_marker(&self, marker: &LegacyRepeatMarker) -> RepeatMarker {
        let per_row = self.layout.measures_per_row.max(1);
        RepeatMarker {
            id: marker.id.clone(),
            pair_id: marker.pair_id.clone(),
            marker_type: marker.marker_type,
            measure_number: marker.system as u32 * per_row + marker.measure,
        }
    }

    pub fn to_legacy_repeat_markers(&self, markers: &[RepeatMarker]) -> Vec<LegacyRepeatMarker> {
        markers.iter().map(|m| self.to_legacy_repeat_marker(m)).collect()
    }

    pub fn from_legacy_repeat_markers(&self, markers: &[LegacyRepeatMarker]) -> Vec<RepeatMarker> {
        markers.iter().map(|m| self.from_legacy_repeat_marker(m)).collect()
    }

    /// Rows needed to show every event. With time-signature changes the
    /// irregular partition is used; an event ending exactly on a row
    /// boundary does not open another row.
    pub fn system_count(&self, events: &[Event]) -> usize {
        match &self.resolver {
            None => calculate_legacy_system_count(events, self.layout),
            Some(resolver) => {
                let end = last_end_beat(events);
                if end <= 0.0 {
                    return 1;
                }
                let (row, beat_in_row) = resolver.resolve(end);
                let rows = if beat_in_row > 0.0 { row + 1 } else { row };
                rows.max(1)
            }
        }
    }
}

/// Rows needed for `events` on uniform rows: the last end beat divided by
/// beats per row, rounded up, at least 1.
pub fn calculate_legacy_system_count(events: &[Event], layout: &LayoutConfig) -> usize {
    let end = last_end_beat(events);
    let rows = (end / layout.beats_per_row_f64()).ceil();
    if rows.is_finite() && rows >= 1.0 {
        rows as usize
    } else {
        1
    }
}

fn last_end_beat(events: &[Event]) -> f64 {
    events.iter().map(Event::end_beat).fold(0.0, f64::max)
}
