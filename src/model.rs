//! Data model for a composition in canonical (absolute-beat) addressing.
//!
//! `absolute_beat` is the only stored temporal position. Row-relative
//! coordinates are always derived from a `LayoutConfig`; see `crate::legacy`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pitch name used for rests.
pub const REST_PITCH: &str = "REST";

/// A note or rest placed on the absolute beat grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique id
    pub id: String,
    /// Pitch name, e.g. "C4", "F#5", or "REST"
    pub pitch: String,
    /// Duration in beats (positive)
    pub duration: f64,
    /// Zero-based position in beats from the start of the composition
    pub absolute_beat: f64,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        pitch: impl Into<String>,
        duration: f64,
        absolute_beat: f64,
    ) -> Self {
        Self {
            id: id.into(),
            pitch: pitch.into(),
            duration,
            absolute_beat,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch == REST_PITCH
    }

    /// Beat at which the event stops sounding.
    pub fn end_beat(&self) -> f64 {
        self.absolute_beat + self.duration
    }
}

/// Which side of a repeated section a marker sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    Start,
    End,
}

/// A repeat sign attached to a measure boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatMarker {
    pub id: String,
    /// Shared by the start and end marker of one repeated section
    pub pair_id: String,
    #[serde(rename = "type")]
    pub marker_type: RepeatType,
    /// Zero-based measure index
    pub measure_number: u32,
}

/// A 1st/2nd ending bracket spanning measures (inclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltaBracket {
    pub id: String,
    pub number: String,
    pub start_measure: u32,
    pub end_measure: u32,
}

/// A lyric syllable pinned to a beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lyric {
    pub text: String,
    pub absolute_beat: f64,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub numerator: u32,
    /// Denominator (e.g., 4 in 3/4)
    pub denominator: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    /// Create a validated time signature. The denominator must be a power
    /// of two between 1 and 64.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || !denominator.is_power_of_two() || denominator > 64 {
            return Err(Error::InvalidTimeSignature {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Beat units one measure occupies on the editor grid.
    ///
    /// Compound meters count eighth-note pulses, so 6/8 is six units
    /// rather than the 1.5 a numerator/denominator ratio would give.
    pub fn beats_per_measure(&self) -> u32 {
        let beats = match (self.numerator, self.denominator) {
            (3, 8) => 3,
            (6, 8) => 6,
            (9, 8) => 9,
            (12, 8) => 12,
            (n, _) => n,
        };
        beats.max(1)
    }

    /// Grid beats per quarter note. A grid beat is one `denominator` note,
    /// so 6/8 counts two per quarter and 2/2 counts one half.
    pub fn pulses_per_quarter(&self) -> f64 {
        self.denominator.max(1) as f64 / 4.0
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

/// A new time signature taking effect at the start of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignatureChange {
    /// Zero-based measure index where the signature takes effect
    pub measure_number: u32,
    pub time_signature: TimeSignature,
}

/// Time-signature changes ordered by measure, at most one per measure.
///
/// The change with the greatest `measure_number <= m` governs measure `m`;
/// measures before the first change use the composition's base signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimeSignatureChange>", into = "Vec<TimeSignatureChange>")]
pub struct TimeSignatureChanges {
    changes: Vec<TimeSignatureChange>,
}

impl TimeSignatureChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a change, keeping the set sorted. A second change at the same
    /// measure is rejected instead of silently shadowing the first.
    pub fn insert(&mut self, change: TimeSignatureChange) -> Result<()> {
        match self
            .changes
            .binary_search_by_key(&change.measure_number, |c| c.measure_number)
        {
            Ok(_) => {
                log::warn!(
                    "rejecting duplicate time signature change at measure {}",
                    change.measure_number
                );
                Err(Error::DuplicateTimeSignatureChange {
                    measure: change.measure_number,
                })
            }
            Err(pos) => {
                self.changes.insert(pos, change);
                Ok(())
            }
        }
    }

    /// Remove the change at `measure`, returning it if present.
    pub fn remove(&mut self, measure: u32) -> Option<TimeSignatureChange> {
        let pos = self
            .changes
            .binary_search_by_key(&measure, |c| c.measure_number)
            .ok()?;
        Some(self.changes.remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeSignatureChange> {
        self.changes.iter()
    }

    /// The signature set by the last change at or before `measure`, if any.
    pub fn signature_at(&self, measure: u32) -> Option<TimeSignature> {
        let idx = self.changes.partition_point(|c| c.measure_number <= measure);
        idx.checked_sub(1).map(|i| self.changes[i].time_signature)
    }

    /// Beat units of `measure`, falling back to `base` before the first change.
    pub fn beats_for_measure(&self, base: TimeSignature, measure: u32) -> u32 {
        self.signature_at(measure)
            .unwrap_or(base)
            .beats_per_measure()
    }
}

impl TryFrom<Vec<TimeSignatureChange>> for TimeSignatureChanges {
    type Error = Error;

    fn try_from(changes: Vec<TimeSignatureChange>) -> Result<Self> {
        let mut set = Self::new();
        for change in changes {
            set.insert(change)?;
        }
        Ok(set)
    }
}

impl From<TimeSignatureChanges> for Vec<TimeSignatureChange> {
    fn from(set: TimeSignatureChanges) -> Self {
        set.changes
    }
}

impl<'a> IntoIterator for &'a TimeSignatureChanges {
    type Item = &'a TimeSignatureChange;
    type IntoIter = std::slice::Iter<'a, TimeSignatureChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Everything the layout engine needs to know about a piece.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Composition {
    /// Signature in effect from measure 0
    pub time_signature: TimeSignature,
    pub time_signature_changes: TimeSignatureChanges,
    pub notes: Vec<Event>,
    pub repeat_markers: Vec<RepeatMarker>,
    pub volta_brackets: Vec<VoltaBracket>,
    pub lyrics: Vec<Lyric>,
}

impl Composition {
    /// Last beat any event occupies (0 for an empty composition).
    pub fn total_beats(&self) -> f64 {
        self.notes
            .iter()
            .map(Event::end_beat)
            .fold(0.0, f64::max)
    }
}
