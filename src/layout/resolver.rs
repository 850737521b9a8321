//! Row resolution when time-signature changes make rows hold different
//! numbers of beats.
//!
//! Rows always hold `measures_per_row` measures. Each measure contributes
//! the beat units of the signature governing it, so the start beat of every
//! row is a running sum over the measures before it.

use serde::{Deserialize, Serialize};

use super::addressing::{beat_to_x, sanitize_beat, RowPosition};
use super::constants::MAX_RENDERED_ROWS;
use super::responsive::LayoutConfig;
use crate::model::{TimeSignature, TimeSignatureChanges};

/// Start beat of each row within the row partition.
///
/// `starts[i]` is where row `i` begins; the final entry is where the row
/// after the last computed one would begin.
pub type SystemStartBeats = Vec<f64>;

/// Beat extent and screen extent of one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpan {
    pub row: usize,
    pub first_measure: u32,
    pub start_beat: f64,
    pub beat_count: f64,
    pub x_start: f64,
    pub x_end: f64,
}

/// Resolves beats against an irregular row partition.
#[derive(Debug, Clone, Copy)]
pub struct RowResolver<'a> {
    base: TimeSignature,
    changes: &'a TimeSignatureChanges,
    measures_per_row: u32,
}

/// A row holding a time-signature change, and the uniform rows after it
/// up to the next such row.
#[derive(Debug, Clone, Copy)]
struct Segment {
    row: usize,
    start: f64,
    /// Beats in `row` itself, which may mix measure lengths
    first_len: f64,
    /// Beats in each later row of the segment
    rest_len: f64,
}

impl Segment {
    fn row_start(&self, row: usize) -> f64 {
        if row <= self.row {
            self.start
        } else {
            self.start + self.first_len + (row - self.row - 1) as f64 * self.rest_len
        }
    }

    fn resolve(&self, beat: f64) -> (usize, f64) {
        let into = beat - self.start;
        if into < self.first_len {
            return (self.row, into);
        }
        let rest = into - self.first_len;
        let beat_in_row = rest.rem_euclid(self.rest_len);
        let later = ((rest - beat_in_row) / self.rest_len).round();
        (self.row.saturating_add(1).saturating_add(later as usize), beat_in_row)
    }
}

impl<'a> RowResolver<'a> {
    pub fn new(
        base: TimeSignature,
        changes: &'a TimeSignatureChanges,
        measures_per_row: u32,
    ) -> Self {
        Self {
            base,
            changes,
            measures_per_row: measures_per_row.max(1),
        }
    }

    /// Resolver for the rows of `layout` (its base signature and measures per row).
    pub fn for_layout(layout: &LayoutConfig, changes: &'a TimeSignatureChanges) -> Self {
        Self::new(layout.time_signature, changes, layout.measures_per_row)
    }

    pub fn beats_for_measure(&self, measure: u32) -> f64 {
        self.changes.beats_for_measure(self.base, measure) as f64
    }

    fn first_measure(&self, row: usize) -> u32 {
        u32::try_from(row)
            .ok()
            .and_then(|r| r.checked_mul(self.measures_per_row))
            .unwrap_or(u32::MAX)
    }

    pub fn beats_in_row(&self, row: usize) -> f64 {
        let first = self.first_measure(row);
        (0..self.measures_per_row)
            .map(|i| self.beats_for_measure(first.saturating_add(i)))
            .sum()
    }

    /// Start beats for `rows` rows, plus the end of the last one. At most
    /// `MAX_RENDERED_ROWS` rows are listed.
    pub fn system_start_beats(&self, rows: usize) -> SystemStartBeats {
        let rows = if rows > MAX_RENDERED_ROWS {
            log::warn!("{rows} rows requested, listing the first {MAX_RENDERED_ROWS}");
            MAX_RENDERED_ROWS
        } else {
            rows
        };
        let mut starts = Vec::with_capacity(rows + 1);
        let mut total = 0.0;
        starts.push(total);
        for row in 0..rows {
            total += self.beats_in_row(row);
            starts.push(total);
        }
        starts
    }

    /// Rows between two changes all have the same length, so the partition
    /// is kept as one segment per row holding a change.
    fn segments(&self) -> Vec<Segment> {
        let per_row = self.measures_per_row as usize;
        let mut rows = vec![0];
        rows.extend(
            self.changes
                .iter()
                .map(|c| c.measure_number as usize / per_row),
        );
        rows.dedup();

        let mut segments: Vec<Segment> = Vec::with_capacity(rows.len());
        for row in rows {
            let start = segments.last().map_or(0.0, |prev| prev.row_start(row));
            segments.push(Segment {
                row,
                start,
                first_len: self.beats_in_row(row),
                rest_len: self.beats_in_row(row.saturating_add(1)),
            });
        }
        segments
    }

    /// Row and beat-in-row of an absolute beat. A beat exactly on a row
    /// boundary belongs to the row that starts there.
    pub fn resolve(&self, absolute_beat: f64) -> (usize, f64) {
        let beat = sanitize_beat(absolute_beat);
        let segments = self.segments();
        let index = segments
            .partition_point(|s| s.start <= beat)
            .saturating_sub(1);
        match segments.get(index) {
            Some(segment) => segment.resolve(beat),
            None => (0, beat),
        }
    }

    /// Like `resolve`, with the glyph x for `layout`.
    pub fn locate(&self, absolute_beat: f64, layout: &LayoutConfig) -> RowPosition {
        let (row, beat_in_row) = self.resolve(absolute_beat);
        RowPosition {
            row,
            beat_in_row,
            x: beat_to_x(beat_in_row, layout),
        }
    }

    /// Absolute beat of a row-relative position. Gives the same start as
    /// `system_start_beats(system + 2)[system]` for any row, including
    /// rows past the content, without listing the rows before it.
    pub fn absolute_beat(&self, system: usize, beat_in_row: f64) -> f64 {
        let segments = self.segments();
        let index = segments
            .partition_point(|s| s.row <= system)
            .saturating_sub(1);
        let start = segments.get(index).map_or(0.0, |s| s.row_start(system));
        start + beat_in_row
    }

    /// Beat and pixel extents of the first `rows` rows.
    pub fn row_spans(&self, rows: usize, layout: &LayoutConfig) -> Vec<RowSpan> {
        let starts = self.system_start_beats(rows);
        starts
            .windows(2)
            .enumerate()
            .map(|(row, w)| {
                let beat_count = w[1] - w[0];
                RowSpan {
                    row,
                    first_measure: self.first_measure(row),
                    start_beat: w[0],
                    beat_count,
                    x_start: layout.left_margin,
                    x_end: layout.left_margin + beat_count * layout.beat_width,
                }
            })
            .collect()
    }
}

/// Greatest row whose start is at or before `beat`, scanning from the end.
pub fn row_for_beat(starts: &[f64], beat: f64) -> (usize, f64) {
    let row = starts.iter().rposition(|&start| start <= beat).unwrap_or(0);
    let start = starts.get(row).copied().unwrap_or(0.0);
    (row, beat - start)
}
