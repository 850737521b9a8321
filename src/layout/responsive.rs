//! Responsive layout: how many measures fit on a row and how wide a beat
//! is, for a given container width.
//!
//! A `LayoutConfig` is an immutable snapshot. Whenever an input changes the
//! whole config is recomputed, so `measures_per_row` and `beat_width` always
//! come from the same computation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::*;
use crate::error::Error;
use crate::model::TimeSignature;

/// User preference for measures per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PreferenceRepr", into = "PreferenceRepr")]
pub enum MeasuresPerRow {
    /// Fit as many as are readable, capped at four
    #[default]
    Auto,
    /// Requested count, clamped to what fits
    Fixed(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PreferenceRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<PreferenceRepr> for MeasuresPerRow {
    type Error = Error;

    fn try_from(repr: PreferenceRepr) -> Result<Self, Error> {
        match repr {
            PreferenceRepr::Count(0) => Err(Error::InvalidPreference("0".to_string())),
            PreferenceRepr::Count(n) => Ok(MeasuresPerRow::Fixed(n)),
            PreferenceRepr::Keyword(s) => s.parse(),
        }
    }
}

impl From<MeasuresPerRow> for PreferenceRepr {
    fn from(pref: MeasuresPerRow) -> Self {
        match pref {
            MeasuresPerRow::Auto => PreferenceRepr::Keyword("auto".to_string()),
            MeasuresPerRow::Fixed(n) => PreferenceRepr::Count(n),
        }
    }
}

impl FromStr for MeasuresPerRow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(MeasuresPerRow::Auto);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(MeasuresPerRow::Fixed(n)),
            _ => Err(Error::InvalidPreference(s.to_string())),
        }
    }
}

impl fmt::Display for MeasuresPerRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasuresPerRow::Auto => f.write_str("auto"),
            MeasuresPerRow::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Host/user settings that shape the layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub measures_per_row: MeasuresPerRow,
    pub min_beat_width: f64,
    pub max_beat_width: f64,
    pub left_margin: f64,
    pub right_margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            measures_per_row: MeasuresPerRow::Auto,
            min_beat_width: DEFAULT_MIN_BEAT_WIDTH,
            max_beat_width: DEFAULT_MAX_BEAT_WIDTH,
            left_margin: DEFAULT_LEFT_MARGIN,
            right_margin: DEFAULT_RIGHT_MARGIN,
        }
    }
}

/// Every input the layout depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutInputs {
    pub container_width: f64,
    pub time_signature: TimeSignature,
    /// Length of the composition in beats, for the row count
    pub total_beats: f64,
    pub options: LayoutOptions,
}

impl Default for LayoutInputs {
    fn default() -> Self {
        Self {
            container_width: DEFAULT_CONTAINER_WIDTH,
            time_signature: TimeSignature::COMMON,
            total_beats: 0.0,
            options: LayoutOptions::default(),
        }
    }
}

/// Derived layout for one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub measures_per_row: u32,
    pub beats_per_measure: u32,
    /// Width of one beat column in pixels
    pub beat_width: f64,
    pub beats_per_row: u32,
    pub container_width: f64,
    /// Width of the staff content of a full row (excluding margins)
    pub row_width: f64,
    pub total_rows: usize,
    pub left_margin: f64,
    pub right_margin: f64,
    /// Base time signature the row partition was computed for
    pub time_signature: TimeSignature,
}

impl LayoutConfig {
    pub fn beats_per_row_f64(&self) -> f64 {
        self.beats_per_row as f64
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        compute_layout(&LayoutInputs::default())
    }
}

/// Compute the layout for a set of inputs. Pure: equal inputs give equal output.
pub fn compute_layout(inputs: &LayoutInputs) -> LayoutConfig {
    let opts = &inputs.options;
    let beats_per_measure = inputs.time_signature.beats_per_measure();

    let min_beat_width = if opts.min_beat_width.is_finite() && opts.min_beat_width > 0.0 {
        opts.min_beat_width
    } else {
        log::warn!(
            "min beat width {} is not positive, using {MIN_SAFE_BEAT_WIDTH}",
            opts.min_beat_width
        );
        MIN_SAFE_BEAT_WIDTH
    };
    let max_beat_width =
        if opts.max_beat_width.is_finite() && opts.max_beat_width >= min_beat_width {
            opts.max_beat_width
        } else {
            log::warn!(
                "max beat width {} is below min beat width {min_beat_width}, using the minimum",
                opts.max_beat_width
            );
            min_beat_width
        };
    let left_margin = non_negative(opts.left_margin);
    let right_margin = non_negative(opts.right_margin);

    let mut available = inputs.container_width - left_margin - right_margin;
    if !available.is_finite() || available <= 0.0 {
        log::warn!(
            "container width {} leaves no room between margins, laying out a single beat",
            inputs.container_width
        );
        available = min_beat_width;
    }

    let measure_min_width = beats_per_measure as f64 * min_beat_width;
    let max_fit = ((available / measure_min_width).floor() as u32).max(1);

    let measures_per_row = match opts.measures_per_row {
        MeasuresPerRow::Auto => max_fit.min(AUTO_MAX_MEASURES_PER_ROW),
        MeasuresPerRow::Fixed(requested) => requested.clamp(1, max_fit),
    };

    let beats_per_row = measures_per_row * beats_per_measure;
    let beat_width = (available / beats_per_row as f64).clamp(min_beat_width, max_beat_width);

    let total_rows = if inputs.total_beats.is_finite() && inputs.total_beats > 0.0 {
        ((inputs.total_beats / beats_per_row as f64).ceil() as usize).max(1)
    } else {
        1
    };

    log::debug!(
        "layout: width {} -> {} measures/row, {} beats/row at {:.1}px, {} rows",
        inputs.container_width,
        measures_per_row,
        beats_per_row,
        beat_width,
        total_rows
    );

    LayoutConfig {
        measures_per_row,
        beats_per_measure,
        beat_width,
        beats_per_row,
        container_width: inputs.container_width,
        row_width: beats_per_row as f64 * beat_width,
        total_rows,
        left_margin,
        right_margin,
        time_signature: inputs.time_signature,
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// A change to one of the layout's inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutChange {
    ContainerResized(f64),
    TimeSignatureChanged(TimeSignature),
    PreferenceChanged(MeasuresPerRow),
    OptionsChanged(LayoutOptions),
    CompositionLengthChanged(f64),
}

/// Current inputs plus the snapshot computed from them.
///
/// Callers debounce resize events themselves; applying the same change
/// twice yields the same snapshot.
#[derive(Debug, Clone)]
pub struct ResponsiveLayout {
    inputs: LayoutInputs,
    config: LayoutConfig,
}

impl ResponsiveLayout {
    pub fn new(inputs: LayoutInputs) -> Self {
        Self {
            config: compute_layout(&inputs),
            inputs,
        }
    }

    /// Apply an input change and return the freshly computed snapshot.
    pub fn apply(&mut self, change: LayoutChange) -> LayoutConfig {
        match change {
            LayoutChange::ContainerResized(width) => self.inputs.container_width = width,
            LayoutChange::TimeSignatureChanged(ts) => self.inputs.time_signature = ts,
            LayoutChange::PreferenceChanged(pref) => self.inputs.options.measures_per_row = pref,
            LayoutChange::OptionsChanged(options) => self.inputs.options = options,
            LayoutChange::CompositionLengthChanged(beats) => self.inputs.total_beats = beats,
        }
        self.config = compute_layout(&self.inputs);
        self.config
    }

    pub fn inputs(&self) -> &LayoutInputs {
        &self.inputs
    }

    /// The current snapshot. Copy it once per render cycle.
    pub fn config(&self) -> LayoutConfig {
        self.config
    }
}

impl Default for ResponsiveLayout {
    fn default() -> Self {
        Self::new(LayoutInputs::default())
    }
}
