//! One-shot projection for hosts: compute the layout for a composition and
//! derive every row-relative value from that single snapshot.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::constants::{DEFAULT_CONTAINER_WIDTH, MAX_RENDERED_ROWS};
use crate::layout::{
    compute_layout, LayoutConfig, LayoutInputs, LayoutOptions, RowResolver, RowSpan,
};
use crate::legacy::{LegacyAdapter, LegacyEvent, LegacyRepeatMarker};
use crate::model::Composition;

/// What the host sends: container size, settings, and the composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectionRequest {
    pub container_width: f64,
    pub options: LayoutOptions,
    pub composition: Composition,
}

impl Default for ProjectionRequest {
    fn default() -> Self {
        Self {
            container_width: DEFAULT_CONTAINER_WIDTH,
            options: LayoutOptions::default(),
            composition: Composition::default(),
        }
    }
}

/// Layout plus the legacy renderer's view of the composition.
///
/// `system_count` and `rows` stop at `MAX_RENDERED_ROWS`; notes past that
/// keep their true row index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub layout: LayoutConfig,
    pub notes: Vec<LegacyEvent>,
    pub repeat_markers: Vec<LegacyRepeatMarker>,
    pub system_count: usize,
    pub rows: Vec<RowSpan>,
}

pub fn project(request: &ProjectionRequest) -> Projection {
    let composition = &request.composition;
    let layout = compute_layout(&LayoutInputs {
        container_width: request.container_width,
        time_signature: composition.time_signature,
        total_beats: composition.total_beats(),
        options: request.options,
    });

    let changes = &composition.time_signature_changes;
    let adapter = LegacyAdapter::new(&layout, changes);
    let mut system_count = adapter.system_count(&composition.notes);
    if system_count > MAX_RENDERED_ROWS {
        log::warn!(
            "composition needs {system_count} rows, laying out the first {MAX_RENDERED_ROWS}"
        );
        system_count = MAX_RENDERED_ROWS;
    }
    let rows = RowResolver::for_layout(&layout, changes).row_spans(system_count, &layout);

    Projection {
        notes: adapter.to_legacy_notes(&composition.notes),
        repeat_markers: adapter.to_legacy_repeat_markers(&composition.repeat_markers),
        system_count,
        rows,
        layout,
    }
}

/// JSON request in, JSON projection out.
pub fn project_json(request_json: &str) -> Result<String> {
    let request: ProjectionRequest = serde_json::from_str(request_json)?;
    projection_to_json(&project(&request))
}

pub fn projection_to_json(projection: &Projection) -> Result<String> {
    Ok(serde_json::to_string(projection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Event;

    #[test]
    fn projection_uses_one_snapshot() {
        let mut request = ProjectionRequest {
            container_width: 800.0,
            ..ProjectionRequest::default()
        };
        request.options.measures_per_row = crate::layout::MeasuresPerRow::Fixed(2);
        request.composition.notes = vec![
            Event::new("a", "C4", 1.0, 0.0),
            Event::new("b", "G4", 2.0, 9.0),
        ];

        let projection = project(&request);
        assert_eq!(projection.layout.beats_per_row, 8);
        assert_eq!(projection.layout.total_rows, 2);
        assert_eq!(projection.system_count, 2);
        assert_eq!(projection.rows.len(), 2);
        assert_eq!(projection.notes[1].system, 1);
        assert_eq!(projection.notes[1].beat, 1.0);
    }

    #[test]
    fn json_round_trip_through_host_shape() {
        let json = r#"{
            "containerWidth": 800,
            "options": {"measuresPerRow": 2},
            "composition": {
                "timeSignature": {"numerator": 4, "denominator": 4},
                "timeSignatureChanges": [
                    {"measureNumber": 2, "timeSignature": {"numerator": 6, "denominator": 8}}
                ],
                "notes": [{"id": "n1", "pitch": "C4", "duration": 1, "absoluteBeat": 12}],
                "repeatMarkers": [{"id": "r1", "pairId": "p1", "type": "start", "measureNumber": 3}]
            }
        }"#;
        let out: serde_json::Value = serde_json::from_str(&project_json(json).unwrap()).unwrap();
        assert_eq!(out["notes"][0]["system"], 1);
        assert_eq!(out["notes"][0]["beat"], 4.0);
        assert_eq!(out["repeatMarkers"][0]["system"], 1);
        assert_eq!(out["repeatMarkers"][0]["measure"], 1);
        assert_eq!(out["rows"][1]["beatCount"], 12.0);
    }

    #[test]
    fn distant_note_caps_rows() {
        let json = r#"{
            "containerWidth": 800,
            "composition": {
                "notes": [{"id": "n", "pitch": "C4", "duration": 1, "absoluteBeat": 1e12}]
            }
        }"#;
        let out: serde_json::Value = serde_json::from_str(&project_json(json).unwrap()).unwrap();
        assert_eq!(out["systemCount"], MAX_RENDERED_ROWS);
        assert_eq!(out["rows"].as_array().map(Vec::len), Some(MAX_RENDERED_ROWS));
        assert_eq!(out["notes"][0]["system"], 62_500_000_000u64);
        assert_eq!(out["notes"][0]["beat"], 0.0);
    }

    #[test]
    fn distant_note_with_changes_caps_rows() {
        let mut request = ProjectionRequest::default();
        request.composition.time_signature_changes = vec![crate::model::TimeSignatureChange {
            measure_number: 2,
            time_signature: crate::model::TimeSignature { numerator: 6, denominator: 8 },
        }]
        .try_into()
        .unwrap();
        request.composition.notes = vec![Event::new("n", "C4", 1.0, 1e12)];

        let projection = project(&request);
        assert_eq!(projection.system_count, MAX_RENDERED_ROWS);
        assert_eq!(projection.rows.len(), MAX_RENDERED_ROWS);
        assert!(projection.notes[0].system > MAX_RENDERED_ROWS);
    }

    #[test]
    fn malformed_request_is_an_error() {
        assert!(project_json("{not json").is_err());
    }
}
