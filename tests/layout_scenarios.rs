//! Layout scenarios — row partitioning, addressing and note heads through
//! the public API.

use pretty_assertions::assert_eq;
use scorelayout::*;

fn inputs(container_width: f64, measures_per_row: MeasuresPerRow) -> LayoutInputs {
    LayoutInputs {
        container_width,
        options: LayoutOptions {
            measures_per_row,
            ..LayoutOptions::default()
        },
        ..LayoutInputs::default()
    }
}

fn six_eight_at(measure: u32) -> TimeSignatureChanges {
    let mut changes = TimeSignatureChanges::new();
    changes
        .insert(TimeSignatureChange {
            measure_number: measure,
            time_signature: TimeSignature::new(6, 8).unwrap(),
        })
        .unwrap();
    changes
}

#[test]
fn beat_eight_starts_the_second_row() {
    let layout = compute_layout(&inputs(800.0, MeasuresPerRow::Fixed(2)));
    assert_eq!(layout.beats_per_row, 8);

    let pos = locate(8.0, &layout);
    assert_eq!((pos.row, pos.beat_in_row), (1, 0.0));
}

#[test]
fn six_eight_change_stretches_row_one() {
    let layout = compute_layout(&inputs(800.0, MeasuresPerRow::Fixed(2)));
    let changes = six_eight_at(2);
    let resolver = RowResolver::for_layout(&layout, &changes);

    // row 1 holds measures 2-3 at 6 units each and starts at beat 8
    assert_eq!(resolver.system_start_beats(2), vec![0.0, 8.0, 20.0]);
    assert_eq!(resolver.resolve(12.0), (1, 4.0));
    assert_eq!(resolver.resolve(16.0), (1, 8.0));
    assert_eq!(resolver.resolve(20.0), (2, 0.0));
}

#[test]
fn auto_never_exceeds_four_measures() {
    let mut inp = inputs(800.0, MeasuresPerRow::Auto);
    inp.options.left_margin = 100.0;
    inp.options.right_margin = 20.0;
    inp.options.min_beat_width = 40.0;
    assert_eq!(compute_layout(&inp).measures_per_row, 4);

    for width in [1200.0, 2400.0, 10_000.0] {
        inp.container_width = width;
        let layout = compute_layout(&inp);
        assert_eq!(layout.measures_per_row, 4, "width {width}");
    }
}

#[test]
fn empty_composition_has_one_system() {
    let layout = compute_layout(&inputs(800.0, MeasuresPerRow::Auto));
    assert_eq!(calculate_legacy_system_count(&[], &layout), 1);
    assert_eq!(layout.total_rows, 1);
}

#[test]
fn note_head_thresholds() {
    assert_eq!(note_head_category(2.0), NoteHeadCategory::Hollow);
    assert_eq!(note_head_category(1.999), NoteHeadCategory::Filled);
    assert_eq!(note_head_category(4.0), NoteHeadCategory::Whole);
}

#[test]
fn clicks_snap_to_half_beats_with_quarter_ties_rounding_up() {
    let layout = compute_layout(&inputs(800.0, MeasuresPerRow::Fixed(2)));
    let x_of = |beat_in_row: f64| beat_to_x(beat_in_row, &layout);

    assert_eq!(from_x_pixel(x_of(0.25), 0, &layout), 0.5);
    assert_eq!(from_x_pixel(x_of(1.25), 0, &layout), 1.5);
    assert_eq!(from_x_pixel(x_of(1.2), 0, &layout), 1.0);
    assert_eq!(from_x_pixel(x_of(0.0), 3, &layout), 24.0);
}

#[test]
fn resize_keeps_addressing_consistent() {
    let mut responsive = ResponsiveLayout::new(inputs(1600.0, MeasuresPerRow::Auto));
    let notes: Vec<Event> = (0..40)
        .map(|i| Event::new(format!("n{i}"), "C4", 0.5, i as f64 * 1.5))
        .collect();

    for width in [1600.0, 900.0, 500.0, 320.0, 1200.0] {
        let layout = responsive.apply(LayoutChange::ContainerResized(width));
        let adapter = LegacyAdapter::uniform(&layout);
        let legacy = adapter.to_legacy_notes(&notes);
        for (note, projected) in notes.iter().zip(&legacy) {
            assert!(projected.beat < layout.beats_per_row as f64);
            assert_eq!(
                projected.system as f64 * layout.beats_per_row as f64 + projected.beat,
                note.absolute_beat
            );
        }
        assert_eq!(adapter.from_legacy_notes(&legacy), notes);
    }
}
