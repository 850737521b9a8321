//! MusicXML importer — reads the first part of a `score-partwise` document
//! into a canonical `Composition` on the half-beat editor grid.
//!
//! Measures are addressed by their zero-based position in the part, not by
//! their `number` attribute (pickup measures are often numbered 0).
//!
//! Beats are counted in the running meter's pulse, the same unit the row
//! layout uses: a quarter is one beat in 4/4 and two in 6/8. `tempo_bpm`
//! stays in quarter notes per minute as written in the file.

use std::collections::{BTreeMap, HashMap};

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::constants::DEFAULT_TEMPO;
use crate::layout::snap_to_half_beat;
use crate::model::*;

/// Divisions per quarter note when the file never declares any.
const DEFAULT_DIVISIONS: i32 = 2;

const SHARPS_ORDER: [char; 7] = ['F', 'C', 'G', 'D', 'A', 'E', 'B'];
const FLATS_ORDER: [char; 7] = ['B', 'E', 'A', 'D', 'G', 'C', 'F'];

/// A composition read from MusicXML, with the header facts the editor shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedScore {
    pub title: Option<String>,
    /// Key signature at the start: sharps positive, flats negative
    pub key_fifths: i32,
    pub tempo_bpm: f64,
    /// Beats covered by all measures
    pub total_beats: f64,
    pub composition: Composition,
}

struct RawNote {
    pitch: String,
    duration: f64,
    beat: f64,
    tie_start: bool,
    tie_stop: bool,
}

struct RepeatSign {
    measure: u32,
    forward: bool,
}

struct EndingSign {
    measure: u32,
    number: String,
    start: bool,
}

/// Running state while walking the measures in order.
struct ImportState {
    divisions: i32,
    fifths: i32,
    time: TimeSignature,
    beat: f64,
    notes: Vec<RawNote>,
    rests: Vec<(f64, f64)>,
    lyrics: Vec<Lyric>,
    repeats: Vec<RepeatSign>,
    endings: Vec<EndingSign>,
    changes: TimeSignatureChanges,
    /// Alterations written earlier in the current measure, by step letter
    measure_accidentals: HashMap<char, i32>,
}

impl ImportState {
    /// Grid beats spanned by `duration` divisions under the running meter.
    fn beats(&self, duration: i32) -> f64 {
        duration as f64 / self.divisions as f64 * self.time.pulses_per_quarter()
    }
}

/// Parse a MusicXML string. `slug` prefixes every generated id.
pub fn parse_musicxml(xml: &str, slug: &str) -> Result<ImportedScore> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(Error::UnsupportedRoot(root.tag_name().name().to_string()));
    }

    let title = root
        .descendants()
        .find(|n| n.has_tag_name("work-title") || n.has_tag_name("movement-title"))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let part = root.children().find(|n| n.has_tag_name("part"));

    let mut state = ImportState {
        divisions: first_i32(root, "divisions").unwrap_or(DEFAULT_DIVISIONS).max(1),
        fifths: first_i32(root, "fifths").unwrap_or(0),
        time: root
            .descendants()
            .find(|n| n.has_tag_name("time"))
            .and_then(|n| parse_time(&n))
            .unwrap_or_default(),
        beat: 0.0,
        notes: Vec::new(),
        rests: Vec::new(),
        lyrics: Vec::new(),
        repeats: Vec::new(),
        endings: Vec::new(),
        changes: TimeSignatureChanges::new(),
        measure_accidentals: HashMap::new(),
    };
    let key_fifths = state.fifths;
    let base_time = state.time;

    let tempo_bpm = part
        .and_then(|p| {
            p.descendants()
                .filter(|n| n.has_tag_name("sound"))
                .find_map(|n| n.attribute("tempo").and_then(|t| t.parse::<f64>().ok()))
        })
        .filter(|t| *t > 0.0)
        .unwrap_or(DEFAULT_TEMPO);

    if let Some(part) = part {
        for (index, measure) in part
            .children()
            .filter(|n| n.has_tag_name("measure"))
            .enumerate()
        {
            parse_measure(&measure, index as u32, &mut state);
        }
    } else {
        log::warn!("MusicXML document has no <part>, importing an empty composition");
    }

    let notes = merge_ties(state.notes);
    let mut events: Vec<Event> = notes
        .into_iter()
        .map(|n| Event::new(String::new(), n.pitch, round2(n.duration), n.beat))
        .chain(
            state
                .rests
                .iter()
                .map(|&(beat, dur)| Event::new(String::new(), REST_PITCH, round2(dur), beat)),
        )
        .collect();
    events.sort_by(|a, b| {
        a.absolute_beat
            .total_cmp(&b.absolute_beat)
            .then(a.is_rest().cmp(&b.is_rest()))
    });

    let (mut note_num, mut rest_num) = (1, 1);
    for event in &mut events {
        if event.is_rest() {
            event.id = format!("{slug}-r{rest_num}");
            rest_num += 1;
        } else {
            event.id = format!("{slug}-{note_num}");
            note_num += 1;
        }
    }

    log::info!(
        "imported {} notes, {} rests, {} time signature changes over {} beats",
        note_num - 1,
        rest_num - 1,
        state.changes.len(),
        state.beat
    );

    Ok(ImportedScore {
        title,
        key_fifths,
        tempo_bpm,
        total_beats: state.beat,
        composition: Composition {
            time_signature: base_time,
            time_signature_changes: state.changes,
            notes: events,
            repeat_markers: pair_repeats(&state.repeats, slug),
            volta_brackets: pair_endings(&state.endings, slug),
            lyrics: state.lyrics,
        },
    })
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node, index: u32, state: &mut ImportState) {
    state.measure_accidentals.clear();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => parse_attributes(&child, index, state),
            "barline" => parse_barline(&child, index, state),
            "note" => parse_note(&child, state),
            "backup" => {
                let dur = state.beats(child_i32(&child, "duration").unwrap_or(0));
                state.beat = (state.beat - dur).max(0.0);
            }
            "forward" => state.beat += state.beats(child_i32(&child, "duration").unwrap_or(0)),
            _ => {}
        }
    }
}

fn parse_attributes(node: &Node, index: u32, state: &mut ImportState) {
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => {
                if let Some(d) = parse_i32(&child) {
                    state.divisions = d.max(1);
                }
            }
            "key" => {
                if let Some(fifths) = child_i32(&child, "fifths") {
                    if fifths != state.fifths {
                        log::debug!("measure {index}: key change to {fifths} fifths");
                        state.fifths = fifths;
                    }
                }
            }
            "time" => {
                let Some(ts) = parse_time(&child) else {
                    log::warn!(
                        "measure {index}: unsupported time signature, keeping {}/{}",
                        state.time.numerator,
                        state.time.denominator
                    );
                    continue;
                };
                if ts != state.time {
                    log::debug!(
                        "measure {index}: time signature change to {}/{}",
                        ts.numerator,
                        ts.denominator
                    );
                    state.time = ts;
                    let change = TimeSignatureChange {
                        measure_number: index,
                        time_signature: ts,
                    };
                    // a later <attributes> in the same measure overrides
                    state.changes.remove(index);
                    if let Err(e) = state.changes.insert(change) {
                        log::warn!("measure {index}: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

fn parse_time(node: &Node) -> Option<TimeSignature> {
    let beats = child_i32(node, "beats")?;
    let beat_type = child_i32(node, "beat-type")?;
    TimeSignature::new(u32::try_from(beats).ok()?, u32::try_from(beat_type).ok()?).ok()
}

fn parse_barline(node: &Node, index: u32, state: &mut ImportState) {
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "repeat" => state.repeats.push(RepeatSign {
                measure: index,
                forward: child.attribute("direction") == Some("forward"),
            }),
            "ending" => {
                let kind = child.attribute("type").unwrap_or("");
                state.endings.push(EndingSign {
                    measure: index,
                    number: child.attribute("number").unwrap_or("1").to_string(),
                    start: kind == "start",
                });
            }
            _ => {}
        }
    }
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node, state: &mut ImportState) {
    // grace and cue notes carry no duration and take no time
    let Some(duration) = child_i32(node, "duration") else {
        return;
    };
    let dur_beats = state.beats(duration);

    if has_child(node, "rest") {
        state.rests.push((snap_to_half_beat(state.beat), dur_beats));
        state.beat += dur_beats;
        return;
    }

    let Some(pitch_node) = node.children().find(|n| n.has_tag_name("pitch")) else {
        // unpitched percussion
        state.beat += dur_beats;
        return;
    };
    let is_chord = has_child(node, "chord");
    let pitch = spell_pitch(&pitch_node, state);

    let beat = if is_chord {
        state
            .notes
            .last()
            .map(|n| n.beat)
            .unwrap_or_else(|| snap_to_half_beat(state.beat))
    } else {
        snap_to_half_beat(state.beat)
    };

    let ties: Vec<&str> = node
        .children()
        .filter(|n| n.has_tag_name("tie"))
        .filter_map(|n| n.attribute("type"))
        .collect();

    for lyric in node.children().filter(|n| n.has_tag_name("lyric")) {
        let text = lyric
            .children()
            .find(|n| n.has_tag_name("text"))
            .and_then(|n| n.text())
            .unwrap_or("");
        if !text.is_empty() {
            state.lyrics.push(Lyric {
                text: text.to_string(),
                absolute_beat: beat,
            });
        }
    }

    state.notes.push(RawNote {
        pitch,
        duration: dur_beats,
        beat,
        tie_start: ties.contains(&"start"),
        tie_stop: ties.contains(&"stop"),
    });

    if !is_chord {
        state.beat += dur_beats;
    }
}

/// Spell a pitch as the editor names it: explicit alteration first, then
/// an accidental earlier in the measure, then the key signature.
fn spell_pitch(node: &Node, state: &mut ImportState) -> String {
    let step = node
        .children()
        .find(|n| n.has_tag_name("step"))
        .and_then(|n| n.text())
        .and_then(|t| t.trim().chars().next())
        .unwrap_or('C')
        .to_ascii_uppercase();
    let octave = child_i32(node, "octave").unwrap_or(4);

    let alter = match node
        .children()
        .find(|n| n.has_tag_name("alter"))
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<f64>().ok())
    {
        Some(alter) => {
            let alter = alter as i32;
            state.measure_accidentals.insert(step, alter);
            alter
        }
        None => match state.measure_accidentals.get(&step) {
            Some(&alter) => alter,
            None => key_alteration(state.fifths, step),
        },
    };

    let accidental = match alter {
        2 => "##",
        1 => "#",
        -1 => "b",
        -2 => "bb",
        _ => "",
    };
    format!("{step}{accidental}{octave}")
}

fn key_alteration(fifths: i32, step: char) -> i32 {
    let count = fifths.unsigned_abs().min(7) as usize;
    if fifths > 0 && SHARPS_ORDER[..count].contains(&step) {
        1
    } else if fifths < 0 && FLATS_ORDER[..count].contains(&step) {
        -1
    } else {
        0
    }
}

/// Fold tied continuations into the note that starts the tie.
fn merge_ties(notes: Vec<RawNote>) -> Vec<RawNote> {
    let mut absorbed = vec![false; notes.len()];
    let mut durations: Vec<f64> = notes.iter().map(|n| n.duration).collect();

    for i in 0..notes.len() {
        if absorbed[i] || !notes[i].tie_start {
            continue;
        }
        for j in i + 1..notes.len() {
            if absorbed[j] || notes[j].pitch != notes[i].pitch || !notes[j].tie_stop {
                continue;
            }
            durations[i] += notes[j].duration;
            absorbed[j] = true;
            if !notes[j].tie_start {
                break;
            }
        }
    }

    notes
        .into_iter()
        .zip(durations)
        .zip(absorbed)
        .filter(|(_, absorbed)| !absorbed)
        .map(|((note, duration), _)| RawNote { duration, ..note })
        .collect()
}

// ─── Repeats & voltas ────────────────────────────────────────────────

/// Pair every backward repeat with the latest forward repeat before it.
/// A backward repeat with no forward one repeats from the start and only
/// gets an end marker.
fn pair_repeats(signs: &[RepeatSign], slug: &str) -> Vec<RepeatMarker> {
    let mut markers = Vec::new();
    let backwards = signs.iter().filter(|s| !s.forward);

    for (k, backward) in backwards.enumerate() {
        let pair_id = format!("{slug}-repeat-{}", k + 1);
        let forward = signs
            .iter()
            .filter(|s| s.forward && s.measure < backward.measure)
            .last();
        if let Some(forward) = forward {
            markers.push(RepeatMarker {
                id: format!("{slug}-repeat-start-{}", k + 1),
                pair_id: pair_id.clone(),
                marker_type: RepeatType::Start,
                measure_number: forward.measure,
            });
        }
        markers.push(RepeatMarker {
            id: format!("{slug}-repeat-end-{}", k + 1),
            pair_id,
            marker_type: RepeatType::End,
            measure_number: backward.measure,
        });
    }
    markers
}

fn pair_endings(signs: &[EndingSign], slug: &str) -> Vec<VoltaBracket> {
    let mut groups: BTreeMap<&str, Vec<&EndingSign>> = BTreeMap::new();
    for sign in signs {
        groups.entry(sign.number.as_str()).or_default().push(sign);
    }

    let mut brackets = Vec::new();
    for (number, group) in groups {
        for start in group.iter().filter(|s| s.start) {
            let end_measure = group
                .iter()
                .find(|s| !s.start && s.measure >= start.measure)
                .map_or(start.measure, |s| s.measure);
            brackets.push(VoltaBracket {
                id: format!("{slug}-volta-{}", brackets.len() + 1),
                number: number.to_string(),
                start_measure: start.measure,
                end_measure,
            });
        }
    }
    brackets
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn has_child(node: &Node, name: &str) -> bool {
    node.children().any(|n| n.has_tag_name(name))
}

fn first_i32(node: Node, name: &str) -> Option<i32> {
    node.descendants()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| parse_i32(&n))
}

fn child_i32(node: &Node, name: &str) -> Option<i32> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| parse_i32(&n))
}

fn parse_i32(node: &Node) -> Option<i32> {
    node.text().and_then(|t| t.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(measures: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">{measures}</part>
</score-partwise>"#
        )
    }

    fn note(step: &str, octave: i32, duration: i32, extra: &str) -> String {
        format!(
            "<note><pitch><step>{step}</step><octave>{octave}</octave></pitch>\
             <duration>{duration}</duration>{extra}</note>"
        )
    }

    #[test]
    fn key_signature_and_measure_accidentals() {
        let xml = wrap(&format!(
            r#"<measure number="1">
                 <attributes><divisions>1</divisions><key><fifths>1</fifths></key>
                   <time><beats>4</beats><beat-type>4</beat-type></time></attributes>
                 {}{}{}{}
               </measure>
               <measure number="2">{}</measure>"#,
            note("F", 4, 1, ""),
            "<note><pitch><step>C</step><alter>1</alter><octave>5</octave></pitch><duration>1</duration></note>",
            note("C", 5, 1, ""),
            "<note><pitch><step>F</step><alter>0</alter><octave>4</octave></pitch><duration>1</duration></note>",
            note("C", 5, 4, ""),
        ));
        let score = parse_musicxml(&xml, "t").unwrap();
        let pitches: Vec<&str> = score.composition.notes.iter().map(|n| n.pitch.as_str()).collect();
        // F# from the key, C# carried through the measure, explicit natural,
        // and the accidental reset at the barline
        assert_eq!(pitches, vec!["F#4", "C#5", "C#5", "F4", "C5"]);
        assert_eq!(score.key_fifths, 1);
        assert_eq!(score.total_beats, 8.0);
    }

    #[test]
    fn chords_share_a_beat_and_ties_merge() {
        let xml = wrap(&format!(
            r#"<measure number="1"><attributes><divisions>2</divisions></attributes>
                 {}{}{}
               </measure>
               <measure number="2">{}{}</measure>"#,
            note("C", 4, 4, ""),
            note("E", 4, 4, "<chord/>"),
            note("G", 4, 4, r#"<tie type="start"/>"#),
            note("G", 4, 2, r#"<tie type="stop"/>"#),
            note("A", 4, 6, ""),
        ));
        let score = parse_musicxml(&xml, "t").unwrap();
        let notes = &score.composition.notes;
        assert_eq!(notes.len(), 4);
        assert_eq!((notes[0].pitch.as_str(), notes[0].absolute_beat), ("C4", 0.0));
        assert_eq!((notes[1].pitch.as_str(), notes[1].absolute_beat), ("E4", 0.0));
        assert_eq!((notes[2].pitch.as_str(), notes[2].duration), ("G4", 3.0));
        assert_eq!(notes[3].absolute_beat, 5.0);
        assert_eq!(notes[3].id, "t-4");
    }

    #[test]
    fn rests_follow_notes_on_the_same_beat() {
        let xml = wrap(&format!(
            r#"<measure number="1"><attributes><divisions>1</divisions></attributes>
                 <note><rest/><duration>1</duration><voice>2</voice></note>
                 <backup><duration>1</duration></backup>
                 {}
               </measure>"#,
            note("D", 4, 1, ""),
        ));
        let score = parse_musicxml(&xml, "song").unwrap();
        let ids: Vec<&str> = score.composition.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["song-1", "song-r1"]);
        assert!(score.composition.notes[1].is_rest());
    }

    #[test]
    fn off_grid_positions_snap_to_half_beats() {
        let xml = wrap(&format!(
            r#"<measure number="1"><attributes><divisions>4</divisions></attributes>
                 {}{}
               </measure>"#,
            note("C", 4, 1, ""),
            note("D", 4, 4, ""),
        ));
        let score = parse_musicxml(&xml, "t").unwrap();
        assert_eq!(score.composition.notes[0].duration, 0.25);
        assert_eq!(score.composition.notes[1].absolute_beat, 0.5);
    }

    #[test]
    fn time_changes_repeats_and_voltas_use_measure_positions() {
        let xml = wrap(&format!(
            r#"<measure number="0" implicit="yes">
                 <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
                 {}
               </measure>
               <measure number="1">
                 <barline location="left"><repeat direction="forward"/></barline>
                 {}
               </measure>
               <measure number="2">
                 <attributes><time><beats>6</beats><beat-type>8</beat-type></time></attributes>
                 <barline location="left"><ending number="1" type="start"/></barline>
                 {}
                 <barline location="right"><ending number="1" type="stop"/><repeat direction="backward"/></barline>
               </measure>
               <measure number="3">
                 <barline location="left"><ending number="2" type="start"/></barline>
                 {}
                 <barline location="right"><ending number="2" type="discontinue"/></barline>
               </measure>"#,
            note("C", 4, 4, ""),
            note("C", 4, 4, ""),
            note("C", 4, 3, ""),
            note("C", 4, 3, ""),
        ));
        let score = parse_musicxml(&xml, "s").unwrap();
        let comp = &score.composition;

        let changes: Vec<_> = comp.time_signature_changes.iter().copied().collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].measure_number, 2);
        assert_eq!(changes[0].time_signature, TimeSignature { numerator: 6, denominator: 8 });

        assert_eq!(comp.repeat_markers.len(), 2);
        assert_eq!(comp.repeat_markers[0].marker_type, RepeatType::Start);
        assert_eq!(comp.repeat_markers[0].measure_number, 1);
        assert_eq!(comp.repeat_markers[1].measure_number, 2);
        assert_eq!(comp.repeat_markers[0].pair_id, comp.repeat_markers[1].pair_id);

        assert_eq!(comp.volta_brackets.len(), 2);
        let first = &comp.volta_brackets[0];
        assert_eq!((first.start_measure, first.end_measure), (2, 2));
        assert_eq!(comp.volta_brackets[1].number, "2");
        assert_eq!(comp.volta_brackets[1].end_measure, 3);

        // a dotted half fills each 6/8 bar and counts six pulses
        let beats: Vec<(f64, f64)> = comp
            .notes
            .iter()
            .map(|n| (n.absolute_beat, n.duration))
            .collect();
        assert_eq!(beats, vec![(0.0, 4.0), (4.0, 4.0), (8.0, 6.0), (14.0, 6.0)]);
        assert_eq!(score.total_beats, 20.0);
    }

    #[test]
    fn compound_meter_backup_counts_pulses() {
        let xml = wrap(&format!(
            r#"<measure number="1">
                 <attributes><divisions>2</divisions><time><beats>6</beats><beat-type>8</beat-type></time></attributes>
                 {}
                 <backup><duration>3</duration></backup>
                 {}
               </measure>"#,
            note("A", 4, 6, ""),
            note("C", 4, 3, "<voice>2</voice>"),
        ));
        let score = parse_musicxml(&xml, "t").unwrap();
        let notes = &score.composition.notes;
        assert_eq!((notes[0].pitch.as_str(), notes[0].duration), ("A4", 6.0));
        assert_eq!((notes[1].pitch.as_str(), notes[1].absolute_beat), ("C4", 3.0));
    }

    #[test]
    fn lyrics_and_tempo() {
        let xml = wrap(&format!(
            r#"<measure number="1"><attributes><divisions>1</divisions></attributes>
                 <sound tempo="90"/>
                 {}
               </measure>"#,
            note("E", 4, 2, "<lyric number=\"1\"><syllabic>single</syllabic><text>la</text></lyric>"),
        ));
        let score = parse_musicxml(&xml, "t").unwrap();
        assert_eq!(score.tempo_bpm, 90.0);
        assert_eq!(score.composition.lyrics.len(), 1);
        assert_eq!(score.composition.lyrics[0].text, "la");
    }

    #[test]
    fn rejects_timewise_scores() {
        let err = parse_musicxml("<score-timewise/>", "t").unwrap_err();
        assert!(matches!(err, Error::UnsupportedRoot(ref r) if r == "score-timewise"));
    }
}
