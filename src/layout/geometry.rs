//! Pitch and duration geometry: where a note head sits vertically and
//! which head glyph it uses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::*;

/// Staff position used for rests and anything we cannot place.
pub const STAFF_CENTER: i32 = 0;

/// Lowest and highest supported notes, as diatonic indices (octave * 7 + step).
const LOWEST_NOTE: i32 = 3 * 7; // C3
const HIGHEST_NOTE: i32 = 6 * 7; // C6
/// Diatonic index of the treble staff's middle line (B4).
const MIDDLE_LINE_NOTE: i32 = 4 * 7 + 6;

/// A parsed pitch name such as `C4`, `F#5` or `Bb3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Letter index: C=0 .. B=6
    pub step: u8,
    /// Semitone alteration: -2..=2
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    /// Diatonic index counted from C0, ignoring accidentals.
    pub fn diatonic_index(&self) -> i32 {
        self.octave as i32 * 7 + self.step as i32
    }

    pub fn is_supported(&self) -> bool {
        (LOWEST_NOTE..=HIGHEST_NOTE).contains(&self.diatonic_index())
    }
}

impl FromStr for Pitch {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let step = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 1,
            Some('E') => 2,
            Some('F') => 3,
            Some('G') => 4,
            Some('A') => 5,
            Some('B') => 6,
            _ => return Err(()),
        };
        let rest = chars.as_str();
        let digits_at = rest
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or(())?;
        let (accidental, octave) = rest.split_at(digits_at);
        let alter = match accidental {
            "" => 0,
            "#" => 1,
            "##" | "x" => 2,
            "b" => -1,
            "bb" => -2,
            _ => return Err(()),
        };
        let octave = octave.parse::<i8>().map_err(|_| ())?;
        Ok(Pitch { step, alter, octave })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
        let accidental = match self.alter {
            2 => "##",
            1 => "#",
            -1 => "b",
            -2 => "bb",
            _ => "",
        };
        write!(f, "{}{}{}", LETTERS[self.step as usize % 7], accidental, self.octave)
    }
}

/// Vertical staff position of a pitch, in diatonic steps above the middle
/// staff line (positive is up). Rests, malformed names and pitches outside
/// C3..=C6 sit on the center line.
pub fn pitch_offset(pitch: &str) -> i32 {
    match pitch.parse::<Pitch>() {
        Ok(p) if p.is_supported() => p.diatonic_index() - MIDDLE_LINE_NOTE,
        _ => {
            log::debug!("no staff position for pitch '{pitch}', using staff center");
            STAFF_CENTER
        }
    }
}

/// Y coordinate of a note head center, given the y of the top staff line.
pub fn staff_y(pitch: &str, staff_top: f64) -> f64 {
    let center = staff_top + STAFF_HEIGHT / 2.0;
    center - pitch_offset(pitch) as f64 * (STAFF_LINE_SPACING / 2.0)
}

/// Note head glyph for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteHeadCategory {
    /// Filled head (quarter and shorter)
    Filled,
    /// Hollow head with stem (half)
    Hollow,
    /// Hollow head without stem
    Whole,
}

impl NoteHeadCategory {
    pub fn is_filled(self) -> bool {
        self == NoteHeadCategory::Filled
    }

    pub fn has_stem(self) -> bool {
        self != NoteHeadCategory::Whole
    }
}

/// Choose the head glyph: >= 4 beats is whole, >= 2 is hollow, else filled.
pub fn note_head_category(duration: f64) -> NoteHeadCategory {
    if duration >= WHOLE_NOTE_MIN_BEATS {
        NoteHeadCategory::Whole
    } else if duration >= HALF_NOTE_MIN_BEATS {
        NoteHeadCategory::Hollow
    } else {
        NoteHeadCategory::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pitch_names() {
        assert_eq!("C4".parse::<Pitch>(), Ok(Pitch { step: 0, alter: 0, octave: 4 }));
        assert_eq!("F#5".parse::<Pitch>(), Ok(Pitch { step: 3, alter: 1, octave: 5 }));
        assert_eq!("Bb3".parse::<Pitch>(), Ok(Pitch { step: 6, alter: -1, octave: 3 }));
        assert_eq!("Ebb4".parse::<Pitch>().map(|p| p.alter), Ok(-2));
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("C?4".parse::<Pitch>().is_err());
        assert!("REST".parse::<Pitch>().is_err());
    }

    #[test]
    fn display_round_trips_spelling() {
        for name in ["C4", "F#5", "Bb3", "G##4", "Abb5"] {
            assert_eq!(name.parse::<Pitch>().unwrap().to_string(), name);
        }
    }

    #[test]
    fn offsets_follow_the_treble_staff() {
        assert_eq!(pitch_offset("B4"), 0);
        assert_eq!(pitch_offset("C5"), 1);
        assert_eq!(pitch_offset("F5"), 4);
        assert_eq!(pitch_offset("E4"), -4);
        assert_eq!(pitch_offset("C4"), -6);
        // accidentals share the natural's line
        assert_eq!(pitch_offset("C#4"), pitch_offset("C4"));
        assert_eq!(pitch_offset("Bb4"), 0);
    }

    #[test]
    fn unknown_pitch_falls_back_to_center() {
        assert_eq!(pitch_offset("REST"), STAFF_CENTER);
        assert_eq!(pitch_offset("Q9"), STAFF_CENTER);
        assert_eq!(pitch_offset(""), STAFF_CENTER);
        assert_eq!(pitch_offset("C2"), STAFF_CENTER);
        assert_eq!(pitch_offset("D6"), STAFF_CENTER);
        assert_ne!(pitch_offset("C3"), STAFF_CENTER);
        assert_ne!(pitch_offset("C6"), STAFF_CENTER);
    }

    #[test]
    fn staff_y_moves_up_with_pitch() {
        assert_eq!(staff_y("B4", 0.0), 20.0);
        assert_eq!(staff_y("F5", 0.0), 0.0); // top line
        assert_eq!(staff_y("E4", 0.0), 40.0); // bottom line
        assert!(staff_y("C5", 100.0) < staff_y("A4", 100.0));
    }

    #[test]
    fn note_head_boundaries() {
        assert_eq!(note_head_category(1.999), NoteHeadCategory::Filled);
        assert_eq!(note_head_category(2.0), NoteHeadCategory::Hollow);
        assert_eq!(note_head_category(3.999), NoteHeadCategory::Hollow);
        assert_eq!(note_head_category(4.0), NoteHeadCategory::Whole);
        assert_eq!(note_head_category(0.5), NoteHeadCategory::Filled);
        assert!(note_head_category(1.0).is_filled());
        assert!(!note_head_category(4.0).has_stem());
    }
}
