//! # Note Types
//!
//! Value types for the notes a level asks about.
//!
//! ## Type Hierarchy
//! ```text
//! Note
//!   ├── name: NoteName (C D E F G A B)
//!   ├── register: u8 (clamped to 0..=8, C4 = middle C)
//!   ├── duration: Duration (double whole .. 128th, plain or dotted)
//!   ├── accidental: Accidental (♯ ♭ ♮ or none)
//!   ├── clef: Clef (G | F | C at line 1..4)
//!   └── pitch: PitchId (MIDI number resolved from the note catalog)
//! ```
//!
//! ## Identity
//! - Equality and hashing use **only** the pitch. `B#3` and `C4` are the same note.
//! - Staff order ([`Note::staff_cmp`]) is by register, then letter name (C < D < ... < B),
//!   then accidental, then pitch. It is not an `Ord` impl because enharmonic spellings
//!   are equal yet sit at different staff positions.
//! - The pitch is resolved from a [`NoteCatalog`] when the note is built and is
//!   never changed afterwards.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::NoteCatalog;
use crate::error::EngineError;

/// Canonical numeric identity of a note (MIDI note number).
pub type PitchId = u8;

/// Highest register a note can sit in.
pub const MAX_REGISTER: u8 = 8;

/// Note names C through B, in staff order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 7] = [
        NoteName::C,
        NoteName::D,
        NoteName::E,
        NoteName::F,
        NoteName::G,
        NoteName::A,
        NoteName::B,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::D => "D",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::G => "G",
            NoteName::A => "A",
            NoteName::B => "B",
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let name = match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        };
        name.ok_or_else(|| EngineError::InvalidLevel(format!("'{}' is not a note name", s)))
    }
}

/// Accidentals. `None` means nothing is written next to the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Accidental {
    #[serde(rename = "♯")]
    Sharp,
    #[serde(rename = "♭")]
    Flat,
    #[serde(rename = "♮")]
    Natural,
    #[default]
    #[serde(rename = "")]
    None,
}

impl Accidental {
    pub fn symbol(&self) -> &'static str {
        match self {
            Accidental::Sharp => "♯",
            Accidental::Flat => "♭",
            Accidental::Natural => "♮",
            Accidental::None => "",
        }
    }

    /// Semitones added to the natural pitch
    pub fn semitone_offset(&self) -> i16 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::Natural | Accidental::None => 0,
        }
    }

    // flat < (none | natural) < sharp
    fn rank(&self) -> u8 {
        match self {
            Accidental::Flat => 0,
            Accidental::None | Accidental::Natural => 1,
            Accidental::Sharp => 2,
        }
    }
}

/// Written note duration, stored as a fraction of a whole note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum Duration {
    DoubleWhole,
    DottedWhole,
    Whole,
    DottedHalf,
    Half,
    DottedQuarter,
    #[default]
    Quarter,
    DottedEighth,
    Eighth,
    DottedSixteenth,
    Sixteenth,
    DottedThirtySecond,
    ThirtySecond,
    DottedSixtyFourth,
    SixtyFourth,
    HundredTwentyEighth,
}

impl Duration {
    pub const ALL: [Duration; 16] = [
        Duration::DoubleWhole,
        Duration::DottedWhole,
        Duration::Whole,
        Duration::DottedHalf,
        Duration::Half,
        Duration::DottedQuarter,
        Duration::Quarter,
        Duration::DottedEighth,
        Duration::Eighth,
        Duration::DottedSixteenth,
        Duration::Sixteenth,
        Duration::DottedThirtySecond,
        Duration::ThirtySecond,
        Duration::DottedSixtyFourth,
        Duration::SixtyFourth,
        Duration::HundredTwentyEighth,
    ];

    /// Returns the duration as a fraction of a whole note
    pub fn as_fraction(&self) -> f64 {
        match self {
            Duration::DoubleWhole => 2.0,
            Duration::DottedWhole => 1.5,
            Duration::Whole => 1.0,
            Duration::DottedHalf => 0.75,
            Duration::Half => 0.5,
            Duration::DottedQuarter => 0.375,
            Duration::Quarter => 0.25,
            Duration::DottedEighth => 0.1875,
            Duration::Eighth => 0.125,
            Duration::DottedSixteenth => 0.09375,
            Duration::Sixteenth => 0.0625,
            Duration::DottedThirtySecond => 0.046875,
            Duration::ThirtySecond => 0.03125,
            Duration::DottedSixtyFourth => 0.0234375,
            Duration::SixtyFourth => 0.015625,
            Duration::HundredTwentyEighth => 0.0078125,
        }
    }

    /// Sum of two durations, if the result is itself a written duration
    pub fn checked_add(self, other: Duration) -> Option<Duration> {
        Self::from_fraction(self.as_fraction() + other.as_fraction())
    }

    /// Difference of two durations, if the result is itself a written duration
    pub fn checked_sub(self, other: Duration) -> Option<Duration> {
        Self::from_fraction(self.as_fraction() - other.as_fraction())
    }

    pub fn from_fraction(value: f64) -> Option<Duration> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| (d.as_fraction() - value).abs() < 1e-9)
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_fraction().total_cmp(&other.as_fraction())
    }
}

impl From<Duration> for f64 {
    fn from(duration: Duration) -> f64 {
        duration.as_fraction()
    }
}

impl TryFrom<f64> for Duration {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Duration::from_fraction(value).ok_or_else(|| format!("{} is not a note duration", value))
    }
}

/// Clef a note is written in. The C clef carries the staff line it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Clef {
    #[default]
    G,
    F,
    C { line: u8 },
}

impl Clef {
    pub const ALL: [Clef; 6] = [
        Clef::G,
        Clef::F,
        Clef::C { line: 1 },
        Clef::C { line: 2 },
        Clef::C { line: 3 },
        Clef::C { line: 4 },
    ];
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clef::G => f.write_str("G"),
            Clef::F => f.write_str("F"),
            Clef::C { line } => write!(f, "C at line:{}", line),
        }
    }
}

impl FromStr for Clef {
    type Err = EngineError;

    /// Accepts "G"/"treble", "F"/"bass", and "C1".."C4" (also "alto" = C3, "tenor" = C4)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clef = match s.trim().to_lowercase().as_str() {
            "g" | "treble" => Clef::G,
            "f" | "bass" => Clef::F,
            "alto" => Clef::C { line: 3 },
            "tenor" => Clef::C { line: 4 },
            other => match other.strip_prefix('c').map(str::parse::<u8>) {
                Some(Ok(line @ 1..=4)) => Clef::C { line },
                _ => {
                    return Err(EngineError::InvalidLevel(format!("'{}' is not a clef", s)));
                }
            },
        };
        Ok(clef)
    }
}

/// A note the player is asked to identify
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawNote")]
pub struct Note {
    name: NoteName,
    register: u8,
    duration: Duration,
    accidental: Accidental,
    clef: Clef,
    pitch: PitchId,
}

/// Persisted note, before its register and pitch are checked
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNote {
    name: NoteName,
    register: i32,
    #[serde(default)]
    duration: Duration,
    #[serde(default)]
    accidental: Accidental,
    #[serde(default)]
    clef: Clef,
    pitch: PitchId,
}

impl TryFrom<RawNote> for Note {
    type Error = EngineError;

    /// A stored register outside `0..=8` is refused. The stored pitch is
    /// re-resolved from the bundled catalog and the resolved value wins.
    fn try_from(raw: RawNote) -> Result<Self, Self::Error> {
        let register = u8::try_from(raw.register)
            .ok()
            .filter(|r| *r <= MAX_REGISTER)
            .ok_or_else(|| {
                EngineError::InvalidLevel(format!(
                    "stored note {} has register {} outside 0..={}",
                    raw.name, raw.register, MAX_REGISTER
                ))
            })?;

        let note = Self::with_accidental(
            NoteCatalog::bundled(),
            raw.name,
            register as i32,
            raw.accidental,
            raw.clef,
        )?
        .with_duration(raw.duration);

        if note.pitch != raw.pitch {
            log::warn!(
                "stored note {}{}{} had pitch {}, using {}",
                raw.name,
                raw.accidental.symbol(),
                register,
                raw.pitch,
                note.pitch
            );
        }
        Ok(note)
    }
}

fn clamp_register(register: i32) -> u8 {
    register.clamp(0, MAX_REGISTER as i32) as u8
}

impl Note {
    /// Build a quarter note without accidental, resolving its pitch from `catalog`.
    ///
    /// The register is clamped to `0..=8` before the lookup.
    pub fn new(catalog: &NoteCatalog, name: NoteName, register: i32, clef: Clef) -> Result<Self, EngineError> {
        Self::with_accidental(catalog, name, register, Accidental::None, clef)
    }

    /// Build a quarter note with an accidental. Sharps and flats move the
    /// catalog's natural pitch by one semitone.
    pub fn with_accidental(
        catalog: &NoteCatalog,
        name: NoteName,
        register: i32,
        accidental: Accidental,
        clef: Clef,
    ) -> Result<Self, EngineError> {
        let register = clamp_register(register);
        let natural = catalog
            .resolve_pitch(name, register, clef)
            .ok_or(EngineError::UnknownPitch { name, register })?;
        let pitch = u8::try_from(natural as i16 + accidental.semitone_offset())
            .map_err(|_| EngineError::UnknownPitch { name, register })?;

        Ok(Self {
            name,
            register,
            duration: Duration::Quarter,
            accidental,
            clef,
            pitch,
        })
    }

    /// Parse a label like "C4", "F#3" or "Bb2" and resolve it from `catalog`
    pub fn parse(catalog: &NoteCatalog, label: &str, clef: Clef) -> Result<Self, EngineError> {
        let (name, accidental, register) = parse_label(label)
            .ok_or_else(|| EngineError::InvalidLevel(format!("'{}' is not a note label", label)))?;
        Self::with_accidental(catalog, name, register, accidental, clef)
    }

    /// Same note written with another duration. The pitch is unchanged.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn name(&self) -> NoteName {
        self.name
    }

    pub fn register(&self) -> u8 {
        self.register
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn accidental(&self) -> Accidental {
        self.accidental
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn pitch(&self) -> PitchId {
        self.pitch
    }

    /// Staff order: register, then letter name, then accidental, then pitch.
    ///
    /// Total over all notes. Two spellings of one pitch compare unequal here
    /// even though `==` treats them as the same note.
    pub fn staff_cmp(&self, other: &Note) -> Ordering {
        self.register
            .cmp(&other.register)
            .then(self.name.cmp(&other.name))
            .then(self.accidental.rank().cmp(&other.accidental.rank()))
            .then(self.pitch.cmp(&other.pitch))
    }

    /// Letter name plus register, e.g. "C4". Used for button labels.
    pub fn simple_label(&self) -> String {
        format!("{}{}", self.name, self.register)
    }

    /// Stable key of this note in the persisted statistics map.
    ///
    /// Changing its composition orphans every stored statistic.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}, duration:{}, clef: {}, MIDI value: {}",
            self.name,
            self.accidental.symbol(),
            self.register,
            self.duration.as_fraction(),
            self.clef,
            self.pitch
        )
    }
}

/// Split "C#4" into name, accidental and register
fn parse_label(label: &str) -> Option<(NoteName, Accidental, i32)> {
    let label = label.trim();
    let mut chars = label.chars();
    let name = NoteName::from_char(chars.next()?)?;
    let rest = chars.as_str();

    let (accidental, digits) = if let Some(r) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('♯')) {
        (Accidental::Sharp, r)
    } else if let Some(r) = rest.strip_prefix('b').or_else(|| rest.strip_prefix('♭')) {
        (Accidental::Flat, r)
    } else if let Some(r) = rest.strip_prefix('♮') {
        (Accidental::Natural, r)
    } else {
        (Accidental::None, rest)
    };

    let register = digits.parse::<i32>().ok()?;
    Some((name, accidental, register))
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.pitch == other.pitch
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pitch.hash(state);
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{} ({} clef, MIDI {})",
            self.name,
            self.accidental.symbol(),
            self.register,
            self.clef,
            self.pitch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> &'static NoteCatalog {
        NoteCatalog::bundled()
    }

    #[test]
    fn test_note_pitch_from_catalog() {
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::G).unwrap();
        let g4 = Note::new(catalog(), NoteName::G, 4, Clef::G).unwrap();
        assert_eq!(c4.pitch(), 60);
        assert_eq!(g4.pitch(), 67);
        assert_eq!(c4.duration(), Duration::Quarter);
        assert_eq!(c4.accidental(), Accidental::None);
    }

    #[test]
    fn test_register_is_clamped() {
        let high = Note::new(catalog(), NoteName::C, 12, Clef::G).unwrap();
        assert_eq!(high.register(), 8);
        assert_eq!(high.pitch(), 108);

        let low = Note::new(catalog(), NoteName::A, -3, Clef::F).unwrap();
        assert_eq!(low.register(), 0);
        assert_eq!(low.pitch(), 21);
    }

    #[test]
    fn test_equality_is_by_pitch() {
        let b_sharp = Note::with_accidental(catalog(), NoteName::B, 3, Accidental::Sharp, Clef::G).unwrap();
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::F).unwrap();
        assert_eq!(b_sharp.pitch(), 60);
        assert_eq!(b_sharp, c4);
        assert_eq!(b_sharp.staff_cmp(&c4), Ordering::Less);
    }

    #[test]
    fn test_staff_order_is_transitive_across_spellings() {
        let e_sharp = Note::with_accidental(catalog(), NoteName::E, 4, Accidental::Sharp, Clef::G).unwrap();
        let f_flat = Note::with_accidental(catalog(), NoteName::F, 4, Accidental::Flat, Clef::G).unwrap();
        let f4 = Note::new(catalog(), NoteName::F, 4, Clef::G).unwrap();
        assert_eq!(e_sharp, f4);
        assert_ne!(f_flat, f4);

        assert_eq!(e_sharp.staff_cmp(&f_flat), Ordering::Less);
        assert_eq!(f_flat.staff_cmp(&f4), Ordering::Less);
        assert_eq!(e_sharp.staff_cmp(&f4), Ordering::Less);
        assert_eq!(f4.staff_cmp(&e_sharp), Ordering::Greater);
        assert_eq!(f4.staff_cmp(&f4), Ordering::Equal);
    }

    #[test]
    fn test_ordering_register_then_name() {
        let b3 = Note::new(catalog(), NoteName::B, 3, Clef::G).unwrap();
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::G).unwrap();
        let a4 = Note::new(catalog(), NoteName::A, 4, Clef::G).unwrap();
        let g4 = Note::new(catalog(), NoteName::G, 4, Clef::G).unwrap();

        let mut notes = vec![a4, c4, g4, b3];
        notes.sort_by(Note::staff_cmp);
        assert_eq!(notes, vec![b3, c4, g4, a4]);
    }

    #[test]
    fn test_accidental_order() {
        assert!(Accidental::Flat.rank() < Accidental::None.rank());
        assert!(Accidental::Natural.rank() < Accidental::Sharp.rank());
        assert_eq!(Accidental::None.rank(), Accidental::Natural.rank());
    }

    #[test]
    fn test_labels_and_key() {
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::G).unwrap();
        assert_eq!(c4.simple_label(), "C4");
        assert_eq!(c4.key(), "C4, duration:0.25, clef: G, MIDI value: 60");

        let alto = Note::new(catalog(), NoteName::C, 4, Clef::C { line: 3 }).unwrap();
        assert_eq!(alto.key(), "C4, duration:0.25, clef: C at line:3, MIDI value: 60");
    }

    #[test]
    fn test_parse_label() {
        let fs3 = Note::parse(catalog(), "F#3", Clef::F).unwrap();
        assert_eq!(fs3.pitch(), 54);
        assert_eq!(fs3.accidental(), Accidental::Sharp);

        let bb2 = Note::parse(catalog(), "Bb2", Clef::F).unwrap();
        assert_eq!(bb2.pitch(), 46);

        assert!(Note::parse(catalog(), "H4", Clef::G).is_err());
        assert!(Note::parse(catalog(), "C", Clef::G).is_err());
    }

    #[test]
    fn test_clef_from_str() {
        assert_eq!("treble".parse::<Clef>().unwrap(), Clef::G);
        assert_eq!("F".parse::<Clef>().unwrap(), Clef::F);
        assert_eq!("c3".parse::<Clef>().unwrap(), Clef::C { line: 3 });
        assert!("c5".parse::<Clef>().is_err());
    }

    #[test]
    fn test_duration_arithmetic() {
        assert_eq!(Duration::Quarter.checked_add(Duration::Quarter), Some(Duration::Half));
        assert_eq!(Duration::Half.checked_add(Duration::Quarter), Some(Duration::DottedHalf));
        assert_eq!(Duration::Whole.checked_sub(Duration::Quarter), Some(Duration::DottedHalf));
        assert_eq!(Duration::Quarter.checked_add(Duration::Sixteenth), None);
        assert!(Duration::Eighth < Duration::Quarter);
    }

    #[test]
    fn test_note_serde_shape() {
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::C { line: 1 }).unwrap();
        let json = serde_json::to_value(c4).unwrap();
        assert_eq!(json["name"], "C");
        assert_eq!(json["register"], 4);
        assert_eq!(json["duration"], 0.25);
        assert_eq!(json["accidental"], "");
        assert_eq!(json["clef"]["kind"], "C");
        assert_eq!(json["clef"]["line"], 1);
        assert_eq!(json["pitch"], 60);

        let back: Note = serde_json::from_value(json).unwrap();
        assert_eq!(back.register(), 4);
        assert_eq!(back.pitch(), 60);
        assert_eq!(back.clef(), Clef::C { line: 1 });
    }

    #[test]
    fn test_stored_register_out_of_range_is_refused() {
        let c4 = Note::new(catalog(), NoteName::C, 4, Clef::G).unwrap();
        let mut raw = serde_json::to_value(c4).unwrap();
        raw["register"] = serde_json::json!(11);
        assert!(serde_json::from_value::<Note>(raw.clone()).is_err());

        raw["register"] = serde_json::json!(-1);
        assert!(serde_json::from_value::<Note>(raw).is_err());
    }

    #[test]
    fn test_stored_pitch_is_resolved_again() {
        let c8 = Note::new(catalog(), NoteName::C, 8, Clef::G).unwrap();
        let mut raw = serde_json::to_value(c8).unwrap();
        raw["pitch"] = serde_json::json!(60);
        let back: Note = serde_json::from_value(raw).unwrap();
        assert_eq!(back.register(), 8);
        assert_eq!(back.pitch(), 108);
        assert_eq!(back.key(), c8.key());

        let f_sharp = Note::with_accidental(catalog(), NoteName::F, 3, Accidental::Sharp, Clef::F)
            .unwrap()
            .with_duration(Duration::Half);
        let mut raw = serde_json::to_value(f_sharp).unwrap();
        raw["pitch"] = serde_json::json!(53);
        let back: Note = serde_json::from_value(raw).unwrap();
        assert_eq!(back.pitch(), 54);
        assert_eq!(back.duration(), Duration::Half);
    }
}
