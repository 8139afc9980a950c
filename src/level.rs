//! # Level
//!
//! A configured exercise: its note set, timing, and the player's history on it.
//!
//! ## Invariants
//! - The statistics map has exactly one entry per note in `notes`, kept in sync
//!   by [`Level::add_note`] and [`Level::remove_note`].
//! - `max_score` only ever grows; [`Level::update_max_score_and_tries`] is its
//!   single mutation site during play.
//! - Mandatory levels are never deletable. Free (custom) levels are always
//!   deletable and always count as completed.
//!
//! ## Persisted form
//! Levels serialize through [`RawLevel`], whose camelCase field names match the
//! stored `Levels.json`. Statistics are keyed by [`Note::key`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::note::{Note, PitchId};

/// Score a mandatory level needs before the next one unlocks.
pub const REQUIRED_SCORE: u32 = 90;

const DEFAULT_QUESTIONS: u32 = 100;
const DEFAULT_TIMER: u32 = 120;
const DEFAULT_SEQUENCE_COUNT: u32 = 5;
const DEFAULT_SEQUENCE_NOTE_COUNT: u32 = 5;

/// Stable unique identifier of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(Uuid);

impl LevelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LevelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of judging one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerStatus {
    Right,
    Wrong,
}

/// Right/wrong tally for one note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScorePerNote {
    pub right: u32,
    pub wrong: u32,
}

impl ScorePerNote {
    pub fn record(&mut self, status: AnswerStatus) {
        match status {
            AnswerStatus::Right => self.right += 1,
            AnswerStatus::Wrong => self.wrong += 1,
        }
    }

    pub fn count(&self, status: AnswerStatus) -> u32 {
        match status {
            AnswerStatus::Right => self.right,
            AnswerStatus::Wrong => self.wrong,
        }
    }

    pub fn total(&self) -> u32 {
        self.right + self.wrong
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawLevel", from = "RawLevel")]
pub struct Level {
    id: LevelId,
    number_of_questions: u32,
    timer: u32,
    sequence_count: u32,
    sequence_note_count: u32,
    notes: Vec<Note>,
    max_score: u32,
    number_of_tries: u32,
    stats: HashMap<Note, ScorePerNote>,
    is_free_level: bool,
    is_enabled: bool,
    is_deletable: bool,
    is_sequence: bool,
}

impl Level {
    /// A locked mandatory question level with the default counters
    pub fn mandatory(notes: Vec<Note>) -> Self {
        Self::build(notes, false, false)
    }

    /// A custom question level. Free levels are enabled and deletable.
    pub fn free(number_of_questions: u32, timer: u32, notes: Vec<Note>) -> Self {
        let mut level = Self::build(notes, true, false);
        level.number_of_questions = number_of_questions;
        level.timer = timer;
        level
    }

    /// A custom sequence level. `timer` applies to each sequence.
    pub fn free_sequence(sequence_count: u32, sequence_note_count: u32, timer: u32, notes: Vec<Note>) -> Self {
        let mut level = Self::build(notes, true, true);
        level.sequence_count = sequence_count;
        level.sequence_note_count = sequence_note_count;
        level.timer = timer;
        level
    }

    fn build(notes: Vec<Note>, is_free_level: bool, is_sequence: bool) -> Self {
        let notes = ordered_set(notes);
        let stats = notes.iter().map(|note| (*note, ScorePerNote::default())).collect();
        Self {
            id: LevelId::new(),
            number_of_questions: DEFAULT_QUESTIONS,
            timer: DEFAULT_TIMER,
            sequence_count: DEFAULT_SEQUENCE_COUNT,
            sequence_note_count: DEFAULT_SEQUENCE_NOTE_COUNT,
            notes,
            max_score: 0,
            number_of_tries: 0,
            stats,
            is_free_level,
            is_enabled: is_free_level,
            is_deletable: is_free_level,
            is_sequence,
        }
    }

    /// Same level, enabled or locked. Free levels stay enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled || self.is_free_level;
    }

    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn number_of_questions(&self) -> u32 {
        self.number_of_questions
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn sequence_count(&self) -> u32 {
        self.sequence_count
    }

    pub fn sequence_note_count(&self) -> u32 {
        self.sequence_note_count
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn number_of_tries(&self) -> u32 {
        self.number_of_tries
    }

    pub fn is_free_level(&self) -> bool {
        self.is_free_level
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn is_deletable(&self) -> bool {
        self.is_deletable
    }

    pub fn is_sequence(&self) -> bool {
        self.is_sequence
    }

    /// Free levels are always completed; mandatory ones need [`REQUIRED_SCORE`].
    pub fn is_completed(&self) -> bool {
        self.is_free_level || self.max_score >= REQUIRED_SCORE
    }

    pub fn set_number_of_questions(&mut self, number_of_questions: u32) {
        self.number_of_questions = number_of_questions;
    }

    pub fn set_timer(&mut self, timer: u32) {
        self.timer = timer;
    }

    pub fn set_sequence_count(&mut self, sequence_count: u32) {
        self.sequence_count = sequence_count;
    }

    pub fn set_sequence_note_count(&mut self, sequence_note_count: u32) {
        self.sequence_note_count = sequence_note_count;
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn note_at(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn contains(&self, note: &Note) -> bool {
        self.stats.contains_key(note)
    }

    pub fn note_with_pitch(&self, pitch: PitchId) -> Option<&Note> {
        self.notes.iter().find(|note| note.pitch() == pitch)
    }

    /// Add a note with zeroed statistics. Returns false if the pitch is already present.
    pub fn add_note(&mut self, note: Note) -> bool {
        if self.contains(&note) {
            return false;
        }
        self.stats.insert(note, ScorePerNote::default());
        let index = self.notes.partition_point(|n| n.staff_cmp(&note) == Ordering::Less);
        self.notes.insert(index, note);
        true
    }

    /// Remove a note together with its statistics. Returns false if it wasn't present.
    pub fn remove_note(&mut self, note: &Note) -> bool {
        if self.stats.remove(note).is_none() {
            return false;
        }
        self.notes.retain(|n| n != note);
        true
    }

    /// Record one judged answer against `note`.
    ///
    /// Notes outside the level are rejected (returns false) so the statistics
    /// never gain a key that isn't in `notes`.
    pub fn update_statistics(&mut self, note: &Note, status: AnswerStatus) -> bool {
        match self.stats.get_mut(note) {
            Some(score) => {
                score.record(status);
                true
            }
            None => {
                log::warn!("level {}: no statistics slot for {}, answer not recorded", self.id, note);
                false
            }
        }
    }

    /// Raise the high-water mark if `new_score` beats it and count one more try.
    pub fn update_max_score_and_tries(&mut self, new_score: u32) {
        self.max_score = self.max_score.max(new_score);
        self.number_of_tries += 1;
    }

    /// Zero the play history, keeping notes and settings
    pub(crate) fn reset_history(&mut self) {
        self.max_score = 0;
        self.number_of_tries = 0;
        for score in self.stats.values_mut() {
            *score = ScorePerNote::default();
        }
    }

    pub fn stats(&self, note: &Note) -> Option<ScorePerNote> {
        self.stats.get(note).copied()
    }

    /// Cumulative count of `status` answers for `note`, zero for unknown notes
    pub fn score_for(&self, note: &Note, status: AnswerStatus) -> u32 {
        self.stats(note).map(|s| s.count(status)).unwrap_or(0)
    }

    /// Statistics in note order
    pub fn per_note_stats(&self) -> impl Iterator<Item = (&Note, ScorePerNote)> + '_ {
        self.notes
            .iter()
            .map(move |note| (note, self.stats.get(note).copied().unwrap_or_default()))
    }

    /// Button labels for this level.
    ///
    /// With more than one letter name the labels are the distinct letters in
    /// staff order ("C", "E", "G"). When every note shares one letter, the
    /// register is what tells them apart, so labels become "C4", "C5", ...
    pub fn unique_note_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.notes.iter().map(|n| n.name()).collect();
        names.sort();
        names.dedup();

        if names.len() > 1 {
            return names.iter().map(|n| n.as_str().to_string()).collect();
        }

        let mut labels: Vec<String> = Vec::new();
        for note in &self.notes {
            let label = note.simple_label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    pub fn unique_note_count(&self) -> usize {
        self.unique_note_names().len()
    }
}

/// Keep the first spelling of each pitch, then sort into staff order
fn ordered_set(mut notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::new();
    notes.retain(|n| seen.insert(n.pitch()));
    notes.sort_by(Note::staff_cmp);
    notes
}

/// Level as stored in `Levels.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLevel {
    pub number_of_questions: u32,
    pub timer: u32,
    pub sequence_count: u32,
    pub sequence_note_count: u32,
    pub notes: Vec<Note>,
    pub id: LevelId,
    pub max_score: u32,
    pub number_of_tries: u32,
    pub percentage_per_note: BTreeMap<String, ScorePerNote>,
    pub is_free_level: bool,
    pub is_enabled: bool,
    pub is_deletable: bool,
    pub is_sequence: bool,
}

impl From<Level> for RawLevel {
    fn from(level: Level) -> Self {
        let percentage_per_note = level
            .per_note_stats()
            .map(|(note, score)| (note.key(), score))
            .collect();
        Self {
            number_of_questions: level.number_of_questions,
            timer: level.timer,
            sequence_count: level.sequence_count,
            sequence_note_count: level.sequence_note_count,
            notes: level.notes,
            id: level.id,
            max_score: level.max_score,
            number_of_tries: level.number_of_tries,
            percentage_per_note,
            is_free_level: level.is_free_level,
            is_enabled: level.is_enabled,
            is_deletable: level.is_deletable,
            is_sequence: level.is_sequence,
        }
    }
}

impl From<RawLevel> for Level {
    fn from(mut raw: RawLevel) -> Self {
        let notes = ordered_set(raw.notes);
        let mut stats = HashMap::with_capacity(notes.len());
        for note in &notes {
            let score = raw.percentage_per_note.remove(&note.key()).unwrap_or_default();
            stats.insert(*note, score);
        }
        for orphan in raw.percentage_per_note.keys() {
            log::warn!("level {}: dropping statistics for unknown note key '{}'", raw.id, orphan);
        }
        if raw.is_deletable != raw.is_free_level {
            log::warn!(
                "level {}: deletable flag {} contradicts free flag {}, using the free flag",
                raw.id,
                raw.is_deletable,
                raw.is_free_level
            );
        }

        Self {
            id: raw.id,
            number_of_questions: raw.number_of_questions,
            timer: raw.timer,
            sequence_count: raw.sequence_count,
            sequence_note_count: raw.sequence_note_count,
            notes,
            max_score: raw.max_score,
            number_of_tries: raw.number_of_tries,
            stats,
            is_free_level: raw.is_free_level,
            is_enabled: raw.is_enabled || raw.is_free_level,
            is_deletable: raw.is_free_level,
            is_sequence: raw.is_sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NoteCatalog;
    use crate::note::{Accidental, Clef, NoteName};

    fn note(name: NoteName, register: i32) -> Note {
        Note::new(NoteCatalog::bundled(), name, register, Clef::G).unwrap()
    }

    fn keys_match_notes(level: &Level) -> bool {
        level.notes().len() == level.stats.len() && level.notes().iter().all(|n| level.stats.contains_key(n))
    }

    #[test]
    fn test_new_level_has_zeroed_stats_for_every_note() {
        let level = Level::mandatory(vec![note(NoteName::G, 4), note(NoteName::C, 4), note(NoteName::C, 4)]);
        assert_eq!(level.note_count(), 2);
        assert_eq!(level.note_at(0).unwrap().pitch(), 60);
        assert!(keys_match_notes(&level));
        assert!(level.per_note_stats().all(|(_, s)| s == ScorePerNote::default()));
    }

    #[test]
    fn test_add_and_remove_note_keep_stats_in_sync() {
        let mut level = Level::free(20, 60, vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        assert!(level.add_note(note(NoteName::E, 4)));
        assert!(!level.add_note(note(NoteName::E, 4)));
        assert_eq!(level.notes().iter().map(|n| n.pitch()).collect::<Vec<_>>(), vec![60, 64, 67]);
        assert!(keys_match_notes(&level));

        assert!(level.remove_note(&note(NoteName::C, 4)));
        assert!(!level.remove_note(&note(NoteName::C, 4)));
        assert!(keys_match_notes(&level));
        assert_eq!(level.note_count(), 2);
    }

    #[test]
    fn test_enharmonic_spellings_share_one_slot() {
        let catalog = NoteCatalog::bundled();
        let e_sharp = Note::with_accidental(catalog, NoteName::E, 4, Accidental::Sharp, Clef::G).unwrap();
        let f_flat = Note::with_accidental(catalog, NoteName::F, 4, Accidental::Flat, Clef::G).unwrap();
        let f4 = note(NoteName::F, 4);
        assert_eq!(e_sharp.pitch(), 65);
        assert_eq!(f_flat.pitch(), 64);

        for order in [[e_sharp, f_flat, f4], [f4, f_flat, e_sharp], [f_flat, f4, e_sharp]] {
            let level = Level::free(20, 60, order.to_vec());
            assert_eq!(level.note_count(), 2);
            assert!(keys_match_notes(&level));
            let mut pitches: Vec<_> = level.notes().iter().map(|n| n.pitch()).collect();
            pitches.sort_unstable();
            assert_eq!(pitches, vec![64, 65]);
        }

        let mut level = Level::free(20, 60, vec![e_sharp, f_flat]);
        assert!(!level.add_note(f4));
        assert_eq!(level.note_count(), 2);
        assert!(keys_match_notes(&level));

        let json = serde_json::to_string(&level).unwrap();
        let back: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(back.note_count(), 2);
        assert!(keys_match_notes(&back));
    }

    #[test]
    fn test_add_note_keeps_staff_order() {
        let catalog = NoteCatalog::bundled();
        let mut level = Level::free(20, 60, vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        let f_sharp = Note::with_accidental(catalog, NoteName::F, 4, Accidental::Sharp, Clef::G).unwrap();
        assert!(level.add_note(f_sharp));
        assert!(level.add_note(note(NoteName::F, 4)));
        assert!(level.add_note(note(NoteName::B, 3)));
        assert_eq!(
            level.notes().iter().map(|n| n.pitch()).collect::<Vec<_>>(),
            vec![59, 60, 65, 66, 67]
        );
        assert!(level.notes().windows(2).all(|w| w[0].staff_cmp(&w[1]) == Ordering::Less));
    }

    #[test]
    fn test_update_statistics() {
        let g4 = note(NoteName::G, 4);
        let mut level = Level::mandatory(vec![note(NoteName::C, 4), g4]);
        assert!(level.update_statistics(&g4, AnswerStatus::Right));
        assert!(level.update_statistics(&g4, AnswerStatus::Wrong));
        assert!(level.update_statistics(&g4, AnswerStatus::Right));
        assert_eq!(level.stats(&g4), Some(ScorePerNote { right: 2, wrong: 1 }));
        assert_eq!(level.score_for(&g4, AnswerStatus::Right), 2);
    }

    #[test]
    fn test_update_statistics_rejects_foreign_note() {
        let mut level = Level::mandatory(vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        assert!(!level.update_statistics(&note(NoteName::A, 4), AnswerStatus::Right));
        assert!(keys_match_notes(&level));
        assert_eq!(level.score_for(&note(NoteName::A, 4), AnswerStatus::Right), 0);
    }

    #[test]
    fn test_max_score_is_a_high_water_mark() {
        let mut level = Level::mandatory(vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        let scores = [40, 95, 10, 95, 60];
        let mut previous = 0;
        for (i, score) in scores.iter().enumerate() {
            level.update_max_score_and_tries(*score);
            assert!(level.max_score() >= previous);
            assert_eq!(level.number_of_tries(), i as u32 + 1);
            previous = level.max_score();
        }
        assert_eq!(level.max_score(), 95);
    }

    #[test]
    fn test_completion_and_deletability() {
        let mut mandatory = Level::mandatory(vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        assert!(!mandatory.is_deletable());
        assert!(!mandatory.is_enabled());
        assert!(!mandatory.is_completed());
        mandatory.update_max_score_and_tries(REQUIRED_SCORE - 1);
        assert!(!mandatory.is_completed());
        mandatory.update_max_score_and_tries(REQUIRED_SCORE);
        assert!(mandatory.is_completed());

        let free = Level::free(10, 10, vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        assert!(free.is_deletable());
        assert!(free.is_enabled());
        assert!(free.is_completed());
        assert!(free.clone().with_enabled(false).is_enabled());
    }

    #[test]
    fn test_unique_note_names_across_letters() {
        let level = Level::mandatory(vec![
            note(NoteName::G, 5),
            note(NoteName::C, 4),
            note(NoteName::G, 4),
            note(NoteName::C, 5),
            note(NoteName::E, 4),
        ]);
        assert_eq!(level.unique_note_names(), vec!["C", "E", "G"]);
        assert_eq!(level.unique_note_count(), 3);
    }

    #[test]
    fn test_unique_note_names_single_letter_uses_register() {
        let level = Level::mandatory(vec![note(NoteName::C, 5), note(NoteName::C, 3), note(NoteName::C, 4)]);
        assert_eq!(level.unique_note_names(), vec!["C3", "C4", "C5"]);
    }

    #[test]
    fn test_serde_round_trip_keeps_stats() {
        let g4 = note(NoteName::G, 4);
        let mut level = Level::free_sequence(4, 3, 15, vec![note(NoteName::C, 4), note(NoteName::E, 4), g4]);
        level.update_statistics(&g4, AnswerStatus::Wrong);
        level.update_max_score_and_tries(7);

        let json = serde_json::to_string(&level).unwrap();
        let back: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(back, level);
        assert_eq!(back.stats(&g4), Some(ScorePerNote { right: 0, wrong: 1 }));
        assert!(back.is_sequence());
    }

    #[test]
    fn test_persisted_field_names() {
        let level = Level::mandatory(vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        let json = serde_json::to_value(&level).unwrap();
        for field in [
            "numberOfQuestions",
            "timer",
            "sequenceCount",
            "sequenceNoteCount",
            "notes",
            "id",
            "maxScore",
            "numberOfTries",
            "percentagePerNote",
            "isFreeLevel",
            "isEnabled",
            "isDeletable",
            "isSequence",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        let stats = json["percentagePerNote"].as_object().unwrap();
        assert!(stats.contains_key("C4, duration:0.25, clef: G, MIDI value: 60"));
        assert_eq!(stats["C4, duration:0.25, clef: G, MIDI value: 60"]["right"], 0);
    }

    #[test]
    fn test_deserialize_repairs_stats_keys() {
        let level = Level::mandatory(vec![note(NoteName::C, 4), note(NoteName::G, 4)]);
        let mut json = serde_json::to_value(&level).unwrap();
        let stats = json["percentagePerNote"].as_object_mut().unwrap();
        stats.remove("C4, duration:0.25, clef: G, MIDI value: 60");
        stats.insert("stale".to_string(), serde_json::json!({"right": 3, "wrong": 1}));
        json["isDeletable"] = serde_json::json!(true);

        let back: Level = serde_json::from_value(json).unwrap();
        assert!(keys_match_notes(&back));
        assert_eq!(back.stats(&note(NoteName::C, 4)), Some(ScorePerNote::default()));
        assert!(!back.is_deletable());
    }
}
