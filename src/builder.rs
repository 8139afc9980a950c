//! Boundary validation for custom levels and level edits.
//!
//! The store trusts what it is given, so everything a player types goes
//! through here first.
//!
//! ```rust
//! use sightread::{Clef, EngineConfig, InMemory, LevelBuilder, NoteName, ProgressStore};
//!
//! let mut store = ProgressStore::with_storage(EngineConfig::default(), Box::new(InMemory::new())).unwrap();
//! let c4 = store.note(NoteName::C, 4, Clef::G).unwrap();
//! let e4 = store.note(NoteName::E, 4, Clef::G).unwrap();
//!
//! let id = LevelBuilder::questions(20, 60)
//!     .notes([c4, e4])
//!     .add_to(&mut store)
//!     .unwrap();
//! assert!(store.level(id).unwrap().is_free_level());
//! ```

use std::collections::HashSet;

use crate::config::Limits;
use crate::error::EngineError;
use crate::level::{Level, LevelId};
use crate::note::{Note, PitchId};
use crate::progress::{LevelEdit, ProgressStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Questions { number_of_questions: u32 },
    Sequences { sequence_count: u32, sequence_note_count: u32 },
}

/// Collects the settings and notes of a new custom level
#[derive(Debug, Clone)]
pub struct LevelBuilder {
    kind: Kind,
    timer: u32,
    notes: Vec<Note>,
}

impl LevelBuilder {
    pub fn questions(number_of_questions: u32, timer: u32) -> Self {
        Self {
            kind: Kind::Questions { number_of_questions },
            timer,
            notes: Vec::new(),
        }
    }

    pub fn sequences(sequence_count: u32, sequence_note_count: u32, timer: u32) -> Self {
        Self {
            kind: Kind::Sequences {
                sequence_count,
                sequence_note_count,
            },
            timer,
            notes: Vec::new(),
        }
    }

    pub fn note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    pub fn notes(mut self, notes: impl IntoIterator<Item = Note>) -> Self {
        self.notes.extend(notes);
        self
    }

    pub fn validate(&self, limits: &Limits) -> Result<(), EngineError> {
        let distinct = distinct_pitches(&self.notes);
        check_notes(distinct, limits)?;
        check_timer(self.timer, limits)?;
        match self.kind {
            Kind::Questions { number_of_questions } => check_questions(number_of_questions, limits),
            Kind::Sequences {
                sequence_count,
                sequence_note_count,
            } => check_sequence(sequence_count, sequence_note_count, distinct),
        }
    }

    /// Validate against the store's limits, then append the level
    pub fn add_to(self, store: &mut ProgressStore) -> Result<LevelId, EngineError> {
        self.validate(&store.config().limits)?;
        let id = match self.kind {
            Kind::Questions { number_of_questions } => store.add_level(number_of_questions, self.timer, self.notes),
            Kind::Sequences {
                sequence_count,
                sequence_note_count,
            } => store.add_sequence_level(sequence_count, sequence_note_count, self.timer, self.notes),
        };
        Ok(id)
    }
}

/// Apply `edit` to `level`, leaving it untouched if any field is out of bounds
pub(crate) fn apply_edit(level: &mut Level, edit: LevelEdit, limits: &Limits) -> Result<(), EngineError> {
    if let Some(n) = edit.number_of_questions {
        check_questions(n, limits)?;
    }
    if let Some(timer) = edit.timer {
        check_timer(timer, limits)?;
    }
    if edit.sequence_count.is_some() || edit.sequence_note_count.is_some() {
        if !level.is_sequence() {
            return Err(EngineError::InvalidLevel(format!(
                "level {} is not a sequence level",
                level.id()
            )));
        }
        check_sequence(
            edit.sequence_count.unwrap_or(level.sequence_count()),
            edit.sequence_note_count.unwrap_or(level.sequence_note_count()),
            level.note_count(),
        )?;
    }

    if let Some(n) = edit.number_of_questions {
        level.set_number_of_questions(n);
    }
    if let Some(timer) = edit.timer {
        level.set_timer(timer);
    }
    if let Some(count) = edit.sequence_count {
        level.set_sequence_count(count);
    }
    if let Some(count) = edit.sequence_note_count {
        level.set_sequence_note_count(count);
    }
    Ok(())
}

fn distinct_pitches(notes: &[Note]) -> usize {
    notes.iter().map(Note::pitch).collect::<HashSet<PitchId>>().len()
}

fn check_notes(distinct: usize, limits: &Limits) -> Result<(), EngineError> {
    if distinct < limits.min_notes {
        return Err(EngineError::InvalidLevel(format!(
            "a level needs at least {} distinct notes, got {}",
            limits.min_notes, distinct
        )));
    }
    Ok(())
}

fn check_questions(number_of_questions: u32, limits: &Limits) -> Result<(), EngineError> {
    if number_of_questions < limits.min_questions {
        return Err(EngineError::InvalidLevel(format!(
            "number of questions must be at least {}, got {}",
            limits.min_questions, number_of_questions
        )));
    }
    Ok(())
}

fn check_timer(timer: u32, limits: &Limits) -> Result<(), EngineError> {
    if timer < limits.min_timer {
        return Err(EngineError::InvalidLevel(format!(
            "timer must be at least {} seconds, got {}",
            limits.min_timer, timer
        )));
    }
    Ok(())
}

fn check_sequence(sequence_count: u32, sequence_note_count: u32, distinct: usize) -> Result<(), EngineError> {
    if sequence_count == 0 {
        return Err(EngineError::InvalidLevel("sequence count must be at least 1".to_string()));
    }
    if sequence_note_count == 0 || sequence_note_count as usize > distinct {
        return Err(EngineError::InvalidLevel(format!(
            "notes per sequence must be between 1 and {}, got {}",
            distinct, sequence_note_count
        )));
    }
    Ok(())
}
