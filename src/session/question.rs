//! Standalone-question mode: one random note at a time.

use crate::level::Level;
use crate::note::Note;
use crate::rng::Rng;

#[derive(Debug, Clone)]
pub(super) struct QuestionRound {
    solution: Note,
    remaining: u32,
}

impl QuestionRound {
    /// `None` when the level has no notes to ask
    pub(super) fn start(level: &Level, rng: &mut Rng) -> Option<Self> {
        Some(Self {
            solution: draw(level, rng)?,
            remaining: level.number_of_questions(),
        })
    }

    pub(super) fn solution(&self) -> &Note {
        &self.solution
    }

    pub(super) fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Count one answered question and draw the next solution.
    ///
    /// Returns true when that was the last question.
    pub(super) fn advance(&mut self, level: &Level, rng: &mut Rng) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return true;
        }
        if let Some(next) = draw(level, rng) {
            self.solution = next;
        }
        false
    }
}

fn draw(level: &Level, rng: &mut Rng) -> Option<Note> {
    let index = rng.index(level.note_count())?;
    let note = level.note_at(index).copied();
    if let Some(note) = &note {
        log::debug!("next question: {}", note);
    }
    note
}
