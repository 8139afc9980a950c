//! Sequence mode: a run of distinct notes answered in order.
//!
//! A run holds at most one note per pitch, so its length is capped by the
//! number of distinct pitches in the level. Answers are buffered until the run
//! is complete, then judged position by position. Every judgement goes into an append-only log; the abort rule
//! looks at the most recent run-length entries of that log.

use std::collections::HashSet;

use crate::level::{AnswerStatus, Level};
use crate::note::Note;
use crate::rng::Rng;

use super::types::Input;

#[derive(Debug, Clone)]
pub(super) struct SequenceRound {
    length: usize,
    sequence: Vec<Note>,
    collected: Vec<Input>,
    remaining: u32,
    log: Vec<AnswerStatus>,
}

impl SequenceRound {
    pub(super) fn start(level: &Level, rng: &mut Rng) -> Option<Self> {
        let available = candidates(level).len();
        if available == 0 {
            return None;
        }
        let requested = level.sequence_note_count() as usize;
        let length = requested.clamp(1, available);
        if length != requested {
            log::warn!(
                "level {}: {} notes per sequence requested, using {}",
                level.id(),
                requested,
                length
            );
        }

        Some(Self {
            length,
            sequence: draw(level, rng, length),
            collected: Vec::with_capacity(length),
            remaining: level.sequence_count(),
            log: Vec::new(),
        })
    }

    pub(super) fn sequence(&self) -> &[Note] {
        &self.sequence
    }

    pub(super) fn collected(&self) -> usize {
        self.collected.len()
    }

    pub(super) fn length(&self) -> usize {
        self.length
    }

    pub(super) fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Buffer one answer. Once the sequence is full, hand back the expected
    /// notes paired with the answers and clear the buffer.
    pub(super) fn push(&mut self, input: Input) -> Option<Vec<(Note, Input)>> {
        self.collected.push(input);
        if self.collected.len() < self.length {
            return None;
        }
        let answers = std::mem::take(&mut self.collected);
        Some(self.sequence.iter().copied().zip(answers).collect())
    }

    pub(super) fn record(&mut self, status: AnswerStatus) {
        self.log.push(status);
    }

    /// Whether the wrong answers in the latest window exceed `max_wrong_percent`
    pub(super) fn too_many_mistakes(&self, max_wrong_percent: u8) -> bool {
        let window = &self.log[self.log.len().saturating_sub(self.length)..];
        if window.is_empty() {
            return false;
        }
        let wrong = window.iter().filter(|s| **s == AnswerStatus::Wrong).count();
        wrong * 100 > window.len() * usize::from(max_wrong_percent)
    }

    /// Count the finished sequence and draw the next one.
    ///
    /// Returns true when no sequences are left.
    pub(super) fn advance(&mut self, level: &Level, rng: &mut Rng) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return true;
        }
        self.sequence = draw(level, rng, self.length);
        false
    }
}

/// One note per pitch, in level order
fn candidates(level: &Level) -> Vec<Note> {
    let mut seen = HashSet::new();
    level.notes().iter().copied().filter(|n| seen.insert(n.pitch())).collect()
}

/// Sample up to `length` notes of distinct pitch with a partial Fisher-Yates shuffle
fn draw(level: &Level, rng: &mut Rng, length: usize) -> Vec<Note> {
    let mut picked = candidates(level);
    let length = length.min(picked.len());
    for i in 0..length {
        let Some(offset) = rng.index(picked.len() - i) else {
            break;
        };
        picked.swap(i, i + offset);
    }
    picked.truncate(length);
    log::debug!(
        "next sequence: {}",
        picked.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
    );
    picked
}
