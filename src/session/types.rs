//! Session input and output types
//!
//! Inputs are [`Answer`]s and one-second ticks. Every input produces a definite
//! value ([`AnswerResult`], [`TickResult`]), including the "nothing happened"
//! cases, so the presentation layer never has to guess.

use crate::level::{AnswerStatus, LevelId, ScorePerNote};
use crate::note::{Note, PitchId};
use crate::progress::UnlockDecision;

/// A player's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Index into [`Session::button_labels`](super::Session::button_labels)
    Button(usize),
    /// A note-on from a MIDI keyboard
    Pitch(PitchId),
}

/// An answer resolved against the level at submission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Input {
    Label(String),
    Pitch { pitch: PitchId, stray: bool },
}

impl Input {
    pub(super) fn is_stray(&self) -> bool {
        matches!(self, Input::Pitch { stray: true, .. })
    }

    /// Pitch equality for MIDI input, label equality for buttons.
    ///
    /// A label matches either the bare letter ("G") or letter plus register
    /// ("G4"), whichever scheme the level's buttons use.
    pub(super) fn matches(&self, expected: &Note) -> bool {
        match self {
            Input::Label(label) => label == expected.name().as_str() || *label == expected.simple_label(),
            Input::Pitch { pitch, .. } => *pitch == expected.pitch(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownButton(usize),
}

/// One judged answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgement {
    /// The note that was asked for; its statistics took the hit
    pub expected: Note,
    pub status: AnswerStatus,
    /// The input was a pitch that doesn't belong to this level at all
    pub stray: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    QuestionsAnswered,
    SequencesCompleted,
    TimeUp,
    TooManyMistakes,
}

/// What the player sees once a session is over
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub level_id: LevelId,
    pub reason: EndReason,
    pub right: u32,
    pub wrong: u32,
    /// Score this time, per note, in level order
    pub per_note: Vec<(Note, ScorePerNote)>,
    pub max_score: u32,
    pub number_of_tries: u32,
    pub level_completed: bool,
    pub unlock: UnlockDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerResult {
    Ignored(IgnoreReason),
    Rejected(RejectReason),
    /// Standalone mode: the answer was judged, possibly ending the session
    Judged {
        judgement: Judgement,
        end: Option<SessionSummary>,
    },
    /// Sequence mode: the answer is waiting for the rest of the sequence
    Buffered { collected: usize, needed: usize },
    /// Sequence mode: the full sequence was judged position by position
    SequenceJudged {
        judgements: Vec<Judgement>,
        end: Option<SessionSummary>,
    },
}

impl AnswerResult {
    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            AnswerResult::Judged { end, .. } | AnswerResult::SequenceJudged { end, .. } => end.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickResult {
    Ignored(IgnoreReason),
    Counting { remaining: u32 },
    Ended(SessionSummary),
}
