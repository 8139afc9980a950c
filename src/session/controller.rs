//! The per-play-session state machine
//!
//! ```text
//!   start ──► Running ◄──► Paused
//!                │
//!     last question / last sequence / timer / too many mistakes
//!                ▼
//!            Finished  (stats + max score + unlock written back once)
//! ```

use std::collections::HashMap;

use crate::error::EngineError;
use crate::level::{AnswerStatus, Level, LevelId, ScorePerNote};
use crate::note::{Note, PitchId};
use crate::progress::ProgressStore;
use crate::rng::Rng;

use super::question::QuestionRound;
use super::sequence::SequenceRound;
use super::types::{
    Answer, AnswerResult, EndReason, IgnoreReason, Input, Judgement, RejectReason, SessionSummary, TickResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone)]
enum Mode {
    Question(QuestionRound),
    Sequence(SequenceRound),
}

/// One play session on one level.
///
/// The session works on a snapshot of the level and only hands it back to the
/// [`ProgressStore`] when it finishes. The store keeps the level marked busy
/// until then, so a manual edit can't be overwritten by the finished session.
#[derive(Debug)]
pub struct Session {
    level: Level,
    mode: Mode,
    rng: Rng,
    phase: Phase,
    time_remaining: u32,
    right: u32,
    wrong: u32,
    session_scores: HashMap<Note, ScorePerNote>,
    stray_notice: Option<PitchId>,
    max_wrong_percent: u8,
    summary: Option<SessionSummary>,
}

impl Session {
    pub fn start(store: &mut ProgressStore, id: LevelId, rng: Rng) -> Result<Self, EngineError> {
        let level = store.begin_session(id)?;
        let max_wrong_percent = store.config().sequence_max_wrong_percent;
        match Self::from_snapshot(level, rng, max_wrong_percent) {
            Some(session) => Ok(session),
            None => {
                store.end_session(id);
                Err(EngineError::EmptyLevel(id))
            }
        }
    }

    fn from_snapshot(level: Level, mut rng: Rng, max_wrong_percent: u8) -> Option<Self> {
        let mode = if level.is_sequence() {
            Mode::Sequence(SequenceRound::start(&level, &mut rng)?)
        } else {
            Mode::Question(QuestionRound::start(&level, &mut rng)?)
        };
        log::info!(
            "session started on level {} ({} mode, {} notes)",
            level.id(),
            if level.is_sequence() { "sequence" } else { "question" },
            level.note_count()
        );
        Some(Self {
            time_remaining: level.timer(),
            level,
            mode,
            rng,
            phase: Phase::Running,
            right: 0,
            wrong: 0,
            session_scores: HashMap::new(),
            stray_notice: None,
            max_wrong_percent,
            summary: None,
        })
    }

    /// Throw away the progress of this session and start over from the
    /// store's current copy of the level. A finished session becomes a new one.
    pub fn reset(&mut self, store: &mut ProgressStore) -> Result<(), EngineError> {
        let id = self.level.id();
        let level = if self.phase == Phase::Finished {
            store.begin_session(id)?
        } else {
            store.session_snapshot(id)?
        };
        let rng = self.rng.clone();
        match Self::from_snapshot(level, rng, store.config().sequence_max_wrong_percent) {
            Some(fresh) => {
                *self = fresh;
                Ok(())
            }
            None => {
                store.end_session(id);
                self.phase = Phase::Finished;
                Err(EngineError::EmptyLevel(id))
            }
        }
    }

    /// Leave without finishing. Nothing from this session is saved.
    pub fn close(self, store: &mut ProgressStore) {
        if self.phase != Phase::Finished {
            log::info!("session on level {} abandoned", self.level.id());
            store.end_session(self.level.id());
        }
    }

    /// Freeze the timer and stop accepting answers. Returns false if nothing changed.
    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Paused;
        true
    }

    /// Continue after a pause, dismissing any stray-input notice
    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.stray_notice = None;
        self.phase = Phase::Running;
        true
    }

    /// One elapsed second
    pub fn tick(&mut self, store: &mut ProgressStore) -> TickResult {
        match self.phase {
            Phase::Finished => return TickResult::Ignored(IgnoreReason::Finished),
            Phase::Paused => return TickResult::Ignored(IgnoreReason::Paused),
            Phase::Running => {}
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            return TickResult::Ended(self.finish(store, EndReason::TimeUp));
        }
        TickResult::Counting {
            remaining: self.time_remaining,
        }
    }

    pub fn submit(&mut self, store: &mut ProgressStore, answer: Answer) -> AnswerResult {
        match self.phase {
            Phase::Finished => return AnswerResult::Ignored(IgnoreReason::Finished),
            Phase::Paused => return AnswerResult::Ignored(IgnoreReason::Paused),
            Phase::Running => {}
        }
        let input = match self.resolve(answer) {
            Ok(input) => input,
            Err(reason) => return AnswerResult::Rejected(reason),
        };
        let stray = input.is_stray();

        let result = match &mut self.mode {
            Mode::Question(round) => {
                let expected = *round.solution();
                self.answer_question(store, expected, input)
            }
            Mode::Sequence(round) => match round.push(input) {
                Some(pairs) => self.dispatch_sequence(store, pairs),
                None => AnswerResult::Buffered {
                    collected: round.collected(),
                    needed: round.length(),
                },
            },
        };

        if stray && self.phase == Phase::Running {
            if let Answer::Pitch(pitch) = answer {
                log::warn!("pitch {} is not part of level {}, pausing", pitch, self.level.id());
                self.stray_notice = Some(pitch);
                self.phase = Phase::Paused;
            }
        }
        result
    }

    fn answer_question(&mut self, store: &mut ProgressStore, expected: Note, input: Input) -> AnswerResult {
        let judgement = self.judge(expected, &input);
        let last = match &mut self.mode {
            Mode::Question(round) => round.advance(&self.level, &mut self.rng),
            Mode::Sequence(_) => false,
        };
        let end = last.then(|| self.finish(store, EndReason::QuestionsAnswered));
        AnswerResult::Judged { judgement, end }
    }

    fn dispatch_sequence(&mut self, store: &mut ProgressStore, pairs: Vec<(Note, Input)>) -> AnswerResult {
        let mut judgements = Vec::with_capacity(pairs.len());
        for (expected, input) in &pairs {
            let judgement = self.judge(*expected, input);
            if let Mode::Sequence(round) = &mut self.mode {
                round.record(judgement.status);
            }
            judgements.push(judgement);
        }

        let Mode::Sequence(round) = &mut self.mode else {
            return AnswerResult::SequenceJudged { judgements, end: None };
        };
        let reason = if round.too_many_mistakes(self.max_wrong_percent) {
            Some(EndReason::TooManyMistakes)
        } else if round.advance(&self.level, &mut self.rng) {
            Some(EndReason::SequencesCompleted)
        } else {
            self.time_remaining = self.level.timer();
            None
        };
        let end = reason.map(|reason| self.finish(store, reason));
        AnswerResult::SequenceJudged { judgements, end }
    }

    fn resolve(&self, answer: Answer) -> Result<Input, RejectReason> {
        match answer {
            Answer::Button(index) => self
                .button_labels()
                .into_iter()
                .nth(index)
                .map(Input::Label)
                .ok_or(RejectReason::UnknownButton(index)),
            Answer::Pitch(pitch) => Ok(Input::Pitch {
                pitch,
                stray: self.level.note_with_pitch(pitch).is_none(),
            }),
        }
    }

    fn judge(&mut self, expected: Note, input: &Input) -> Judgement {
        let status = if input.matches(&expected) {
            AnswerStatus::Right
        } else {
            AnswerStatus::Wrong
        };
        match status {
            AnswerStatus::Right => self.right += 1,
            AnswerStatus::Wrong => self.wrong += 1,
        }
        self.level.update_statistics(&expected, status);
        self.session_scores.entry(expected).or_default().record(status);
        log::debug!("expected {}: {:?}", expected, status);

        Judgement {
            expected,
            status,
            stray: input.is_stray(),
        }
    }

    /// The single place a session ends
    fn finish(&mut self, store: &mut ProgressStore, reason: EndReason) -> SessionSummary {
        self.phase = Phase::Finished;
        self.level.update_max_score_and_tries(self.right);
        let unlock = store.finalize_session(self.level.clone());
        log::info!(
            "session on level {} ended ({:?}): {} right, {} wrong, unlock {:?}",
            self.level.id(),
            reason,
            self.right,
            self.wrong,
            unlock
        );

        let summary = SessionSummary {
            level_id: self.level.id(),
            reason,
            right: self.right,
            wrong: self.wrong,
            per_note: self
                .level
                .notes()
                .iter()
                .map(|note| (*note, self.session_score(note)))
                .collect(),
            max_score: self.level.max_score(),
            number_of_tries: self.level.number_of_tries(),
            level_completed: self.level.is_completed(),
            unlock,
        };
        self.summary = Some(summary.clone());
        summary
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_id(&self) -> LevelId {
        self.level.id()
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.mode, Mode::Sequence(_))
    }

    pub fn button_labels(&self) -> Vec<String> {
        self.level.unique_note_names()
    }

    pub fn current_question(&self) -> Option<&Note> {
        match &self.mode {
            Mode::Question(round) if self.phase != Phase::Finished => Some(round.solution()),
            _ => None,
        }
    }

    /// Empty in standalone mode
    pub fn current_sequence(&self) -> &[Note] {
        match &self.mode {
            Mode::Sequence(round) if self.phase != Phase::Finished => round.sequence(),
            _ => &[],
        }
    }

    pub fn collected_answers(&self) -> usize {
        match &self.mode {
            Mode::Sequence(round) => round.collected(),
            Mode::Question(_) => 0,
        }
    }

    pub fn questions_remaining(&self) -> Option<u32> {
        match &self.mode {
            Mode::Question(round) => Some(round.remaining()),
            Mode::Sequence(_) => None,
        }
    }

    pub fn sequences_remaining(&self) -> Option<u32> {
        match &self.mode {
            Mode::Sequence(round) => Some(round.remaining()),
            Mode::Question(_) => None,
        }
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// The out-of-level pitch that paused the session, until it is resumed
    pub fn stray_notice(&self) -> Option<PitchId> {
        self.stray_notice
    }

    pub fn right_count(&self) -> u32 {
        self.right
    }

    pub fn wrong_count(&self) -> u32 {
        self.wrong
    }

    /// Score this time for one note
    pub fn session_score(&self, note: &Note) -> ScorePerNote {
        self.session_scores.get(note).copied().unwrap_or_default()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }
}
