//! # Session Module
//!
//! The game loop: draws questions or sequences, judges answers, runs the
//! timer, and writes the result back to the [`ProgressStore`](crate::ProgressStore)
//! exactly once.
//!
//! ## Sub-modules
//! - `types` - Answer, AnswerResult, TickResult, SessionSummary
//! - `controller` - The [`Session`] state machine and its single finalization path
//! - `question` - Standalone-question mode
//! - `sequence` - Sequence mode, with the abort rule over recent answers
//!
//! ## Modes
//!
//! ### Standalone questions
//! One note at a time, drawn uniformly from the level. The session ends when
//! the question counter or the timer reaches zero, whichever comes first.
//!
//! ### Sequences
//! A run of distinct notes. Answers are buffered until the run is complete,
//! then judged pairwise. If the wrong answers among the latest run exceed the
//! configured share (20% by default), the session ends on the spot. Otherwise
//! the timer resets and the next run is drawn.
//!
//! ## Judging
//! MIDI input matches by pitch. Button input matches by label, either the bare
//! letter ("G") or letter plus register ("G4"), following the level's button
//! labels. Statistics always go to the note that was asked for.
//!
//! A MIDI pitch that isn't in the level at all counts as wrong and also pauses
//! the session with a notice, see [`Session::stray_notice`].
//!
//! ## Example
//! ```rust
//! use sightread::{Answer, AnswerResult, AnswerStatus, EngineConfig, InMemory, ProgressStore, Rng, Session};
//!
//! let mut store = ProgressStore::with_storage(EngineConfig::default(), Box::new(InMemory::new())).unwrap();
//! let first = store.first_mandatory_level_id().unwrap();
//! let mut session = Session::start(&mut store, first, Rng::new_with_seed(1)).unwrap();
//!
//! let pitch = session.current_question().unwrap().pitch();
//! match session.submit(&mut store, Answer::Pitch(pitch)) {
//!     AnswerResult::Judged { judgement, .. } => assert_eq!(judgement.status, AnswerStatus::Right),
//!     other => panic!("unexpected {:?}", other),
//! }
//! session.close(&mut store);
//! ```

mod controller;
mod question;
mod sequence;
mod types;


pub use controller::Session;
pub use types::{
    Answer, AnswerResult, EndReason, IgnoreReason, Judgement, RejectReason, SessionSummary, TickResult,
};
