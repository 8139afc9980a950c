pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod level;
pub mod note;
pub mod progress;
pub mod rng;
pub mod session;
pub mod storage;

pub use builder::LevelBuilder;
pub use catalog::NoteCatalog;
pub use config::{EngineConfig, Limits};
pub use error::*;
pub use history::NavigationHistory;
pub use level::{AnswerStatus, Level, LevelId, ScorePerNote, REQUIRED_SCORE};
pub use note::{Accidental, Clef, Duration, Note, NoteName, PitchId};
pub use progress::{DeleteOutcome, LevelEdit, ProgressEvent, ProgressStore, UnlockDecision};
pub use rng::Rng;
pub use session::{
    Answer, AnswerResult, EndReason, IgnoreReason, Judgement, RejectReason, Session, SessionSummary, TickResult,
};
pub use storage::{InMemory, JsonFile, Storage};

/// Open the persisted progress described by an optional YAML config file.
/// This is the main entry point for the library.
pub fn open(config_path: Option<&std::path::Path>) -> Result<ProgressStore, EngineError> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    ProgressStore::open(config)
}
