//! # Error Types
//!
//! This module defines the error type shared by every engine operation.
//!
//! ## Error Types
//! - `UnknownPitch` - The note catalog has no entry for a name/register pair
//! - `LevelNotFound`, `LevelLocked`, `LevelBusy`, `EmptyLevel` - A session or edit
//!   targeted a level it cannot use
//! - `InvalidLevel` - A new or edited level failed boundary validation
//! - `Config`, `Catalog` - Malformed configuration or catalog asset
//! - `Io`, `Json`, `Yaml` - Persistence and parsing failures
//!
//! ## Usage
//! ```rust
//! use sightread::{EngineError, Note, NoteCatalog, NoteName, Clef};
//!
//! match Note::new(NoteCatalog::bundled(), NoteName::C, 4, Clef::G) {
//!     Ok(note) => assert_eq!(note.pitch(), 60),
//!     Err(EngineError::UnknownPitch { name, register }) => {
//!         eprintln!("no pitch for {}{}", name, register);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::level::LevelId;
use crate::note::NoteName;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Pitch lookup miss.
    ///
    /// The catalog has no register matching the request, or the register lacks
    /// the letter name. Never substituted with a neighbouring pitch.
    ///
    /// # Example
    /// ```
    /// # use sightread::{EngineError, NoteName};
    /// let err = EngineError::UnknownPitch { name: NoteName::C, register: 9 };
    /// assert_eq!(err.to_string(), "No catalog pitch for C in register 9");
    /// ```
    #[error("No catalog pitch for {name} in register {register}")]
    UnknownPitch { name: NoteName, register: u8 },

    #[error("Level {0} not found")]
    LevelNotFound(LevelId),

    #[error("Level {0} is locked")]
    LevelLocked(LevelId),

    /// A session is already open on the level, so it can't be started or edited.
    #[error("Level {0} has an open session")]
    LevelBusy(LevelId),

    #[error("Level {0} has no notes")]
    EmptyLevel(LevelId),

    /// Boundary validation failure for a new or edited level.
    ///
    /// # Example
    /// ```
    /// # use sightread::EngineError;
    /// let err = EngineError::InvalidLevel("a level needs at least 2 notes".to_string());
    /// assert_eq!(err.to_string(), "Invalid level: a level needs at least 2 notes");
    /// ```
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid note catalog: {0}")]
    Catalog(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
