//! Durable storage for the persisted JSON documents.
//!
//! A [`Storage`] holds exactly one document. [`JsonFile`] writes it atomically
//! (temporary file + rename) so a crash never leaves a half-written collection;
//! [`InMemory`] backs tests and embedders that persist elsewhere.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EngineError;

pub trait Storage: Send {
    /// The stored document, or `None` if nothing has been written yet
    fn read(&self) -> Result<Option<String>, EngineError>;

    /// Replace the stored document in one step
    fn write(&self, contents: &str) -> Result<(), EngineError>;

    /// Where the document lives, for log messages
    fn describe(&self) -> String;
}

pub(crate) fn load_json<T: DeserializeOwned>(storage: &dyn Storage) -> Result<Option<T>, EngineError> {
    match storage.read()? {
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        None => Ok(None),
    }
}

pub(crate) fn save_json<T: Serialize + ?Sized>(storage: &dyn Storage, value: &T) -> Result<(), EngineError> {
    let contents = serde_json::to_string_pretty(value)?;
    storage.write(&contents)
}

/// A JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Storage for JsonFile {
    fn read(&self) -> Result<Option<String>, EngineError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::io(&self.path, e)),
        }
    }

    fn write(&self, contents: &str) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, contents).map_err(|e| EngineError::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| EngineError::io(&self.path, e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    fail_writes: bool,
}

/// Storage kept in memory. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.state().contents = Some(contents.into());
        storage
    }

    /// Make every following write fail, to exercise persistence-failure paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn contents(&self) -> Option<String> {
        self.state().contents.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for InMemory {
    fn read(&self) -> Result<Option<String>, EngineError> {
        Ok(self.state().contents.clone())
    }

    fn write(&self, contents: &str) -> Result<(), EngineError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(EngineError::io(
                "<memory>",
                std::io::Error::new(std::io::ErrorKind::Other, "writes disabled"),
            ));
        }
        state.contents = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
