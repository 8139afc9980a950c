//! Navigation back-stack, persisted apart from the level collection.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::level::LevelId;
use crate::storage::{self, JsonFile, Storage};

pub struct NavigationHistory {
    stack: Vec<LevelId>,
    storage: Box<dyn Storage>,
}

impl std::fmt::Debug for NavigationHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationHistory")
            .field("stack", &self.stack)
            .field("storage", &self.storage.describe())
            .finish()
    }
}

impl NavigationHistory {
    pub fn open(config: &EngineConfig) -> Self {
        Self::with_storage(Box::new(JsonFile::new(config.history_path())))
    }

    /// Load the stack; unreadable history starts empty
    pub fn with_storage(storage: Box<dyn Storage>) -> Self {
        let stack = match storage::load_json::<Vec<LevelId>>(storage.as_ref()) {
            Ok(stack) => stack.unwrap_or_default(),
            Err(e) => {
                log::warn!("could not read history from {} ({}), starting empty", storage.describe(), e);
                Vec::new()
            }
        };
        Self { stack, storage }
    }

    pub fn push(&mut self, id: LevelId) {
        self.stack.push(id);
    }

    pub fn pop(&mut self) -> Option<LevelId> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<LevelId> {
        self.stack.last().copied()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn entries(&self) -> &[LevelId] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn save(&self) -> Result<(), EngineError> {
        storage::save_json(self.storage.as_ref(), &self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemory;

    #[test]
    fn test_push_pop_and_reload() {
        let storage = InMemory::new();
        let mut history = NavigationHistory::with_storage(Box::new(storage.clone()));
        let (a, b) = (LevelId::new(), LevelId::new());
        history.push(a);
        history.push(b);
        history.save().unwrap();

        let mut reloaded = NavigationHistory::with_storage(Box::new(storage));
        assert_eq!(reloaded.entries(), &[a, b]);
        assert_eq!(reloaded.pop(), Some(b));
        assert_eq!(reloaded.peek(), Some(a));
        reloaded.clear();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_unreadable_history_is_empty() {
        let history = NavigationHistory::with_storage(Box::new(InMemory::with_contents("not json")));
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_file_is_separate() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::in_dir(dir.path());
        let mut history = NavigationHistory::open(&config);
        history.push(LevelId::new());
        history.save().unwrap();
        assert!(config.history_path().exists());
        assert!(!config.levels_path().exists());
    }
}
