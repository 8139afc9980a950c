//! # Progress Store
//!
//! Owns the ordered level collection, its persistence, and the unlock chain.
//!
//! ## Layout
//! ```text
//! [ mandatory 0 | mandatory 1 | ... | mandatory n | free | free | ... ]
//!   └─ unlock chain: i+1 enables when i completes ─┘  └─ always enabled ─┘
//! ```
//!
//! ## Persistence
//! Every mutation writes the whole collection as one JSON document through the
//! configured [`Storage`]. A failed write keeps the in-memory state, logs a
//! warning, and publishes [`ProgressEvent::SaveFailed`]. A failed or missing
//! read at startup falls back to the seeded mandatory levels.
//!
//! ## Observers
//! [`ProgressStore::subscribe`] hands out a channel receiving one
//! [`ProgressEvent`] per mutation.
//!
//! ## Sessions
//! While a session is open on a level, the store refuses edits and deletion of
//! that level, so finalizing the session can't overwrite a manual change. History
//! reset and full reset are refused while any session is open.

use std::collections::HashSet;

use crossbeam_channel::{Receiver, Sender};

use crate::builder;
use crate::catalog::NoteCatalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::level::{Level, LevelId};
use crate::note::{Clef, Note, NoteName};
use crate::storage::{self, JsonFile, Storage};

/// Result of asking whether finishing a level unlocked the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockDecision {
    /// The next mandatory level was enabled just now
    Unlocked,
    /// The source level isn't completed yet; try again
    NotYetUnlocked,
    /// The source level is the last one
    AllLevelsDone,
    /// The next level was already enabled earlier
    AlreadyUnlocked,
    /// Unknown source level, or the next level is a free level
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotDeletable,
    NotFound,
    InSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    LevelAdded(LevelId),
    LevelDeleted(LevelId),
    LevelUpdated(LevelId),
    LevelUnlocked(LevelId),
    HistoryReset,
    Reset,
    SaveFailed(String),
}

/// Changes to a level's settings; `None` leaves a field untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelEdit {
    pub number_of_questions: Option<u32>,
    pub timer: Option<u32>,
    pub sequence_count: Option<u32>,
    pub sequence_note_count: Option<u32>,
}

pub struct ProgressStore {
    levels: Vec<Level>,
    storage: Box<dyn Storage>,
    catalog: NoteCatalog,
    config: EngineConfig,
    open_sessions: HashSet<LevelId>,
    subscribers: Vec<Sender<ProgressEvent>>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("levels", &self.levels.len())
            .field("storage", &self.storage.describe())
            .field("open_sessions", &self.open_sessions)
            .finish()
    }
}

impl ProgressStore {
    /// Open the store persisted at `config.levels_path()`
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let storage = JsonFile::new(config.levels_path());
        Self::with_storage(config, Box::new(storage))
    }

    /// Open a store over any storage backend
    pub fn with_storage(config: EngineConfig, storage: Box<dyn Storage>) -> Result<Self, EngineError> {
        let catalog = NoteCatalog::load_bundled(&config.catalog)?;

        let levels = match storage::load_json::<Vec<Level>>(storage.as_ref()) {
            Ok(Some(levels)) => {
                log::info!("loaded {} levels from {}", levels.len(), storage.describe());
                levels
            }
            Ok(None) => {
                log::info!("no saved progress at {}, seeding default levels", storage.describe());
                seed_levels(&catalog)?
            }
            Err(e) => {
                log::warn!(
                    "could not read progress from {} ({}), seeding default levels",
                    storage.describe(),
                    e
                );
                seed_levels(&catalog)?
            }
        };

        Ok(Self {
            levels,
            storage,
            catalog,
            config,
            open_sessions: HashSet::new(),
            subscribers: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &NoteCatalog {
        &self.catalog
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|level| level.id() == id)
    }

    pub fn index_of(&self, id: LevelId) -> Option<usize> {
        self.levels.iter().position(|level| level.id() == id)
    }

    pub fn first_mandatory_level_id(&self) -> Option<LevelId> {
        self.levels.iter().find(|l| !l.is_free_level()).map(Level::id)
    }

    pub fn first_custom_level_id(&self) -> Option<LevelId> {
        self.levels.iter().find(|l| l.is_free_level()).map(Level::id)
    }

    /// Whether a session is currently open on the level
    pub fn is_busy(&self, id: LevelId) -> bool {
        self.open_sessions.contains(&id)
    }

    /// Build a quarter note from this store's catalog
    pub fn note(&self, name: NoteName, register: i32, clef: Clef) -> Result<Note, EngineError> {
        Note::new(&self.catalog, name, register, clef)
    }

    /// Receive one event per mutation from now on
    pub fn subscribe(&mut self) -> Receiver<ProgressEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn publish(&mut self, event: ProgressEvent) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
    }

    /// Append a custom question level. The note set is expected to be validated.
    pub fn add_level(&mut self, number_of_questions: u32, timer: u32, notes: Vec<Note>) -> LevelId {
        self.push_level(Level::free(number_of_questions, timer, notes))
    }

    /// Append a custom sequence level. The note set is expected to be validated.
    pub fn add_sequence_level(
        &mut self,
        sequence_count: u32,
        sequence_note_count: u32,
        timer: u32,
        notes: Vec<Note>,
    ) -> LevelId {
        self.push_level(Level::free_sequence(sequence_count, sequence_note_count, timer, notes))
    }

    fn push_level(&mut self, level: Level) -> LevelId {
        let id = level.id();
        log::info!("adding custom level {} with {} notes", id, level.note_count());
        self.levels.push(level);
        self.publish(ProgressEvent::LevelAdded(id));
        self.persist();
        id
    }

    pub fn delete_level(&mut self, id: LevelId) -> DeleteOutcome {
        let Some(index) = self.index_of(id) else {
            return DeleteOutcome::NotFound;
        };
        if !self.levels[index].is_deletable() {
            return DeleteOutcome::NotDeletable;
        }
        if self.is_busy(id) {
            return DeleteOutcome::InSession;
        }

        self.levels.remove(index);
        log::info!("deleted level {}", id);
        self.publish(ProgressEvent::LevelDeleted(id));
        self.persist();
        DeleteOutcome::Deleted
    }

    /// Replace the stored level with the same id. Last writer wins.
    ///
    /// Returns false if no level has that id.
    pub fn update_level_info(&mut self, new_info: Level) -> bool {
        if !self.replace_level(new_info) {
            return false;
        }
        self.persist();
        true
    }

    fn replace_level(&mut self, new_info: Level) -> bool {
        let id = new_info.id();
        match self.index_of(id) {
            Some(index) => {
                self.levels[index] = new_info;
                self.publish(ProgressEvent::LevelUpdated(id));
                true
            }
            None => false,
        }
    }

    /// Apply a settings edit after checking it against the configured limits
    pub fn edit_level(&mut self, id: LevelId, edit: LevelEdit) -> Result<(), EngineError> {
        let mut level = self.level(id).cloned().ok_or(EngineError::LevelNotFound(id))?;
        if self.is_busy(id) {
            return Err(EngineError::LevelBusy(id));
        }
        builder::apply_edit(&mut level, edit, &self.config.limits)?;
        self.update_level_info(level);
        Ok(())
    }

    /// Decide, and apply, the unlock that follows finishing level `id`
    pub fn unlock_next_level(&mut self, id: LevelId) -> UnlockDecision {
        let decision = self.unlock_without_saving(id);
        if decision == UnlockDecision::Unlocked {
            self.persist();
        }
        decision
    }

    fn unlock_without_saving(&mut self, id: LevelId) -> UnlockDecision {
        let Some(index) = self.index_of(id) else {
            return UnlockDecision::NotApplicable;
        };
        if !self.levels[index].is_completed() {
            return UnlockDecision::NotYetUnlocked;
        }
        let Some(next) = self.levels.get_mut(index + 1) else {
            return UnlockDecision::AllLevelsDone;
        };
        // free levels sit outside the chain, even when already enabled
        if next.is_free_level() {
            return UnlockDecision::NotApplicable;
        }
        if next.is_enabled() {
            return UnlockDecision::AlreadyUnlocked;
        }

        next.set_enabled(true);
        let next_id = next.id();
        log::info!("level {} unlocked", next_id);
        self.publish(ProgressEvent::LevelUnlocked(next_id));
        UnlockDecision::Unlocked
    }

    /// Zero max score, tries and per-note statistics on every level.
    ///
    /// Refused with [`EngineError::LevelBusy`] while any session is open.
    pub fn reset_game_history(&mut self) -> Result<(), EngineError> {
        self.ensure_no_open_sessions()?;
        for level in &mut self.levels {
            level.reset_history();
        }
        self.publish(ProgressEvent::HistoryReset);
        self.persist();
        Ok(())
    }

    /// Throw away every level, custom ones included, and reseed the defaults.
    ///
    /// Refused with [`EngineError::LevelBusy`] while any session is open.
    pub fn reset_all(&mut self) -> Result<(), EngineError> {
        self.ensure_no_open_sessions()?;
        self.levels = seed_levels(&self.catalog)?;
        self.publish(ProgressEvent::Reset);
        self.persist();
        Ok(())
    }

    fn ensure_no_open_sessions(&self) -> Result<(), EngineError> {
        match self.open_sessions.iter().next() {
            Some(id) => {
                log::warn!("reset refused, level {} has an open session", id);
                Err(EngineError::LevelBusy(*id))
            }
            None => Ok(()),
        }
    }

    /// Write the collection now
    pub fn save(&self) -> Result<(), EngineError> {
        storage::save_json(self.storage.as_ref(), &self.levels)
    }

    fn persist(&mut self) {
        match self.save() {
            Ok(()) => log::debug!("saved {} levels to {}", self.levels.len(), self.storage.describe()),
            Err(e) => {
                log::warn!("failed to save progress to {}: {}", self.storage.describe(), e);
                self.publish(ProgressEvent::SaveFailed(e.to_string()));
            }
        }
    }

    /// Snapshot a level for a new session and mark it busy
    pub(crate) fn begin_session(&mut self, id: LevelId) -> Result<Level, EngineError> {
        let level = self.level(id).ok_or(EngineError::LevelNotFound(id))?;
        if !level.is_enabled() {
            return Err(EngineError::LevelLocked(id));
        }
        if level.notes().is_empty() {
            return Err(EngineError::EmptyLevel(id));
        }
        let snapshot = level.clone();
        if !self.open_sessions.insert(id) {
            return Err(EngineError::LevelBusy(id));
        }
        Ok(snapshot)
    }

    /// Fresh snapshot for a session that is restarting on a level it already holds
    pub(crate) fn session_snapshot(&self, id: LevelId) -> Result<Level, EngineError> {
        self.level(id).cloned().ok_or(EngineError::LevelNotFound(id))
    }

    pub(crate) fn end_session(&mut self, id: LevelId) {
        self.open_sessions.remove(&id);
    }

    /// Store a finished session's level, run the unlock chain, and save once
    pub(crate) fn finalize_session(&mut self, level: Level) -> UnlockDecision {
        let id = level.id();
        self.end_session(id);
        if !self.replace_level(level) {
            log::warn!("finished session for level {} which no longer exists", id);
            return UnlockDecision::NotApplicable;
        }
        let decision = self.unlock_without_saving(id);
        self.persist();
        decision
    }
}

/// The mandatory levels a new player starts with. Only the first is enabled.
pub fn seed_levels(catalog: &NoteCatalog) -> Result<Vec<Level>, EngineError> {
    use NoteName::*;

    let plan: [(&[(NoteName, i32)], Clef); 5] = [
        (&[(C, 4), (G, 4)], Clef::G),
        (&[(C, 4), (G, 4), (C, 5), (G, 5)], Clef::G),
        (&[(C, 4), (E, 4), (G, 4), (C, 5)], Clef::G),
        (&[(C, 4), (D, 4), (E, 4), (F, 4), (G, 4), (A, 4), (B, 4)], Clef::G),
        (&[(G, 2), (B, 2), (D, 3), (F, 3), (A, 3)], Clef::F),
    ];

    plan.iter()
        .enumerate()
        .map(|(i, (notes, clef))| {
            let notes = notes
                .iter()
                .map(|(name, register)| Note::new(catalog, *name, *register, *clef))
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, EngineError>(Level::mandatory(notes).with_enabled(i == 0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::AnswerStatus;
    use crate::storage::InMemory;

    fn store_with(storage: InMemory) -> ProgressStore {
        ProgressStore::with_storage(EngineConfig::default(), Box::new(storage)).unwrap()
    }

    fn store() -> ProgressStore {
        store_with(InMemory::new())
    }

    fn two_notes(store: &ProgressStore) -> Vec<Note> {
        vec![
            store.note(NoteName::C, 4, Clef::G).unwrap(),
            store.note(NoteName::G, 4, Clef::G).unwrap(),
        ]
    }

    fn complete(store: &mut ProgressStore, index: usize) {
        let mut level = store.levels()[index].clone();
        level.update_max_score_and_tries(95);
        assert!(store.update_level_info(level));
    }

    #[test]
    fn test_seeds_when_nothing_is_stored() {
        let store = store();
        assert_eq!(store.len(), 5);
        assert!(store.levels()[0].is_enabled());
        assert!(store.levels()[1..].iter().all(|l| !l.is_enabled() && !l.is_free_level()));
        assert_eq!(store.first_custom_level_id(), None);
        assert_eq!(store.first_mandatory_level_id(), Some(store.levels()[0].id()));
    }

    #[test]
    fn test_seeds_when_stored_data_is_unreadable() {
        let store = store_with(InMemory::with_contents("{\"schema\": 2}"));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_unlock_sequence() {
        let mut store = store();
        let l0 = store.levels()[0].id();
        let l1 = store.levels()[1].id();

        assert_eq!(store.unlock_next_level(l0), UnlockDecision::NotYetUnlocked);
        assert!(!store.level(l1).unwrap().is_enabled());

        complete(&mut store, 0);
        assert_eq!(store.unlock_next_level(l0), UnlockDecision::Unlocked);
        assert!(store.level(l1).unwrap().is_enabled());
        assert_eq!(store.unlock_next_level(l0), UnlockDecision::AlreadyUnlocked);
    }

    #[test]
    fn test_unlock_unknown_and_last_level() {
        let mut store = store();
        assert_eq!(store.unlock_next_level(LevelId::new()), UnlockDecision::NotApplicable);

        let last = store.len() - 1;
        complete(&mut store, last);
        let last_id = store.levels()[last].id();
        assert_eq!(store.unlock_next_level(last_id), UnlockDecision::AllLevelsDone);
    }

    #[test]
    fn test_free_level_never_reported_as_unlocked() {
        let mut store = store();
        let notes = two_notes(&store);
        store.add_level(20, 60, notes);
        let last_mandatory = store.len() - 2;
        let id = store.levels()[last_mandatory].id();

        assert_eq!(store.unlock_next_level(id), UnlockDecision::NotYetUnlocked);
        complete(&mut store, last_mandatory);
        assert_eq!(store.unlock_next_level(id), UnlockDecision::NotApplicable);
        assert_eq!(store.unlock_next_level(id), UnlockDecision::NotApplicable);
    }

    #[test]
    fn test_add_levels_are_free_enabled_and_persisted() {
        let storage = InMemory::new();
        let mut store = store_with(storage.clone());
        let notes = two_notes(&store);
        let id = store.add_level(25, 90, notes.clone());
        let seq = store.add_sequence_level(3, 2, 20, notes);

        let level = store.level(id).unwrap();
        assert!(level.is_free_level() && level.is_enabled() && level.is_deletable());
        assert_eq!(level.number_of_questions(), 25);
        assert_eq!(level.timer(), 90);
        assert!(store.level(seq).unwrap().is_sequence());
        assert_eq!(store.first_custom_level_id(), Some(id));

        let reopened = store_with(storage);
        assert_eq!(reopened.levels(), store.levels());
    }

    #[test]
    fn test_delete_level() {
        let mut store = store();
        let notes = two_notes(&store);
        let id = store.add_level(20, 60, notes);
        let mandatory = store.levels()[0].id();

        assert_eq!(store.delete_level(mandatory), DeleteOutcome::NotDeletable);
        assert_eq!(store.delete_level(id), DeleteOutcome::Deleted);
        assert_eq!(store.delete_level(id), DeleteOutcome::NotFound);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_busy_level_refuses_edit_and_delete() {
        let mut store = store();
        let notes = two_notes(&store);
        let id = store.add_level(20, 60, notes);
        store.begin_session(id).unwrap();

        assert!(matches!(store.begin_session(id), Err(EngineError::LevelBusy(_))));
        assert_eq!(store.delete_level(id), DeleteOutcome::InSession);
        let edit = LevelEdit { timer: Some(30), ..LevelEdit::default() };
        assert!(matches!(store.edit_level(id, edit), Err(EngineError::LevelBusy(_))));

        store.end_session(id);
        store.edit_level(id, edit).unwrap();
        assert_eq!(store.level(id).unwrap().timer(), 30);
    }

    #[test]
    fn test_resets_wait_for_open_sessions() {
        let mut store = store();
        let first = store.levels()[0].clone();
        let mut played = first.clone();
        played.update_max_score_and_tries(40);
        store.update_level_info(played);
        let events = store.subscribe();

        let snapshot = store.begin_session(first.id()).unwrap();
        assert!(matches!(store.reset_game_history(), Err(EngineError::LevelBusy(id)) if id == first.id()));
        assert!(matches!(store.reset_all(), Err(EngineError::LevelBusy(_))));
        assert_eq!(store.level(first.id()).unwrap().max_score(), 40);
        assert_eq!(store.len(), 5);
        assert!(events.try_iter().next().is_none());

        store.finalize_session(snapshot);
        store.reset_game_history().unwrap();
        let level = store.level(first.id()).unwrap();
        assert_eq!(level.max_score(), 0);
        assert_eq!(level.number_of_tries(), 0);
    }

    #[test]
    fn test_begin_session_on_locked_level() {
        let mut store = store();
        let locked = store.levels()[1].id();
        assert!(matches!(store.begin_session(locked), Err(EngineError::LevelLocked(_))));
        assert!(matches!(store.begin_session(LevelId::new()), Err(EngineError::LevelNotFound(_))));
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let storage = InMemory::new();
        let mut store = store_with(storage.clone());
        let events = store.subscribe();
        storage.set_fail_writes(true);

        let notes = two_notes(&store);
        let id = store.add_level(20, 60, notes);
        assert!(store.level(id).is_some());
        assert_eq!(events.try_recv().unwrap(), ProgressEvent::LevelAdded(id));
        assert!(matches!(events.try_recv().unwrap(), ProgressEvent::SaveFailed(_)));
        assert_eq!(storage.contents(), None);
    }

    #[test]
    fn test_reset_game_history_and_reset_all() {
        let mut store = store();
        let first = store.levels()[0].clone();
        let mut played = first.clone();
        let c4 = played.notes()[0];
        played.update_statistics(&c4, AnswerStatus::Right);
        played.update_max_score_and_tries(50);
        store.update_level_info(played);
        let notes = two_notes(&store);
        store.add_level(20, 60, notes);

        store.reset_game_history().unwrap();
        let level = store.level(first.id()).unwrap();
        assert_eq!(level.max_score(), 0);
        assert_eq!(level.number_of_tries(), 0);
        assert_eq!(level.score_for(&c4, AnswerStatus::Right), 0);
        assert_eq!(store.len(), 6);

        store.reset_all().unwrap();
        assert_eq!(store.len(), 5);
        assert!(store.level(first.id()).is_none());
    }

    #[test]
    fn test_events_for_unlock() {
        let mut store = store();
        let events = store.subscribe();
        complete(&mut store, 0);
        let l0 = store.levels()[0].id();
        let l1 = store.levels()[1].id();
        store.unlock_next_level(l0);

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![ProgressEvent::LevelUpdated(l0), ProgressEvent::LevelUnlocked(l1)]
        );
    }
}
