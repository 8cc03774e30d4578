//! Named snapshots of the full application state
//!
//! A checkpoint captures a deep copy of every feature slice under a
//! user-supplied name. The list is kept newest-first and mirrored into the
//! settings store whenever it changes; a failed write is logged and
//! swallowed so checkpointing never takes the app down.

use serde::{Deserialize, Serialize};

use crate::db::{Database, KEY_CHECKPOINTS};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    /// Creation time, unix milliseconds.
    pub timestamp: i64,
    pub name: String,
    #[serde(default)]
    pub state: AppState,
}

#[derive(Debug, Default)]
pub struct CheckpointManager {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointManager {
    /// Load the persisted list; corrupt or missing data yields an empty
    /// manager rather than an error.
    pub fn load(db: &Database) -> Self {
        Self {
            checkpoints: db.setting_or_default(KEY_CHECKPOINTS),
        }
    }

    pub fn list(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Snapshot the current state under `name`, newest first.
    ///
    /// An empty (or whitespace) name aborts and returns `None`, matching
    /// a cancelled name prompt.
    pub fn create(&mut self, db: &Database, name: &str, state: &AppState) -> Option<&Checkpoint> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let checkpoint = Checkpoint {
            id: format!("ckpt-{}", uuid::Uuid::new_v4()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            name: name.to_string(),
            state: state.clone(),
        };
        self.checkpoints.insert(0, checkpoint);
        self.persist(db);
        self.checkpoints.first()
    }

    /// Return a copy of the snapshot for `id`, or `None` when missing.
    /// Restoring does not consume the checkpoint; a second restore of the
    /// same id yields the identical state.
    pub fn restore(&self, id: &str) -> Option<AppState> {
        self.checkpoints
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state.clone())
    }

    /// Delete by id. Confirmation happens at the CLI edge; this just
    /// removes and persists. Returns whether anything was removed.
    pub fn delete(&mut self, db: &Database, id: &str) -> bool {
        let before = self.checkpoints.len();
        self.checkpoints.retain(|c| c.id != id);
        let removed = self.checkpoints.len() != before;
        if removed {
            self.persist(db);
        }
        removed
    }

    fn persist(&self, db: &Database) {
        if let Err(e) = db.put_setting(KEY_CHECKPOINTS, &self.checkpoints) {
            tracing::warn!("failed to persist checkpoints: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DadgarPaths;
    use std::fs;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let temp = TempDir::new().unwrap();
        let paths = DadgarPaths {
            root: temp.path().to_path_buf(),
            config: temp.path().join("config.toml"),
            db: temp.path().join("db"),
            db_file: temp.path().join("db/dadgar.db"),
        };
        fs::create_dir_all(&paths.db).unwrap();
        let db = Database::init(&paths).unwrap();
        (temp, db)
    }

    #[test]
    fn create_then_restore_round_trips_state() {
        let (_temp, db) = test_db();
        let mut mgr = CheckpointManager::default();

        let mut state = AppState::default();
        state.drafter.topic = "breach of contract".into();
        state.news.query = "tax reform".into();

        let id = mgr.create(&db, "before edits", &state).unwrap().id.clone();

        // Mutate afterwards; the snapshot must be unaffected.
        state.drafter.topic = "something else".into();

        let restored = mgr.restore(&id).unwrap();
        assert_eq!(restored.drafter.topic, "breach of contract");
        assert_eq!(restored.news.query, "tax reform");

        // Restore is idempotent.
        let again = mgr.restore(&id).unwrap();
        assert_eq!(again.drafter.topic, restored.drafter.topic);
    }

    #[test]
    fn empty_name_aborts_creation() {
        let (_temp, db) = test_db();
        let mut mgr = CheckpointManager::default();
        assert!(mgr.create(&db, "   ", &AppState::default()).is_none());
        assert!(mgr.list().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let (_temp, db) = test_db();
        let mut mgr = CheckpointManager::default();
        mgr.create(&db, "first", &AppState::default());
        mgr.create(&db, "second", &AppState::default());
        assert_eq!(mgr.list()[0].name, "second");
        assert_eq!(mgr.list()[1].name, "first");
    }

    #[test]
    fn restore_of_missing_id_is_none() {
        let mgr = CheckpointManager::default();
        assert!(mgr.restore("ckpt-missing").is_none());
    }

    #[test]
    fn delete_removes_and_persists() {
        let (_temp, db) = test_db();
        let mut mgr = CheckpointManager::default();
        let id = mgr
            .create(&db, "doomed", &AppState::default())
            .unwrap()
            .id
            .clone();
        assert!(mgr.delete(&db, &id));
        assert!(!mgr.delete(&db, &id));

        let reloaded = CheckpointManager::load(&db);
        assert!(reloaded.list().is_empty());
    }

    #[test]
    fn persisted_list_survives_reload() {
        let (_temp, db) = test_db();
        let mut mgr = CheckpointManager::default();
        let mut state = AppState::default();
        state.strategy.goal = "launch the export business".into();
        mgr.create(&db, "kept", &state);

        let reloaded = CheckpointManager::load(&db);
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.list()[0].state.strategy.goal, "launch the export business");
    }
}
