//! Debounced autosave of in-progress form input
//!
//! Every tracked-input change restarts a fixed debounce window; only when
//! the window expires is the snapshot written, so a burst of edits costs a
//! single write of the final values. The indicator walks idle -> saving ->
//! saved and lingers on saved briefly before reverting to idle.
//!
//! The window is modelled as an explicit deadline that a driver loop
//! polls, which keeps the logic deterministic and testable without timers.

use std::time::{Duration, Instant};

use crate::db::{Database, KEY_AUTOSAVE};
use crate::models::{AutoSaveData, SaveStatus};

pub struct Autosaver {
    debounce: Duration,
    linger: Duration,
    pending: Option<AutoSaveData>,
    deadline: Option<Instant>,
    status: SaveStatus,
    status_until: Option<Instant>,
}

impl Autosaver {
    pub fn new(debounce: Duration, linger: Duration) -> Self {
        Self {
            debounce,
            linger,
            pending: None,
            deadline: None,
            status: SaveStatus::Idle,
            status_until: None,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Record a change to the tracked inputs, (re)starting the window.
    pub fn record(&mut self, data: AutoSaveData, now: Instant) {
        self.pending = Some(data);
        self.deadline = Some(now + self.debounce);
        self.status = SaveStatus::Saving;
        self.status_until = None;
    }

    /// Advance the clock: flush an expired window, age the indicator.
    /// Returns true when a snapshot was written this tick.
    pub fn tick(&mut self, db: &Database, now: Instant) -> bool {
        if let (Some(deadline), Some(_)) = (self.deadline, self.pending.as_ref()) {
            if now >= deadline {
                let data = self.pending.take().unwrap_or_default();
                self.deadline = None;
                return self.write(db, &data, now);
            }
        }

        if self.status == SaveStatus::Saved {
            if let Some(until) = self.status_until {
                if now >= until {
                    self.status = SaveStatus::Idle;
                    self.status_until = None;
                }
            }
        }
        false
    }

    /// Write whatever is pending immediately (shutdown path).
    pub fn flush(&mut self, db: &Database, now: Instant) -> bool {
        match self.pending.take() {
            Some(data) => {
                self.deadline = None;
                self.write(db, &data, now)
            }
            None => false,
        }
    }

    fn write(&mut self, db: &Database, data: &AutoSaveData, now: Instant) -> bool {
        match db.put_setting(KEY_AUTOSAVE, data) {
            Ok(()) => {
                self.status = SaveStatus::Saved;
                self.status_until = Some(now + self.linger);
                true
            }
            Err(e) => {
                // Autosave is best-effort; losing one snapshot is fine.
                tracing::warn!("autosave write failed: {}", e);
                self.status = SaveStatus::Idle;
                self.status_until = None;
                false
            }
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

    fn snapshot(topic: &str) -> AutoSaveData {
        AutoSaveData {
            topic: topic.to_string(),
            ..AutoSaveData::default()
        }
    }

    #[test]
    fn burst_of_edits_writes_once_with_final_values() {
        let (_temp, db) = test_db();
        let mut saver = Autosaver::new(Duration::from_millis(1500), Duration::from_millis(2000));
        let t0 = Instant::now();

        // Three keystrokes inside the window.
        saver.record(snapshot("a"), t0);
        saver.record(snapshot("ab"), t0 + Duration::from_millis(300));
        saver.record(snapshot("abc"), t0 + Duration::from_millis(600));

        // Window restarted at t0+600; nothing due before t0+2100.
        assert!(!saver.tick(&db, t0 + Duration::from_millis(2000)));
        assert_eq!(saver.status(), SaveStatus::Saving);

        assert!(saver.tick(&db, t0 + Duration::from_millis(2100)));
        assert_eq!(saver.status(), SaveStatus::Saved);

        // Exactly one snapshot, holding the final values.
        let stored: AutoSaveData = db.get_setting(KEY_AUTOSAVE).unwrap().unwrap();
        assert_eq!(stored.topic, "abc");

        // No further writes without further edits.
        assert!(!saver.tick(&db, t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn saved_indicator_reverts_to_idle_after_linger() {
        let (_temp, db) = test_db();
        let mut saver = Autosaver::new(Duration::from_millis(100), Duration::from_millis(2000));
        let t0 = Instant::now();

        saver.record(snapshot("x"), t0);
        saver.tick(&db, t0 + Duration::from_millis(100));
        assert_eq!(saver.status(), SaveStatus::Saved);

        saver.tick(&db, t0 + Duration::from_millis(2099));
        assert_eq!(saver.status(), SaveStatus::Saved);

        saver.tick(&db, t0 + Duration::from_millis(2200));
        assert_eq!(saver.status(), SaveStatus::Idle);
    }

    #[test]
    fn flush_writes_pending_immediately() {
        let (_temp, db) = test_db();
        let mut saver = Autosaver::new(Duration::from_millis(1500), Duration::from_millis(2000));
        let t0 = Instant::now();

        saver.record(snapshot("unsaved"), t0);
        assert!(saver.flush(&db, t0));
        let stored: AutoSaveData = db.get_setting(KEY_AUTOSAVE).unwrap().unwrap();
        assert_eq!(stored.topic, "unsaved");

        // Nothing left to flush.
        assert!(!saver.flush(&db, t0));
    }

}
