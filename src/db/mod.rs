//! SQLite persistence layer for dadgar
//!
//! Two tiers share one database file: a `settings` key-value table for
//! small JSON-serialized blobs (saved lawyers, checkpoints, the autosave
//! snapshot) and a `lawyers` record table holding every lawyer the model
//! has ever discovered, deduplicated by (name, website).

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::DadgarPaths;
use crate::models::Lawyer;

/// Fixed settings keys. Each key holds one JSON document.
pub const KEY_SAVED_LAWYERS: &str = "saved_lawyers";
pub const KEY_CHECKPOINTS: &str = "checkpoints";
pub const KEY_AUTOSAVE: &str = "autosave";
pub const KEY_LAST_PLAN: &str = "last_plan";

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing database
    pub fn open(paths: &DadgarPaths) -> Result<Self> {
        let conn = Connection::open(&paths.db_file).context("Failed to open dadgar database")?;
        Ok(Self { conn })
    }

    /// Initialize a new database with schema
    pub fn init(paths: &DadgarPaths) -> Result<Self> {
        let conn = Connection::open(&paths.db_file).context("Failed to create dadgar database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key    TEXT PRIMARY KEY,
                value  TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create settings table")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS lawyers (
                name                 TEXT NOT NULL,
                specialty            TEXT NOT NULL DEFAULT '',
                city                 TEXT NOT NULL DEFAULT '',
                address              TEXT NOT NULL DEFAULT '',
                contact_info         TEXT NOT NULL DEFAULT '',
                website              TEXT NOT NULL,
                website_title        TEXT NOT NULL DEFAULT '',
                relevance_score      INTEGER NOT NULL DEFAULT 0,
                years_of_experience  INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (name, website)
            )
            "#,
            [],
        )
        .context("Failed to create lawyers table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_lawyers_city ON lawyers(city)",
            [],
        )?;

        Ok(Self { conn })
    }

    // Settings tier

    /// Store a JSON-serializable value under a fixed key, overwriting any
    /// previous value.
    pub fn put_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize setting")?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, json],
            )
            .with_context(|| format!("Failed to write setting {}", key))?;
        Ok(())
    }

    /// Read a setting. Missing keys are `None`; a corrupt value is an error
    /// (callers that must not fail use [`Database::setting_or_default`]).
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(json) => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt setting {}", key))?;
                Ok(Some(value))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort read used at startup: a missing or corrupt entry
    /// degrades to the default value and never blocks initialization.
    pub fn setting_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get_setting(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!("ignoring unreadable setting {}: {}", key, e);
                T::default()
            }
        }
    }

    // Lawyer directory tier

    /// Insert a batch of discovered lawyers, skipping any whose
    /// (name, website) identity is already present. Returns the number of
    /// rows actually added.
    pub fn add_lawyers(&self, lawyers: &[Lawyer]) -> Result<usize> {
        let mut added = 0;
        let mut stmt = self.conn.prepare(
            r#"
            INSERT OR IGNORE INTO lawyers
            (name, specialty, city, address, contact_info, website, website_title,
             relevance_score, years_of_experience)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;
        for lawyer in lawyers {
            let changed = stmt
                .execute(params![
                    lawyer.name,
                    lawyer.specialty,
                    lawyer.city,
                    lawyer.address,
                    lawyer.contact_info,
                    lawyer.website,
                    lawyer.website_title,
                    lawyer.relevance_score,
                    lawyer.years_of_experience,
                ])
                .context("Failed to insert lawyer")?;
            added += changed;
        }
        Ok(added)
    }

    /// Retrieve the full directory in insertion order.
    pub fn all_lawyers(&self) -> Result<Vec<Lawyer>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, specialty, city, address, contact_info, website,
                   website_title, relevance_score, years_of_experience
            FROM lawyers
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Lawyer {
                name: row.get(0)?,
                specialty: row.get(1)?,
                city: row.get(2)?,
                address: row.get(3)?,
                contact_info: row.get(4)?,
                website: row.get(5)?,
                website_title: row.get(6)?,
                relevance_score: row.get(7)?,
                years_of_experience: row.get(8)?,
                notes: None,
            })
        })?;

        let mut lawyers = Vec::new();
        for row in rows {
            lawyers.push(row?);
        }
        Ok(lawyers)
    }

    /// Remove every discovered lawyer. Destructive; callers confirm first.
    pub fn clear_lawyers(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM lawyers", [])
            .context("Failed to clear lawyer directory")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn lawyer(name: &str, website: &str) -> Lawyer {
        Lawyer {
            name: name.to_string(),
            website: website.to_string(),
            ..Lawyer::default()
        }
    }

    #[test]
    fn add_lawyers_dedups_by_name_and_website() {
        let (_temp, db) = test_db();
        let first = vec![lawyer("Jane", "https://a.example"), lawyer("Ali", "https://b.example")];
        assert_eq!(db.add_lawyers(&first).unwrap(), 2);

        // Same identity again, plus one genuinely new record.
        let second = vec![lawyer("Jane", "https://a.example"), lawyer("Jane", "https://c.example")];
        assert_eq!(db.add_lawyers(&second).unwrap(), 1);
        assert_eq!(db.all_lawyers().unwrap().len(), 3);
    }

    #[test]
    fn all_lawyers_preserves_insertion_order() {
        let (_temp, db) = test_db();
        db.add_lawyers(&[lawyer("Z", "https://z.example"), lawyer("A", "https://a.example")])
            .unwrap();
        let names: Vec<String> = db.all_lawyers().unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Z", "A"]);
    }

    #[test]
    fn clear_lawyers_empties_directory() {
        let (_temp, db) = test_db();
        db.add_lawyers(&[lawyer("Jane", "https://a.example")]).unwrap();
        db.clear_lawyers().unwrap();
        assert!(db.all_lawyers().unwrap().is_empty());
    }

    #[test]
    fn settings_round_trip() {
        let (_temp, db) = test_db();
        db.put_setting(KEY_AUTOSAVE, &vec!["a".to_string(), "b".to_string()])
            .unwrap();
        let value: Option<Vec<String>> = db.get_setting(KEY_AUTOSAVE).unwrap();
        assert_eq!(value.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn setting_or_default_swallows_corrupt_entries() {
        let (_temp, db) = test_db();
        db.put_setting(KEY_AUTOSAVE, &"not a list").unwrap();
        let value: Vec<String> = db.setting_or_default(KEY_AUTOSAVE);
        assert!(value.is_empty());
    }

    #[test]
    fn missing_setting_reads_as_none() {
        let (_temp, db) = test_db();
        let value: Option<Vec<String>> = db.get_setting("nope").unwrap();
        assert!(value.is_none());
    }
}
