// Integration tests for session persistence: the saved-lawyer shortlist,
// autosave snapshots, the discovered directory, and checkpoint round-trips,
// all through the public Assistant API.

use anyhow::Result;
use dadgar::config::{Config, DadgarPaths};
use dadgar::db::Database;
use dadgar::models::{DocType, Lawyer};
use dadgar::session::{Assistant, DirectoryFilter, LawyerSort};
use std::fs;
use tempfile::TempDir;

fn setup() -> Result<(TempDir, DadgarPaths)> {
    let temp = TempDir::new()?;
    let paths = DadgarPaths {
        root: temp.path().to_path_buf(),
        config: temp.path().join("config.toml"),
        db: temp.path().join("db"),
        db_file: temp.path().join("db/dadgar.db"),
    };
    fs::create_dir_all(&paths.db)?;
    Database::init(&paths)?;
    Ok((temp, paths))
}

fn open(paths: &DadgarPaths) -> Assistant {
    Assistant::open(paths, &Config::default()).expect("open assistant")
}

fn lawyer(name: &str, website: &str) -> Lawyer {
    Lawyer {
        name: name.to_string(),
        website: website.to_string(),
        ..Lawyer::default()
    }
}

#[test]
fn saved_shortlist_persists_and_dedups_across_sessions() -> Result<()> {
    let (_temp, paths) = setup()?;

    {
        let mut assistant = open(&paths);
        assert!(assistant.save_lawyer(lawyer("Jane", "https://a.example")));
        // Same identity saved twice does not duplicate.
        assert!(!assistant.save_lawyer(lawyer("Jane", "https://a.example")));
        assert!(assistant.save_lawyer(lawyer("Ali", "https://b.example")));
        assert!(assistant.set_lawyer_note(0, "spoke on the phone".to_string()));
    }

    let assistant = open(&paths);
    let saved = assistant.saved_lawyers();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].notes.as_deref(), Some("spoke on the phone"));
    Ok(())
}

#[test]
fn removal_and_clear_persist() -> Result<()> {
    let (_temp, paths) = setup()?;

    {
        let mut assistant = open(&paths);
        assistant.save_lawyer(lawyer("Jane", "https://a.example"));
        assistant.save_lawyer(lawyer("Ali", "https://b.example"));
        let jane = lawyer("Jane", "https://a.example");
        assistant.remove_lawyer(&jane);
    }
    {
        let assistant = open(&paths);
        assert_eq!(assistant.saved_lawyers().len(), 1);
        assert_eq!(assistant.saved_lawyers()[0].name, "Ali");
    }
    {
        let mut assistant = open(&paths);
        assistant.clear_saved_lawyers();
    }
    let assistant = open(&paths);
    assert!(assistant.saved_lawyers().is_empty());
    Ok(())
}

#[test]
fn autosaved_inputs_reload_on_next_session() -> Result<()> {
    let (_temp, paths) = setup()?;

    {
        let mut assistant = open(&paths);
        assistant.state.drafter.topic = "unpaid invoice".to_string();
        assistant.state.drafter.doc_type = DocType::LegalLetter;
        assistant.state.news.query = "tax reform".to_string();
        assistant.note_input_change();
        assistant.flush_autosave();
    }

    let assistant = open(&paths);
    assert_eq!(assistant.state.drafter.topic, "unpaid invoice");
    assert_eq!(assistant.state.drafter.doc_type, DocType::LegalLetter);
    assert_eq!(assistant.state.news.query, "tax reform");
    Ok(())
}

#[test]
fn directory_reads_through_filters() -> Result<()> {
    let (_temp, paths) = setup()?;

    {
        let db = Database::open(&paths)?;
        let mut tehran = lawyer("Jane", "https://a.example");
        tehran.city = "Tehran".to_string();
        tehran.years_of_experience = 12;
        let mut shiraz = lawyer("Ali", "https://b.example");
        shiraz.city = "Shiraz".to_string();
        db.add_lawyers(&[tehran, shiraz])?;
    }

    let assistant = open(&paths);
    let all = assistant.directory(&DirectoryFilter::default(), LawyerSort::City)?;
    assert_eq!(all.len(), 2);

    let filter = DirectoryFilter {
        min_experience: Some(10),
        ..DirectoryFilter::default()
    };
    let experienced = assistant.directory(&filter, LawyerSort::Relevance)?;
    assert_eq!(experienced.len(), 1);
    assert_eq!(experienced[0].name, "Jane");

    assistant.clear_directory()?;
    assert!(assistant
        .directory(&DirectoryFilter::default(), LawyerSort::Relevance)?
        .is_empty());
    Ok(())
}

#[test]
fn checkpoint_round_trip_through_the_session() -> Result<()> {
    let (_temp, paths) = setup()?;

    let checkpoint_id;
    {
        let mut assistant = open(&paths);
        assistant.state.drafter.topic = "original topic".to_string();
        assistant.state.guide.prompt = "sue a client".to_string();
        checkpoint_id = assistant
            .create_checkpoint("before experiments")
            .expect("checkpoint created");

        // Mutate everything afterwards.
        assistant.state.drafter.topic = "changed".to_string();
        assistant.state.guide.prompt = "changed".to_string();

        assert!(assistant.restore_checkpoint(&checkpoint_id));
        assert_eq!(assistant.state.drafter.topic, "original topic");

        // Restore is idempotent.
        assert!(assistant.restore_checkpoint(&checkpoint_id));
        assert_eq!(assistant.state.guide.prompt, "sue a client");
    }

    // The checkpoint list survives a process restart.
    let mut assistant = open(&paths);
    assert_eq!(assistant.checkpoints().list().len(), 1);
    assert!(assistant.restore_checkpoint(&checkpoint_id));
    assert_eq!(assistant.state.drafter.topic, "original topic");

    // Restoring an unknown id is a no-op.
    assistant.state.drafter.topic = "kept".to_string();
    assert!(!assistant.restore_checkpoint("ckpt-unknown"));
    assert_eq!(assistant.state.drafter.topic, "kept");

    assert!(assistant.delete_checkpoint(&checkpoint_id));
    assert!(assistant.checkpoints().list().is_empty());
    Ok(())
}

#[test]
fn empty_checkpoint_name_aborts() -> Result<()> {
    let (_temp, paths) = setup()?;
    let mut assistant = open(&paths);
    assert!(assistant.create_checkpoint("  ").is_none());
    assert!(assistant.checkpoints().list().is_empty());
    Ok(())
}
