//! CLI commands for dadgar

use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::TimeZone;

use crate::config::{load_config_at, save_config, Config, DadgarPaths};
use crate::db::Database;
use crate::guide::GuideSession;
use crate::models::{DocType, Lawyer, Notary, Source};
use crate::prompts;
use crate::session::{Assistant, DirectoryFilter, LawyerSort, SearchOutcome};

/// Initialize dadgar for first-time setup
pub fn init() -> Result<()> {
    let paths = DadgarPaths::new()?;

    if paths.is_initialized() {
        println!("Dadgar is already initialized at {}", paths.root.display());
        return Ok(());
    }

    println!("Initializing dadgar at {}...", paths.root.display());

    paths.ensure_dirs()?;
    println!("  Created directory structure");

    let config = Config::default();
    save_config(&paths, &config)?;
    println!("  Created config.toml");

    Database::init(&paths)?;
    println!("  Created database");

    println!();
    println!("Dadgar initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  GEMINI_API_KEY=... dadgar serve     Start the model proxy");
    println!("  dadgar guide                        Describe a goal, get routed");
    println!("  dadgar draft <topic>                Draft a legal document");

    Ok(())
}

fn ensure_initialized(paths: &DadgarPaths) -> Result<()> {
    if !paths.is_initialized() {
        bail!("Dadgar is not initialized. Run: dadgar init");
    }
    Ok(())
}

fn open_assistant() -> Result<(DadgarPaths, Assistant)> {
    let paths = DadgarPaths::new()?;
    ensure_initialized(&paths)?;
    let config = load_config_at(&paths)?;
    let assistant = Assistant::open(&paths, &config)?;
    Ok((paths, assistant))
}

/// Ask the user to confirm a destructive action.
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Run the credential-injecting proxy server.
pub async fn serve() -> Result<()> {
    let paths = DadgarPaths::new()?;
    let config = load_config_at(&paths)?;
    crate::proxy::serve(&config.proxy).await
}

/// Stream a document draft to stdout. Missing inputs fall back to the
/// autosaved drafter fields, so `dadgar draft` alone resumes the last
/// prepared draft.
pub async fn draft(
    topic: Option<String>,
    description: Option<String>,
    doc_type: Option<String>,
) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let topic = topic.unwrap_or_else(|| assistant.state.drafter.topic.clone());
    let description = description.unwrap_or_else(|| assistant.state.drafter.description.clone());
    let doc_type: DocType = match doc_type {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => assistant.state.drafter.doc_type,
    };

    if topic.trim().is_empty() {
        bail!("No topic given and none autosaved. Run: dadgar draft <topic> -d <description>");
    }

    println!("Drafting {} on: {}", doc_type, topic);
    println!();

    let result = assistant
        .draft(&topic, &description, doc_type, |chunk| {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    assistant.flush_autosave();
    result
}

/// Search for lawyers and fold results into the local directory.
pub async fn lawyers_find(query: &str, max_results: u32) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let outcome = assistant.find_lawyers(query, max_results).await;
    assistant.flush_autosave();

    match outcome? {
        SearchOutcome::Parsed(lawyers) => {
            println!("Found {} lawyers (stored in the directory):", lawyers.len());
            println!();
            print_lawyers(&lawyers);
        }
        SearchOutcome::Unparsed(text) => {
            println!("Could not structure the results; raw response below.");
            println!();
            println!("{}", text);
        }
        SearchOutcome::Stale => {}
    }
    Ok(())
}

/// List the discovered directory with filters and sorting.
pub fn lawyers_directory(
    city: Option<String>,
    specialty: Option<String>,
    min_experience: Option<u32>,
    sort: &str,
) -> Result<()> {
    let (_paths, assistant) = open_assistant()?;

    let sort: LawyerSort = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let filter = DirectoryFilter {
        city,
        specialty,
        min_experience,
    };
    let lawyers = assistant.directory(&filter, sort)?;

    if lawyers.is_empty() {
        println!("No lawyers match. Run a search first: dadgar lawyers find <query>");
        return Ok(());
    }
    print_lawyers(&lawyers);
    Ok(())
}

/// Shortlist a lawyer from the directory listing by position.
pub fn lawyers_save(index: usize) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let lawyers = assistant.directory(&DirectoryFilter::default(), LawyerSort::Relevance)?;
    let lawyer = lawyers
        .get(index)
        .with_context(|| format!("No lawyer at position {}", index))?
        .clone();

    if assistant.save_lawyer(lawyer.clone()) {
        println!("Saved {}", lawyer.name);
    } else {
        println!("{} is already saved", lawyer.name);
    }
    Ok(())
}

pub fn lawyers_saved() -> Result<()> {
    let (_paths, assistant) = open_assistant()?;
    let saved = assistant.saved_lawyers();
    if saved.is_empty() {
        println!("No saved lawyers yet.");
        return Ok(());
    }
    for (i, lawyer) in saved.iter().enumerate() {
        println!("{:>3}. {} - {} ({})", i, lawyer.name, lawyer.specialty, lawyer.city);
        println!("     {}", lawyer.website);
        if let Some(notes) = &lawyer.notes {
            println!("     notes: {}", notes);
        }
    }
    Ok(())
}

pub fn lawyers_remove(index: usize) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    let lawyer = assistant
        .saved_lawyers()
        .get(index)
        .with_context(|| format!("No saved lawyer at position {}", index))?
        .clone();
    assistant.remove_lawyer(&lawyer);
    println!("Removed {}", lawyer.name);
    Ok(())
}

pub fn lawyers_note(index: usize, note: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    if assistant.set_lawyer_note(index, note.to_string()) {
        println!("Note updated.");
        Ok(())
    } else {
        bail!("No saved lawyer at position {}", index)
    }
}

pub fn lawyers_clear_saved() -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    if !confirm("Clear all saved lawyers?") {
        println!("Cancelled.");
        return Ok(());
    }
    assistant.clear_saved_lawyers();
    println!("Saved list cleared.");
    Ok(())
}

pub fn lawyers_clear_directory() -> Result<()> {
    let (_paths, assistant) = open_assistant()?;
    if !confirm("Clear the entire lawyer directory? This removes every discovered lawyer.") {
        println!("Cancelled.");
        return Ok(());
    }
    assistant
        .clear_directory()
        .context("Failed to clear the lawyer directory")?;
    println!("Directory cleared.");
    Ok(())
}

/// Search for notary offices.
pub async fn notaries(query: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let outcome = assistant.find_notaries(query).await;
    assistant.flush_autosave();

    match outcome? {
        SearchOutcome::Parsed(notaries) => {
            println!("Found {} notary offices:", notaries.len());
            println!();
            print_notaries(&notaries);
        }
        SearchOutcome::Unparsed(text) => {
            println!("Could not structure the results; raw response below.");
            println!();
            println!("{}", text);
        }
        SearchOutcome::Stale => {}
    }
    Ok(())
}

/// Summarize recent news on a topic.
pub async fn news(query: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let result = assistant.summarize_news(query).await;
    assistant.flush_autosave();

    let (summary, sources) = result?;
    println!("{}", summary);
    print_sources(&sources);
    Ok(())
}

/// Answer a question about one web page.
pub async fn analyze(url: &str, query: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let result = assistant.analyze_page(url, query).await;
    assistant.flush_autosave();

    let (answer, sources) = result?;
    println!("{}", answer);
    print_sources(&sources);
    Ok(())
}

/// Generate a strategic plan for a goal.
pub async fn plan_new(goal: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let result = assistant.plan_strategy(goal).await;
    assistant.flush_autosave();

    let tasks = result?;
    println!("Strategic plan ({} tasks):", tasks.len());
    println!();
    for (i, task) in tasks.iter().enumerate() {
        println!("{:>3}. {} ({:.0}% effort)", i, task.task_name, task.effort_percentage);
        println!("     {}", task.description);
        println!("     deliverable: {}", task.deliverable_type);
    }
    println!();
    println!("Use `dadgar plan execute <n>` to prepare a draft from a task.");
    Ok(())
}

/// Show the last generated plan.
pub fn plan_show() -> Result<()> {
    let (_paths, assistant) = open_assistant()?;
    let tasks = &assistant.state.strategy.tasks;
    if tasks.is_empty() {
        println!("No plan generated yet. Run: dadgar plan new <goal>");
        return Ok(());
    }
    for (i, task) in tasks.iter().enumerate() {
        println!("{:>3}. {} ({:.0}%)", i, task.task_name, task.effort_percentage);
    }
    Ok(())
}

/// Prepare the drafter from one plan task, then stream the draft.
pub async fn plan_execute(index: usize) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;

    let prepared = assistant.prepare_draft_from_task(index).await;
    let preparation = match prepared {
        Ok(p) => p,
        Err(e) => {
            assistant.flush_autosave();
            return Err(e);
        }
    };

    println!("Prepared drafter:");
    println!("  type:  {}", assistant.state.drafter.doc_type);
    println!("  topic: {}", preparation.topic);
    println!();

    let topic = assistant.state.drafter.topic.clone();
    let description = assistant.state.drafter.description.clone();
    let doc_type = assistant.state.drafter.doc_type;
    let result = assistant
        .draft(&topic, &description, doc_type, |chunk| {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    assistant.flush_autosave();
    result
}

/// Interactive guided session (intent router + checkpoints).
pub async fn guide() -> Result<()> {
    let (_paths, assistant) = open_assistant()?;
    GuideSession::new(assistant).run().await
}

/// Typing-aid suggestions for the finder inputs.
pub async fn suggest(kind: &str, query: &str) -> Result<()> {
    let (_paths, assistant) = open_assistant()?;

    let context = match kind {
        "lawyers" => prompts::SUGGEST_LAWYER_KEYWORDS,
        "notaries" => prompts::SUGGEST_NOTARY_SERVICES,
        _ => bail!("Invalid suggestion kind: {}. Use: lawyers, notaries", kind),
    };

    let suggestions = assistant.suggestions(query, context).await;
    if suggestions.is_empty() {
        println!("No suggestions found.");
    }
    for s in suggestions {
        println!("  - {}", s);
    }
    Ok(())
}

// Checkpoints

pub fn checkpoint_create(name: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    match assistant.create_checkpoint(name) {
        Some(id) => {
            println!("Created checkpoint {}", id);
            Ok(())
        }
        None => bail!("Checkpoint name must not be empty"),
    }
}

pub fn checkpoint_list() -> Result<()> {
    let (_paths, assistant) = open_assistant()?;
    let list = assistant.checkpoints().list();
    if list.is_empty() {
        println!("No checkpoints created yet.");
        return Ok(());
    }
    println!("{:<44} {:<25} NAME", "ID", "CREATED");
    for ckpt in list {
        let when = chrono::Utc
            .timestamp_millis_opt(ckpt.timestamp)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        println!("{:<44} {:<25} {}", ckpt.id, when, ckpt.name);
    }
    Ok(())
}

pub fn checkpoint_restore(id: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    if assistant.restore_checkpoint(id) {
        assistant.flush_autosave();
        println!("Restored checkpoint {}", id);
        Ok(())
    } else {
        bail!("No checkpoint with id {}", id)
    }
}

pub fn checkpoint_delete(id: &str) -> Result<()> {
    let (_paths, mut assistant) = open_assistant()?;
    if !confirm("Delete this checkpoint? This action cannot be undone.") {
        println!("Cancelled.");
        return Ok(());
    }
    if assistant.delete_checkpoint(id) {
        println!("Deleted checkpoint {}", id);
        Ok(())
    } else {
        bail!("No checkpoint with id {}", id)
    }
}

// Display helpers

fn print_lawyers(lawyers: &[Lawyer]) {
    for (i, lawyer) in lawyers.iter().enumerate() {
        println!(
            "{:>3}. {} - {} ({}, {} yrs, {}% match)",
            i, lawyer.name, lawyer.specialty, lawyer.city,
            lawyer.years_of_experience, lawyer.relevance_score
        );
        println!("     {} | {}", lawyer.contact_info, lawyer.address);
        println!("     {} ({})", lawyer.website, lawyer.website_title);
    }
}

fn print_notaries(notaries: &[Notary]) {
    for (i, notary) in notaries.iter().enumerate() {
        println!("{:>3}. {} ({})", i, notary.office_name, notary.city);
        println!("     {} | {}", notary.contact_info, notary.address);
        if !notary.website.is_empty() {
            println!("     {}", notary.website);
        }
        if let Some(services) = &notary.services {
            println!("     services: {}", services);
        }
    }
}

fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for source in sources {
        println!("  - {} ({})", source.title, source.uri);
    }
}
