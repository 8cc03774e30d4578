//! Feature orchestration over the shared application state
//!
//! [`Assistant`] is the composition root: it owns the database, the model
//! client, the per-feature state slices, checkpoints, and the autosaver,
//! and exposes one method per tool. Every model-backed method stamps its
//! request through the feature's [`RequestTracker`] and drops responses
//! that come back stale, so overlapping calls can never clobber newer
//! results. A quota failure anywhere flips a session-wide flag that gates
//! all further submissions.

use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use crate::autosave::Autosaver;
use crate::checkpoint::CheckpointManager;
use crate::config::{Config, DadgarPaths};
use crate::db::{Database, KEY_AUTOSAVE, KEY_LAST_PLAN, KEY_SAVED_LAWYERS};
use crate::llm::{ApiError, GeminiClient, SearchResult};
use crate::markdown::{parse_lawyer_table, parse_notary_table};
use crate::models::{
    AutoSaveData, DocType, DraftPreparation, IntentRoute, Lawyer, Notary, SaveStatus, Source,
    StrategyTask,
};
use crate::prompts;
use crate::state::{AppState, RequestTrackers};

/// What a directory search produced.
pub enum SearchOutcome<T> {
    /// Structured records were parsed (and stored, for lawyers).
    Parsed(Vec<T>),
    /// Nothing parsed; show the model's raw text instead.
    Unparsed(String),
    /// A newer search superseded this one while it was in flight.
    Stale,
}

/// Filters applied to the discovered-lawyer directory.
#[derive(Debug, Default, Clone)]
pub struct DirectoryFilter {
    pub city: Option<String>,
    pub specialty: Option<String>,
    pub min_experience: Option<u32>,
}

/// Sort orders for the directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LawyerSort {
    Relevance,
    ExperienceDesc,
    City,
    CitySpecialty,
}

impl std::str::FromStr for LawyerSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(LawyerSort::Relevance),
            "experience" => Ok(LawyerSort::ExperienceDesc),
            "city" => Ok(LawyerSort::City),
            "city_specialty" => Ok(LawyerSort::CitySpecialty),
            _ => Err(format!(
                "Invalid sort: {}. Use: relevance, experience, city, city_specialty",
                s
            )),
        }
    }
}

/// Apply directory filters and a sort order. Pure; feeds the listing.
pub fn filter_and_sort(
    lawyers: &[Lawyer],
    filter: &DirectoryFilter,
    sort: LawyerSort,
) -> Vec<Lawyer> {
    let city = filter.city.as_deref().unwrap_or("").to_lowercase();
    let specialty = filter.specialty.as_deref().unwrap_or("").to_lowercase();

    let mut out: Vec<Lawyer> = lawyers
        .iter()
        .filter(|l| city.is_empty() || l.city.to_lowercase().contains(&city))
        .filter(|l| specialty.is_empty() || l.specialty.to_lowercase().contains(&specialty))
        .filter(|l| {
            filter
                .min_experience
                .map_or(true, |min| l.years_of_experience >= min)
        })
        .cloned()
        .collect();

    match sort {
        LawyerSort::Relevance => out.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score)),
        LawyerSort::ExperienceDesc => {
            out.sort_by(|a, b| b.years_of_experience.cmp(&a.years_of_experience))
        }
        LawyerSort::City => out.sort_by(|a, b| a.city.cmp(&b.city)),
        LawyerSort::CitySpecialty => {
            out.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.specialty.cmp(&b.specialty)))
        }
    }
    out
}

/// Keep only routes whose module key is one of the known six.
pub fn valid_routes(items: Vec<Value>) -> Vec<IntentRoute> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<IntentRoute>(item).ok())
        .collect()
}

pub struct Assistant {
    db: Database,
    client: GeminiClient,
    pub state: AppState,
    checkpoints: CheckpointManager,
    autosaver: Autosaver,
    trackers: RequestTrackers,
    quota_exhausted: bool,
}

impl Assistant {
    /// Open the session: best-effort load of every persisted piece.
    /// Missing or corrupt entries fall back to defaults and never block
    /// startup.
    pub fn open(paths: &DadgarPaths, config: &Config) -> Result<Self> {
        let db = Database::open(paths)?;

        let mut state = AppState::default();
        state.lawyers.saved = db.setting_or_default(KEY_SAVED_LAWYERS);
        // The last plan outlives the process so a task can be turned into
        // a draft in a later invocation.
        state.strategy = db.setting_or_default(KEY_LAST_PLAN);
        let snapshot: AutoSaveData = db.setting_or_default(KEY_AUTOSAVE);
        state.apply_autosave(&snapshot);

        let checkpoints = CheckpointManager::load(&db);

        let client = GeminiClient::new(
            config.llm.endpoint_or_default(),
            config.llm.model_or_default(),
        );
        let autosaver = Autosaver::new(
            std::time::Duration::from_millis(config.autosave.debounce_ms),
            std::time::Duration::from_millis(config.autosave.linger_ms),
        );

        Ok(Self {
            db,
            client,
            state,
            checkpoints,
            autosaver,
            trackers: RequestTrackers::default(),
            quota_exhausted: false,
        })
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.quota_exhausted
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosaver.status()
    }

    /// Record a tracked-input change, restarting the autosave window.
    pub fn note_input_change(&mut self) {
        self.autosaver
            .record(self.state.autosave_snapshot(), Instant::now());
    }

    /// Drive the autosave clock; called from interactive loops.
    pub fn tick_autosave(&mut self) {
        self.autosaver.tick(&self.db, Instant::now());
    }

    /// Write any pending snapshot immediately (command exit path).
    pub fn flush_autosave(&mut self) {
        self.autosaver.flush(&self.db, Instant::now());
    }

    /// Convert an API failure into the single user-facing message,
    /// flipping the session-wide quota gate when applicable.
    fn api_error(&mut self, err: ApiError) -> anyhow::Error {
        if err.is_quota() {
            self.quota_exhausted = true;
        }
        anyhow!(err.to_string())
    }

    fn ensure_available(&self) -> Result<()> {
        if self.quota_exhausted {
            bail!("API quota exhausted; further requests are disabled for this session.");
        }
        Ok(())
    }

    // ── Drafter ───────────────────────────────────────────────────────

    /// Stream a document draft, feeding each text delta to `sink` as it
    /// arrives. The finished document lands in the drafter slice unless a
    /// newer draft superseded this one.
    pub async fn draft(
        &mut self,
        topic: &str,
        description: &str,
        doc_type: DocType,
        mut sink: impl FnMut(&str),
    ) -> Result<()> {
        self.ensure_available()?;

        self.state.drafter.topic = topic.to_string();
        self.state.drafter.description = description.to_string();
        self.state.drafter.doc_type = doc_type;
        self.state.drafter.document.clear();
        self.note_input_change();

        let prompt = prompts::render(
            prompts::draft_template(doc_type),
            &[("topic", topic), ("description", description)],
        );

        let ticket = self.trackers.drafter.begin();
        let opened = self.client.stream(&prompt).await;
        let mut stream = match opened {
            Ok(s) => s,
            Err(e) => return Err(self.api_error(e)),
        };

        let mut document = String::new();
        loop {
            match stream.next_chunk().await {
                Ok(Some(chunk)) => {
                    sink(&chunk);
                    document.push_str(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Err(self.api_error(e)),
            }
        }

        if self.trackers.drafter.is_current(ticket) {
            self.state.drafter.document = document;
        }
        Ok(())
    }

    // ── Lawyer finder ─────────────────────────────────────────────────

    /// Search for lawyers, parse the table, and fold new records into the
    /// directory store. Unparseable output falls back to the raw text.
    pub async fn find_lawyers(
        &mut self,
        keywords: &str,
        max_results: u32,
    ) -> Result<SearchOutcome<Lawyer>> {
        self.ensure_available()?;
        if keywords.trim().is_empty() {
            bail!("Please describe your legal issue to start the search.");
        }

        self.state.lawyers.keywords = keywords.to_string();
        self.note_input_change();

        let prompt = prompts::render(
            prompts::LAWYER_SEARCH,
            &[
                ("queries", keywords),
                ("maxResults", &max_results.to_string()),
            ],
        );

        let ticket = self.trackers.lawyers.begin();
        let searched = self.client.search(&prompt).await;
        let result = match searched {
            Ok(r) => r,
            Err(e) => return Err(self.api_error(e)),
        };
        if !self.trackers.lawyers.is_current(ticket) {
            return Ok(SearchOutcome::Stale);
        }

        let parsed = parse_lawyer_table(&result.text);
        if parsed.is_empty() {
            return Ok(SearchOutcome::Unparsed(result.text));
        }

        // Store discoveries; a failed write only costs persistence.
        if let Err(e) = self.db.add_lawyers(&parsed) {
            tracing::warn!("failed to store discovered lawyers: {}", e);
        }
        Ok(SearchOutcome::Parsed(parsed))
    }

    /// The discovered directory, filtered and sorted.
    pub fn directory(&self, filter: &DirectoryFilter, sort: LawyerSort) -> Result<Vec<Lawyer>> {
        Ok(filter_and_sort(&self.db.all_lawyers()?, filter, sort))
    }

    /// Wipe the discovered directory. Destructive: failures surface.
    pub fn clear_directory(&self) -> Result<()> {
        self.db.clear_lawyers()
    }

    pub fn saved_lawyers(&self) -> &[Lawyer] {
        &self.state.lawyers.saved
    }

    /// Shortlist a lawyer; duplicates by (name, website) are ignored.
    pub fn save_lawyer(&mut self, lawyer: Lawyer) -> bool {
        let added = self.state.lawyers.save(lawyer);
        if added {
            self.persist_saved();
        }
        added
    }

    pub fn remove_lawyer(&mut self, lawyer: &Lawyer) {
        self.state.lawyers.remove(lawyer);
        self.persist_saved();
    }

    pub fn set_lawyer_note(&mut self, index: usize, note: String) -> bool {
        let changed = self.state.lawyers.set_note(index, note);
        if changed {
            self.persist_saved();
        }
        changed
    }

    pub fn clear_saved_lawyers(&mut self) {
        self.state.lawyers.saved.clear();
        self.persist_saved();
    }

    fn persist_saved(&self) {
        if let Err(e) = self.db.put_setting(KEY_SAVED_LAWYERS, &self.state.lawyers.saved) {
            tracing::warn!("failed to persist saved lawyers: {}", e);
        }
    }

    // ── Notary finder ─────────────────────────────────────────────────

    pub async fn find_notaries(&mut self, keywords: &str) -> Result<SearchOutcome<Notary>> {
        self.ensure_available()?;
        if keywords.trim().is_empty() {
            bail!("Please describe your need to start the search.");
        }

        self.state.notaries.keywords = keywords.to_string();
        self.note_input_change();

        let prompt = prompts::render(prompts::NOTARY_SEARCH, &[("queries", keywords)]);

        let ticket = self.trackers.notaries.begin();
        let searched = self.client.search(&prompt).await;
        let result = match searched {
            Ok(r) => r,
            Err(e) => return Err(self.api_error(e)),
        };
        if !self.trackers.notaries.is_current(ticket) {
            return Ok(SearchOutcome::Stale);
        }

        let parsed = parse_notary_table(&result.text);
        if parsed.is_empty() {
            return Ok(SearchOutcome::Unparsed(result.text));
        }
        self.state.notaries.found = parsed.clone();
        Ok(SearchOutcome::Parsed(parsed))
    }

    // ── News summarizer ───────────────────────────────────────────────

    pub async fn summarize_news(&mut self, query: &str) -> Result<(String, Vec<Source>)> {
        self.ensure_available()?;
        if query.trim().is_empty() {
            bail!("Please enter a topic to summarize.");
        }

        self.state.news.query = query.to_string();
        self.note_input_change();

        let prompt = prompts::render(prompts::NEWS_SUMMARY, &[("query", query)]);

        let ticket = self.trackers.news.begin();
        let searched = self.client.search(&prompt).await;
        let SearchResult { text, sources } = match searched {
            Ok(r) => r,
            Err(e) => return Err(self.api_error(e)),
        };
        if self.trackers.news.is_current(ticket) {
            self.state.news.summary = text.clone();
            self.state.news.sources = sources.clone();
        }
        Ok((text, sources))
    }

    // ── Web analyzer ──────────────────────────────────────────────────

    pub async fn analyze_page(
        &mut self,
        url: &str,
        query: &str,
    ) -> Result<(String, Vec<Source>)> {
        self.ensure_available()?;
        if url.trim().is_empty() || query.trim().is_empty() {
            bail!("Please provide both a URL and a question.");
        }

        self.state.analyzer.url = url.to_string();
        self.state.analyzer.query = query.to_string();
        self.note_input_change();

        let prompt = prompts::render(prompts::WEB_ANALYZER, &[("url", url), ("query", query)]);

        let ticket = self.trackers.analyzer.begin();
        let searched = self.client.search(&prompt).await;
        let SearchResult { text, sources } = match searched {
            Ok(r) => r,
            Err(e) => return Err(self.api_error(e)),
        };
        if self.trackers.analyzer.is_current(ticket) {
            self.state.analyzer.result = text.clone();
            self.state.analyzer.sources = sources.clone();
        }
        Ok((text, sources))
    }

    // ── Case strategist ───────────────────────────────────────────────

    pub async fn plan_strategy(&mut self, goal: &str) -> Result<Vec<StrategyTask>> {
        self.ensure_available()?;
        if goal.trim().is_empty() {
            bail!("Please describe your goal to generate a strategy.");
        }

        self.state.strategy.goal = goal.to_string();
        self.note_input_change();

        let prompt = prompts::render(prompts::STRATEGY, &[("goal", goal)]);
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "taskName": { "type": "STRING", "description": "A concise name for the task." },
                    "description": { "type": "STRING", "description": "A brief explanation of what the task involves." },
                    "effortPercentage": { "type": "NUMBER", "description": "An estimated percentage of the total project effort this task will take." },
                    "deliverableType": { "type": "STRING", "description": "A short, clear name for the output of this task." },
                    "suggestedPrompt": { "type": "STRING", "description": "A detailed, high-quality prompt for an AI to generate the deliverable for this task." }
                },
                "required": ["taskName", "description", "effortPercentage", "deliverableType", "suggestedPrompt"]
            }
        });

        let ticket = self.trackers.strategy.begin();
        let generated = self.client.generate_json(&prompt, schema).await;
        let tasks: Vec<StrategyTask> = match generated {
            Ok(t) => t,
            Err(e) => return Err(self.api_error(e)),
        };
        if self.trackers.strategy.is_current(ticket) {
            self.state.strategy.tasks = tasks.clone();
            if let Err(e) = self.db.put_setting(KEY_LAST_PLAN, &self.state.strategy) {
                tracing::warn!("failed to persist plan: {}", e);
            }
        }
        Ok(tasks)
    }

    /// Turn one strategy task into drafter pre-fill. An unknown document
    /// type from the model falls back to the default type.
    pub async fn prepare_draft_from_task(&mut self, task_index: usize) -> Result<DraftPreparation> {
        self.ensure_available()?;
        let task = self
            .state
            .strategy
            .tasks
            .get(task_index)
            .ok_or_else(|| anyhow!("No strategy task at index {}", task_index))?
            .clone();

        let doc_type_options = DocType::ALL
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = prompts::render(
            prompts::PREPARE_DRAFT,
            &[
                ("taskName", task.task_name.as_str()),
                ("description", task.description.as_str()),
                ("suggestedPrompt", task.suggested_prompt.as_str()),
                ("docTypeOptions", doc_type_options.as_str()),
            ],
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "docType": { "type": "STRING", "description": "The most relevant document type from the provided list." },
                "topic": { "type": "STRING", "description": "A concise title for the document." },
                "description": { "type": "STRING", "description": "Detailed information for the document drafter." }
            },
            "required": ["docType", "topic", "description"]
        });

        let generated = self.client.generate_json(&prompt, schema).await;
        let preparation: DraftPreparation = match generated {
            Ok(p) => p,
            Err(e) => return Err(self.api_error(e)),
        };

        let doc_type = preparation.doc_type.parse().unwrap_or_else(|_| {
            tracing::warn!("model returned unknown doc type '{}'", preparation.doc_type);
            DocType::default()
        });
        self.state.drafter.doc_type = doc_type;
        self.state.drafter.topic = preparation.topic.clone();
        self.state.drafter.description = preparation.description.clone();
        self.note_input_change();

        Ok(preparation)
    }

    // ── Intent router ─────────────────────────────────────────────────

    /// Rank the feature modules for a free-form goal. Routes with unknown
    /// module keys are dropped; a payload that is not an array is an
    /// error.
    pub async fn route_intent(&mut self, goal: &str) -> Result<Vec<IntentRoute>> {
        self.ensure_available()?;
        if goal.trim().is_empty() {
            bail!("Please describe your goal to get suggestions.");
        }

        self.state.guide.prompt = goal.to_string();
        self.note_input_change();

        let prompt = prompts::render(prompts::INTENT_ROUTER, &[("goal", goal)]);
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "module": {
                        "type": "STRING",
                        "enum": ["legal_drafter", "lawyer_finder", "news_summarizer", "case_strategist", "notary_finder", "web_analyzer"],
                        "description": "The key of the suggested module."
                    },
                    "confidencePercentage": { "type": "NUMBER", "description": "A percentage (0-100) indicating the confidence in this suggestion." },
                    "reasoning": { "type": "STRING", "description": "A brief explanation for why this module is recommended." }
                },
                "required": ["module", "confidencePercentage", "reasoning"]
            }
        });

        let ticket = self.trackers.guide.begin();
        let generated = self.client.generate_json(&prompt, schema).await;
        let raw: Vec<Value> = match generated {
            Ok(v) => v,
            Err(e) => return Err(self.api_error(e)),
        };
        let routes = valid_routes(raw);
        if self.trackers.guide.is_current(ticket) {
            self.state.guide.routes = routes.clone();
        }
        Ok(routes)
    }

    /// Typing aid; best-effort, empty on any failure.
    pub async fn suggestions(&self, query: &str, context_prompt: &str) -> Vec<String> {
        if self.quota_exhausted {
            return Vec::new();
        }
        self.client.suggestions(query, context_prompt).await
    }

    // ── Checkpoints ───────────────────────────────────────────────────

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Snapshot the current state; an empty name aborts.
    pub fn create_checkpoint(&mut self, name: &str) -> Option<String> {
        let state = self.state.clone();
        self.checkpoints
            .create(&self.db, name, &state)
            .map(|c| c.id.clone())
    }

    /// Overwrite all tracked state from a checkpoint. No-op when the id
    /// is unknown.
    pub fn restore_checkpoint(&mut self, id: &str) -> bool {
        match self.checkpoints.restore(id) {
            Some(state) => {
                self.state = state;
                self.note_input_change();
                true
            }
            None => false,
        }
    }

    /// Remove a checkpoint. Confirmation happens at the CLI edge.
    pub fn delete_checkpoint(&mut self, id: &str) -> bool {
        self.checkpoints.delete(&self.db, id)
    }
}
