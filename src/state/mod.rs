//! Application state, split into one slice per feature
//!
//! Each tool owns an independent slice; the [`AppState`] composition root
//! combines them for snapshotting and restore. Every field carries a serde
//! default so a snapshot written by an older build restores cleanly with
//! sane fallbacks.

use serde::{Deserialize, Serialize};

use crate::models::{
    AutoSaveData, DocType, IntentRoute, Lawyer, Notary, Source, StrategyTask,
};

/// Drafting tool: form inputs plus the last generated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrafterState {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub doc_type: DocType,
    #[serde(default)]
    pub document: String,
}

/// Lawyer finder: search keywords and the user's saved shortlist.
/// The full discovered directory lives in the record store, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LawyerFinderState {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub saved: Vec<Lawyer>,
}

impl LawyerFinderState {
    /// Add to the shortlist unless the same (name, website) is present.
    pub fn save(&mut self, lawyer: Lawyer) -> bool {
        if self.saved.iter().any(|l| l.same_identity(&lawyer)) {
            return false;
        }
        self.saved.push(lawyer);
        true
    }

    pub fn remove(&mut self, lawyer: &Lawyer) {
        self.saved.retain(|l| !l.same_identity(lawyer));
    }

    pub fn set_note(&mut self, index: usize, note: String) -> bool {
        match self.saved.get_mut(index) {
            Some(l) => {
                l.notes = Some(note);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotaryFinderState {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub found: Vec<Notary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsState {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerState {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub tasks: Vec<StrategyTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideState {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub routes: Vec<IntentRoute>,
}

/// Composition root over all feature slices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub drafter: DrafterState,
    #[serde(default)]
    pub lawyers: LawyerFinderState,
    #[serde(default)]
    pub notaries: NotaryFinderState,
    #[serde(default)]
    pub news: NewsState,
    #[serde(default)]
    pub analyzer: AnalyzerState,
    #[serde(default)]
    pub strategy: StrategyState,
    #[serde(default)]
    pub guide: GuideState,
}

impl AppState {
    /// Collect the tracked form inputs for the autosave snapshot.
    pub fn autosave_snapshot(&self) -> AutoSaveData {
        AutoSaveData {
            topic: self.drafter.topic.clone(),
            description: self.drafter.description.clone(),
            doc_type: self.drafter.doc_type.to_string(),
            lawyer_finder_keywords: self.lawyers.keywords.clone(),
            notary_finder_keywords: self.notaries.keywords.clone(),
            news_query: self.news.query.clone(),
            web_analyzer_url: self.analyzer.url.clone(),
            web_analyzer_query: self.analyzer.query.clone(),
            strategy_goal: self.strategy.goal.clone(),
            guide_prompt: self.guide.prompt.clone(),
        }
    }

    /// Re-apply a previously autosaved snapshot to the form inputs.
    pub fn apply_autosave(&mut self, data: &AutoSaveData) {
        self.drafter.topic = data.topic.clone();
        self.drafter.description = data.description.clone();
        self.drafter.doc_type = data.doc_type.parse().unwrap_or_default();
        self.lawyers.keywords = data.lawyer_finder_keywords.clone();
        self.notaries.keywords = data.notary_finder_keywords.clone();
        self.news.query = data.news_query.clone();
        self.analyzer.url = data.web_analyzer_url.clone();
        self.analyzer.query = data.web_analyzer_query.clone();
        self.strategy.goal = data.strategy_goal.clone();
        self.guide.prompt = data.guide_prompt.clone();
    }
}

/// Ticket for one in-flight request against a feature slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(u64);

/// Monotonic request stamping for a single feature.
///
/// A new search bumps the generation; a response is only applied while its
/// ticket is still current, so a slower earlier request can never clobber
/// the result of a later one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: u64,
}

impl RequestTracker {
    /// Start a new request, invalidating all earlier tickets.
    pub fn begin(&mut self) -> RequestId {
        self.generation += 1;
        RequestId(self.generation)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        id.0 == self.generation
    }
}

/// One tracker per feature that issues model requests.
#[derive(Debug, Default)]
pub struct RequestTrackers {
    pub drafter: RequestTracker,
    pub lawyers: RequestTracker,
    pub notaries: RequestTracker,
    pub news: RequestTracker,
    pub analyzer: RequestTracker,
    pub strategy: RequestTracker,
    pub guide: RequestTracker,
}
