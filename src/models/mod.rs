//! Domain types for dadgar
//!
//! These are the records exchanged between the model client, the parsers,
//! and the persistence layer. Everything here is serde-serializable so it
//! can round-trip through checkpoints and the settings store.

use serde::{Deserialize, Serialize};

/// The six feature modules a user request can be routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKey {
    LegalDrafter,
    LawyerFinder,
    NotaryFinder,
    NewsSummarizer,
    CaseStrategist,
    WebAnalyzer,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 6] = [
        ModuleKey::LegalDrafter,
        ModuleKey::LawyerFinder,
        ModuleKey::NotaryFinder,
        ModuleKey::NewsSummarizer,
        ModuleKey::CaseStrategist,
        ModuleKey::WebAnalyzer,
    ];
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKey::LegalDrafter => write!(f, "legal_drafter"),
            ModuleKey::LawyerFinder => write!(f, "lawyer_finder"),
            ModuleKey::NotaryFinder => write!(f, "notary_finder"),
            ModuleKey::NewsSummarizer => write!(f, "news_summarizer"),
            ModuleKey::CaseStrategist => write!(f, "case_strategist"),
            ModuleKey::WebAnalyzer => write!(f, "web_analyzer"),
        }
    }
}

impl std::str::FromStr for ModuleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legal_drafter" => Ok(ModuleKey::LegalDrafter),
            "lawyer_finder" => Ok(ModuleKey::LawyerFinder),
            "notary_finder" => Ok(ModuleKey::NotaryFinder),
            "news_summarizer" => Ok(ModuleKey::NewsSummarizer),
            "case_strategist" => Ok(ModuleKey::CaseStrategist),
            "web_analyzer" => Ok(ModuleKey::WebAnalyzer),
            _ => Err(format!(
                "Invalid module: {}. Use: legal_drafter, lawyer_finder, notary_finder, news_summarizer, case_strategist, web_analyzer",
                s
            )),
        }
    }
}

/// Document types the drafter knows how to prepare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Petition,
    Complaint,
    Contract,
    LegalLetter,
    DefenseBrief,
    LegalResearch,
}

impl DocType {
    pub const ALL: [DocType; 6] = [
        DocType::Petition,
        DocType::Complaint,
        DocType::Contract,
        DocType::LegalLetter,
        DocType::DefenseBrief,
        DocType::LegalResearch,
    ];
}

impl Default for DocType {
    fn default() -> Self {
        DocType::Petition
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocType::Petition => write!(f, "petition"),
            DocType::Complaint => write!(f, "complaint"),
            DocType::Contract => write!(f, "contract"),
            DocType::LegalLetter => write!(f, "legal_letter"),
            DocType::DefenseBrief => write!(f, "defense_brief"),
            DocType::LegalResearch => write!(f, "legal_research"),
        }
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "petition" => Ok(DocType::Petition),
            "complaint" => Ok(DocType::Complaint),
            "contract" => Ok(DocType::Contract),
            "legal_letter" => Ok(DocType::LegalLetter),
            "defense_brief" => Ok(DocType::DefenseBrief),
            "legal_research" => Ok(DocType::LegalResearch),
            _ => Err(format!(
                "Invalid document type: {}. Use: petition, complaint, contract, legal_letter, defense_brief, legal_research",
                s
            )),
        }
    }
}

/// A lawyer profile parsed from a model search response.
///
/// Identity is the (name, website) pair; there is no synthetic id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lawyer {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_info: String,
    pub website: String,
    #[serde(default)]
    pub website_title: String,
    #[serde(default)]
    pub relevance_score: u32,
    #[serde(default)]
    pub years_of_experience: u32,
    /// User-added free text; the only field mutated after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Lawyer {
    /// Identity check used for save-list dedup and removal.
    pub fn same_identity(&self, other: &Lawyer) -> bool {
        self.name == other.name && self.website == other.website
    }
}

/// A notary public office parsed from a model search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Notary {
    pub office_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub website_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

/// A web citation returned alongside a search-grounded response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// One task in a generated strategic plan. Immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyTask {
    pub task_name: String,
    pub description: String,
    #[serde(default)]
    pub effort_percentage: f64,
    pub deliverable_type: String,
    pub suggested_prompt: String,
}

/// A ranked routing suggestion. Ephemeral, regenerated per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRoute {
    pub module: ModuleKey,
    #[serde(default)]
    pub confidence_percentage: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Drafter pre-fill derived from a strategy task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPreparation {
    pub doc_type: String,
    pub topic: String,
    pub description: String,
}

/// Autosave indicator state shown next to tracked inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "idle"),
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Saved => write!(f, "saved"),
        }
    }
}

/// The subset of form inputs captured by the debounced autosave.
///
/// Overwritten wholesale on every save cycle; every field defaults so an
/// older snapshot loads cleanly after the schema grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AutoSaveData {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub lawyer_finder_keywords: String,
    #[serde(default)]
    pub notary_finder_keywords: String,
    #[serde(default)]
    pub news_query: String,
    #[serde(default)]
    pub web_analyzer_url: String,
    #[serde(default)]
    pub web_analyzer_query: String,
    #[serde(default)]
    pub strategy_goal: String,
    #[serde(default)]
    pub guide_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_key_round_trips_through_str() {
        for key in ModuleKey::ALL {
            let parsed: ModuleKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn unknown_module_key_is_rejected() {
        assert!("document_scanner".parse::<ModuleKey>().is_err());
    }

    #[test]
    fn doc_type_round_trips_through_str() {
        for ty in DocType::ALL {
            let parsed: DocType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn autosave_data_tolerates_missing_fields() {
        // A snapshot written before new fields existed still loads.
        let old: AutoSaveData = serde_json::from_str(r#"{"topic":"tenancy"}"#).unwrap();
        assert_eq!(old.topic, "tenancy");
        assert_eq!(old.guide_prompt, "");
    }

    #[test]
    fn lawyer_identity_is_name_and_website() {
        let a = Lawyer {
            name: "Jane Doe".into(),
            website: "https://doe.example".into(),
            ..Lawyer::default()
        };
        let mut b = a.clone();
        b.specialty = "family law".into();
        assert!(a.same_identity(&b));
        b.website = "https://other.example".into();
        assert!(!a.same_identity(&b));
    }
}
