use annotate::{Category, EntityMention, Sentiment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One file's result as returned by the batch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RawFileOutcome {
    Success(RawSuccess),
    Error(RawFailure),
}

impl RawFileOutcome {
    pub fn filename(&self) -> &str {
        match self {
            RawFileOutcome::Success(success) => &success.filename,
            RawFileOutcome::Error(failure) => &failure.filename,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RawFileOutcome::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSuccess {
    pub filename: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_preview: Option<String>,
    #[serde(default)]
    pub text_length: Option<usize>,
    #[serde(default)]
    pub entities: Vec<EntityMention>,
    #[serde(default)]
    pub total_entities: Option<usize>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFailure {
    pub filename: String,
    #[serde(default)]
    pub error: String,
}

/// Batch endpoint response. The upstream totals are advisory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBatch {
    #[serde(default)]
    pub total_files: Option<usize>,
    #[serde(default)]
    pub successful: Option<usize>,
    #[serde(default)]
    pub failed: Option<usize>,
    #[serde(default)]
    pub results: Vec<RawFileOutcome>,
}

impl RawBatch {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
