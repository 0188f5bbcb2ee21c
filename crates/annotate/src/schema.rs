use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A labeled character range returned by the analysis service.
///
/// `start`/`end` are character offsets (not bytes). They are signed so that
/// out-of-range spans still deserialize and can be cleaned up by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub text: String,
    pub label: String,
    pub start: i64,
    pub end: i64,
}

impl EntityAnnotation {
    pub fn new(text: impl Into<String>, label: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start,
            end,
        }
    }
}

/// An entity without offsets, as listed in batch responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    pub label: String,
}

impl From<&EntityAnnotation> for EntityMention {
    fn from(entity: &EntityAnnotation) -> Self {
        Self {
            text: entity.text.clone(),
            label: entity.label.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    pub polarity: f64,     // -1 .. 1
    pub subjectivity: f64, // 0 .. 1
    pub label: String,
    pub emoji: String,
    pub description: String,
}

impl Sentiment {
    /// Label to display, falling back to the tone implied by polarity.
    pub fn display_label(&self) -> String {
        if self.label.trim().is_empty() {
            SentimentTone::from_polarity(self.polarity).label().to_string()
        } else {
            self.label.clone()
        }
    }

    /// Emoji to display, falling back to the tone implied by polarity.
    pub fn display_emoji(&self) -> String {
        if self.emoji.trim().is_empty() {
            self.tone().emoji().to_string()
        } else {
            self.emoji.clone()
        }
    }

    pub fn tone(&self) -> SentimentTone {
        SentimentTone::from_polarity(self.polarity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTone {
    Positive,
    Negative,
    Neutral,
}

impl SentimentTone {
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.1 {
            SentimentTone::Positive
        } else if polarity < -0.1 {
            SentimentTone::Negative
        } else {
            SentimentTone::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SentimentTone::Positive => "Positive",
            SentimentTone::Negative => "Negative",
            SentimentTone::Neutral => "Neutral",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            SentimentTone::Positive => "😊",
            SentimentTone::Negative => "😞",
            SentimentTone::Neutral => "😐",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySentiment {
    pub entity: String,
    #[serde(default)]
    pub label: Option<String>,
    pub sentiment: f64,
    pub sentiment_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub primary_category: String,
    pub confidence: f64,
    pub top_categories: Vec<CategoryScore>,
    pub entity_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Category {
    /// Leading word of the primary category ("Business & Finance" -> "Business").
    pub fn leading_token(&self) -> Option<&str> {
        self.primary_category.split_whitespace().next()
    }

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }

    /// Ranked categories other than the primary one.
    pub fn alternatives(&self) -> &[CategoryScore] {
        self.top_categories.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceBand::High
        } else if confidence > 0.4 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Full per-document response of the analysis service.
///
/// Sentiment and category are optional sections; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityAnnotation>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entities: Option<usize>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub entity_sentiments: Vec<EntitySentiment>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl AnalysisResult {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn total_entities(&self) -> usize {
        self.total_entities.unwrap_or(self.entities.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            DocumentKind::Pdf
        } else if lower.ends_with(".docx") {
            DocumentKind::Docx
        } else {
            DocumentKind::Text
        }
    }
}
