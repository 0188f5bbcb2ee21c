//! Reduction of per-file outcomes into a batch summary.

use crate::outcome::{RawBatch, RawFailure, RawFileOutcome, RawSuccess};
use crate::preview::{rebudget_preview, truncate_preview, Preview};
use annotate::{
    label_counts, Category, ConfidenceBand, DocumentKind, EntityMention, Sentiment, SentimentTone,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Preview budget in grapheme clusters
    pub preview_chars: usize,
    pub sample_entities: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            preview_chars: 200,
            sample_entities: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DocumentRecord>,
}

impl BatchResult {
    pub fn is_consistent(&self) -> bool {
        self.total == self.successful + self.failed && self.total == self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|record| match &record.outcome {
            DocumentOutcome::Error { error } => Some((record.filename.as_str(), error.as_str())),
            DocumentOutcome::Success(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Error rows carry only a message; analysis fields exist only on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentOutcome {
    Success(DocumentSummary),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub text_length: usize,
    pub preview: Preview,
    pub total_entities: usize,
    pub counts: BTreeMap<String, usize>,
    pub sample: EntitySample,
    pub sentiment: Option<Sentiment>,
    pub sentiment_hint: String,
    pub sentiment_emoji: String,
    pub category: Option<Category>,
    pub category_hint: String,
    pub confidence_percent: Option<u32>,
    pub confidence_band: Option<ConfidenceBand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySample {
    pub entities: Vec<EntityMention>,
    pub remaining: usize,
}

/// Aggregate outcomes in submission order. Per-file failures stay local to
/// their record.
pub fn aggregate(outcomes: &[RawFileOutcome], options: &AggregateOptions) -> BatchResult {
    let results: Vec<DocumentRecord> = outcomes
        .iter()
        .map(|outcome| match outcome {
            RawFileOutcome::Success(success) => summarize_success(success, options),
            RawFileOutcome::Error(failure) => summarize_failure(failure),
        })
        .collect();

    let total = results.len();
    let successful = outcomes.iter().filter(|o| o.is_success()).count();

    debug!(total, successful, "aggregated batch outcomes");

    BatchResult {
        total,
        successful,
        failed: total - successful,
        results,
    }
}

/// Aggregate a full batch response, recomputing its totals.
pub fn aggregate_batch(batch: &RawBatch, options: &AggregateOptions) -> BatchResult {
    let result = aggregate(&batch.results, options);

    let reported = (batch.total_files, batch.successful, batch.failed);
    let mismatch = matches!(reported.0, Some(n) if n != result.total)
        || matches!(reported.1, Some(n) if n != result.successful)
        || matches!(reported.2, Some(n) if n != result.failed);
    if mismatch {
        warn!(
            reported_total = ?batch.total_files,
            reported_successful = ?batch.successful,
            reported_failed = ?batch.failed,
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "batch totals disagree with results; using recomputed totals"
        );
    }

    result
}

fn summarize_success(success: &RawSuccess, options: &AggregateOptions) -> DocumentRecord {
    let preview = match (&success.text, &success.text_preview) {
        (Some(text), _) => truncate_preview(text, options.preview_chars),
        (None, Some(preview)) => {
            rebudget_preview(preview, success.text_length, options.preview_chars)
        }
        (None, None) => truncate_preview("", options.preview_chars),
    };

    let text_length = success
        .text_length
        .or_else(|| success.text.as_ref().map(|text| text.chars().count()))
        .unwrap_or(0);

    let total_entities = success
        .total_entities
        .unwrap_or(success.entities.len())
        .max(success.entities.len());

    let counts = if success.counts.is_empty() {
        label_counts(success.entities.iter().map(|e| e.label.as_str()))
    } else {
        success.counts.clone()
    };

    let sample_entities: Vec<EntityMention> = success
        .entities
        .iter()
        .take(options.sample_entities)
        .cloned()
        .collect();
    let remaining = total_entities.saturating_sub(sample_entities.len());

    let sentiment_hint = success
        .sentiment
        .as_ref()
        .map(Sentiment::display_label)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    // Missing sentiment renders as neutral
    let sentiment_emoji = success
        .sentiment
        .as_ref()
        .map(Sentiment::display_emoji)
        .unwrap_or_else(|| SentimentTone::Neutral.emoji().to_string());

    DocumentRecord {
        filename: success.filename.clone(),
        kind: DocumentKind::from_filename(&success.filename),
        outcome: DocumentOutcome::Success(DocumentSummary {
            text_length,
            preview,
            total_entities,
            counts,
            sample: EntitySample {
                entities: sample_entities,
                remaining,
            },
            sentiment: success.sentiment.clone(),
            sentiment_hint,
            sentiment_emoji,
            category: success.category.clone(),
            category_hint: category_hint(success.category.as_ref()),
            confidence_percent: success.category.as_ref().map(Category::confidence_percent),
            confidence_band: success.category.as_ref().map(Category::confidence_band),
        }),
    }
}

fn summarize_failure(failure: &RawFailure) -> DocumentRecord {
    DocumentRecord {
        filename: failure.filename.clone(),
        kind: DocumentKind::from_filename(&failure.filename),
        outcome: DocumentOutcome::Error {
            error: failure.error.clone(),
        },
    }
}

/// Leading word of the primary category, or "N/A".
pub fn category_hint(category: Option<&Category>) -> String {
    category
        .and_then(Category::leading_token)
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(filename: &str, text: &str, labels: &[(&str, &str)]) -> RawFileOutcome {
        RawFileOutcome::Success(RawSuccess {
            filename: filename.to_string(),
            text: Some(text.to_string()),
            text_preview: None,
            text_length: None,
            entities: labels
                .iter()
                .map(|(text, label)| EntityMention {
                    text: text.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            total_entities: None,
            counts: BTreeMap::new(),
            sentiment: None,
            category: None,
        })
    }

    fn failure(filename: &str, error: &str) -> RawFileOutcome {
        RawFileOutcome::Error(RawFailure {
            filename: filename.to_string(),
            error: error.to_string(),
        })
    }

    #[test]
    fn test_totals_and_order() {
        let outcomes = vec![
            failure("z.pdf", "bad pdf"),
            success("a.txt", "Alice met Bob", &[("Alice", "PERSON"), ("Bob", "PERSON")]),
            failure("m.docx", "too short"),
            success("b.txt", "Paris", &[("Paris", "GPE")]),
        ];

        let result = aggregate(&outcomes, &AggregateOptions::default());
        assert_eq!(result.total, 4);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 2);
        assert!(result.is_consistent());

        let names: Vec<&str> = result.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["z.pdf", "a.txt", "m.docx", "b.txt"]);
        assert_eq!(result.results[0].kind, DocumentKind::Pdf);

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures, vec![("z.pdf", "bad pdf"), ("m.docx", "too short")]);
    }

    #[test]
    fn test_empty_batch() {
        let result = aggregate(&[], &AggregateOptions::default());
        assert_eq!((result.total, result.successful, result.failed), (0, 0, 0));
        assert!(result.results.is_empty());
    }

    #[test]
    fn test_success_derivations() {
        let text = "x".repeat(250);
        let labels: Vec<(&str, &str)> = vec![
            ("A", "PERSON"),
            ("B", "PERSON"),
            ("C", "ORG"),
            ("D", "GPE"),
            ("E", "GPE"),
            ("F", "GPE"),
            ("G", "DATE"),
        ];
        let outcomes = vec![success("long.txt", &text, &labels)];

        let result = aggregate(&outcomes, &AggregateOptions::default());
        let DocumentOutcome::Success(summary) = &result.results[0].outcome else {
            panic!("expected success");
        };

        assert_eq!(summary.text_length, 250);
        assert!(summary.preview.truncated);
        assert_eq!(summary.preview.text, format!("{}...", "x".repeat(200)));
        assert_eq!(summary.total_entities, 7);
        assert_eq!(summary.sample.entities.len(), 5);
        assert_eq!(summary.sample.remaining, 2);
        assert_eq!(summary.counts.get("GPE"), Some(&3));
        assert_eq!(summary.sentiment_hint, NOT_AVAILABLE);
        assert_eq!(summary.sentiment_emoji, "😐");
        assert_eq!(summary.category_hint, NOT_AVAILABLE);
        assert_eq!(summary.confidence_percent, None);
        assert_eq!(summary.confidence_band, None);

        // Source list untouched
        let RawFileOutcome::Success(raw) = &outcomes[0] else {
            panic!("expected success");
        };
        assert_eq!(raw.entities.len(), 7);
    }

    #[test]
    fn test_backend_trimmed_entities_use_reported_total() {
        let outcome = RawFileOutcome::Success(RawSuccess {
            filename: "report.pdf".to_string(),
            text: None,
            text_preview: Some(format!("{}...", "y".repeat(200))),
            text_length: Some(5000),
            entities: (0..10)
                .map(|i| EntityMention {
                    text: format!("E{}", i),
                    label: "ORG".to_string(),
                })
                .collect(),
            total_entities: Some(42),
            counts: BTreeMap::from([("ORG".to_string(), 42)]),
            sentiment: Some(Sentiment {
                polarity: 0.3,
                label: "Positive".to_string(),
                ..Default::default()
            }),
            category: Some(Category {
                primary_category: "Business & Finance".to_string(),
                confidence: 0.4,
                ..Default::default()
            }),
        });

        let options = AggregateOptions {
            preview_chars: 50,
            sample_entities: 5,
        };
        let result = aggregate(&[outcome], &options);
        let DocumentOutcome::Success(summary) = &result.results[0].outcome else {
            panic!("expected success");
        };

        assert_eq!(summary.text_length, 5000);
        assert_eq!(summary.preview.text, format!("{}...", "y".repeat(50)));
        assert_eq!(summary.total_entities, 42);
        assert_eq!(summary.sample.remaining, 37);
        assert_eq!(summary.counts.get("ORG"), Some(&42));
        assert_eq!(summary.sentiment_hint, "Positive");
        assert_eq!(summary.sentiment_emoji, "😊");
        assert_eq!(summary.category_hint, "Business");
        assert_eq!(summary.confidence_percent, Some(40));
        assert_eq!(summary.confidence_band, Some(ConfidenceBand::Low));
    }

    #[test]
    fn test_preview_ending_in_ellipsis_is_not_cut() {
        let outcome = RawFileOutcome::Success(RawSuccess {
            filename: "note.txt".to_string(),
            text: None,
            text_preview: Some("Wait...".to_string()),
            text_length: Some(7),
            entities: Vec::new(),
            total_entities: None,
            counts: BTreeMap::new(),
            sentiment: None,
            category: None,
        });

        let result = aggregate(&[outcome], &AggregateOptions::default());
        let DocumentOutcome::Success(summary) = &result.results[0].outcome else {
            panic!("expected success");
        };
        assert_eq!(summary.preview.text, "Wait...");
        assert!(!summary.preview.truncated);
    }

    #[test]
    fn test_blank_category_falls_back() {
        let category = Category {
            primary_category: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(category_hint(Some(&category)), NOT_AVAILABLE);
    }

    #[test]
    fn test_batch_totals_recomputed() {
        let batch = RawBatch {
            total_files: Some(3),
            successful: Some(3),
            failed: Some(0),
            results: vec![success("a.txt", "text", &[]), failure("b.txt", "boom")],
        };

        let result = aggregate_batch(&batch, &AggregateOptions::default());
        assert_eq!((result.total, result.successful, result.failed), (2, 1, 1));
    }

    #[test]
    fn test_record_serializes_status_tag() {
        let result = aggregate(&[failure("b.txt", "boom")], &AggregateOptions::default());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["results"][0]["status"], "error");
        assert_eq!(json["results"][0]["error"], "boom");
        assert_eq!(json["results"][0]["kind"], "text");
        assert!(json["results"][0].get("preview").is_none());
    }
}
