pub mod schema;
pub mod resolver;
pub mod selection;
pub mod stats;

pub use schema::{
    AnalysisResult, Category, CategoryScore, ConfidenceBand, DocumentKind, EntityAnnotation,
    EntityMention, EntitySentiment, Sentiment, SentimentTone,
};
pub use resolver::{resolve, resolve_with_report, CharSpan, Resolution, Segment, SpanReport};
pub use selection::{highlight, is_emphasized, toggle_selection, HighlightedSegment, SelectionState};
pub use stats::{annotation_counts, distinct_texts, label_counts};

/// Resolved rendering of a single analysis result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnnotatedDocument {
    pub segments: Vec<Segment>,
    pub report: SpanReport,
    pub counts: std::collections::BTreeMap<String, usize>,
}

impl AnnotatedDocument {
    /// Resolve `text` against the result's entities. Counts come from the
    /// payload when present, otherwise from the full entity list.
    pub fn from_analysis(text: &str, analysis: &AnalysisResult) -> Self {
        let Resolution { segments, report } = resolve_with_report(text, &analysis.entities);
        let counts = if analysis.counts.is_empty() {
            annotation_counts(&analysis.entities)
        } else {
            analysis.counts.clone()
        };

        Self {
            segments,
            report,
            counts,
        }
    }
}
