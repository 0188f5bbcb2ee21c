//! Current-result state of the display layer.
//!
//! At most one submission is in flight. A successful submission replaces the
//! whole view at once; a failed one leaves the previous view untouched.

use annotate::{
    distinct_texts, highlight, AnalysisResult, AnnotatedDocument, Category, CategoryScore,
    ConfidenceBand, EntitySentiment, HighlightedSegment, SelectionState, Sentiment,
    SentimentTone, SpanReport,
};
use anyhow::Result;
use batch::BatchResult;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// One analyzed text together with its selection.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub text: String,
    pub document: AnnotatedDocument,
    pub entity_texts: Vec<String>,
    pub sentiment: Option<Sentiment>,
    pub entity_sentiments: Vec<EntitySentiment>,
    pub category: Option<Category>,
    pub selection: SelectionState,
}

impl DocumentView {
    pub fn new(text: String, analysis: &AnalysisResult) -> Self {
        let document = AnnotatedDocument::from_analysis(&text, analysis);
        let entity_texts = distinct_texts(&analysis.entities)
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            text,
            document,
            entity_texts,
            sentiment: analysis.sentiment.clone(),
            entity_sentiments: analysis.entity_sentiments.clone(),
            category: analysis.category.clone(),
            selection: SelectionState::new(),
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            segments: highlight(&self.document.segments, self.selection.selected()),
            report: self.document.report,
            counts: self.document.counts.clone(),
            entity_texts: self.entity_texts.clone(),
            selected: self.selection.selected().map(str::to_string),
            sentiment: self.sentiment.clone(),
            tone: self.sentiment.as_ref().map(Sentiment::tone),
            sentiment_emoji: self.sentiment.as_ref().map(Sentiment::display_emoji),
            entity_sentiments: self.entity_sentiments.clone(),
            category: self.category.clone(),
            confidence_percent: self.category.as_ref().map(Category::confidence_percent),
            confidence_band: self.category.as_ref().map(Category::confidence_band),
            alternative_categories: self
                .category
                .as_ref()
                .map(|category| category.alternatives().to_vec())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    pub segments: Vec<HighlightedSegment>,
    pub report: SpanReport,
    pub counts: BTreeMap<String, usize>,
    pub entity_texts: Vec<String>,
    pub selected: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub tone: Option<SentimentTone>,
    pub sentiment_emoji: Option<String>,
    pub entity_sentiments: Vec<EntitySentiment>,
    pub category: Option<Category>,
    pub confidence_percent: Option<u32>,
    pub confidence_band: Option<ConfidenceBand>,
    pub alternative_categories: Vec<CategoryScore>,
}

#[derive(Debug, Clone, Default)]
pub enum CurrentView {
    #[default]
    Empty,
    Document(Box<DocumentView>),
    Batch(BatchResult),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ViewSnapshot {
    Empty,
    Document(DocumentSnapshot),
    Batch(BatchResult),
}

#[derive(Debug, Default)]
pub struct DisplaySession {
    view: CurrentView,
    pending: Option<Uuid>,
}

impl DisplaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &CurrentView {
        &self.view
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a submission. Rejected while another one is in flight.
    pub fn begin(&mut self) -> Result<Uuid> {
        if let Some(pending) = self.pending {
            anyhow::bail!("Submission {} is still in flight", pending);
        }
        let ticket = Uuid::new_v4();
        self.pending = Some(ticket);
        debug!(%ticket, "submission started");
        Ok(ticket)
    }

    pub fn complete_document(&mut self, ticket: Uuid, view: DocumentView) -> Result<()> {
        self.finish(ticket)?;
        info!(%ticket, segments = view.document.segments.len(), "document view replaced");
        self.view = CurrentView::Document(Box::new(view));
        Ok(())
    }

    pub fn complete_batch(&mut self, ticket: Uuid, batch: BatchResult) -> Result<()> {
        self.finish(ticket)?;
        info!(%ticket, total = batch.total, failed = batch.failed, "batch view replaced");
        self.view = CurrentView::Batch(batch);
        Ok(())
    }

    /// Abandon a submission; the previous view stays as it was.
    pub fn fail(&mut self, ticket: Uuid) -> Result<()> {
        self.finish(ticket)?;
        info!(%ticket, "submission failed, keeping previous view");
        Ok(())
    }

    fn finish(&mut self, ticket: Uuid) -> Result<()> {
        match self.pending {
            Some(pending) if pending == ticket => {
                self.pending = None;
                Ok(())
            }
            Some(pending) => anyhow::bail!("Ticket {} does not match in-flight submission {}", ticket, pending),
            None => anyhow::bail!("No submission in flight for ticket {}", ticket),
        }
    }

    /// Toggle the selected entity text of the current document, if any.
    pub fn toggle_selection(&mut self, candidate: &str) -> Option<DocumentSnapshot> {
        match &mut self.view {
            CurrentView::Document(view) => {
                view.selection.toggle(candidate);
                Some(view.snapshot())
            }
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        match &self.view {
            CurrentView::Empty => ViewSnapshot::Empty,
            CurrentView::Document(view) => ViewSnapshot::Document(view.snapshot()),
            CurrentView::Batch(batch) => ViewSnapshot::Batch(batch.clone()),
        }
    }
}
