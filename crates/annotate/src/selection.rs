use crate::resolver::Segment;
use serde::{Deserialize, Serialize};

/// Toggle the selected entity text: picking the current value clears it.
pub fn toggle_selection(current: Option<&str>, candidate: &str) -> Option<String> {
    if current == Some(candidate) {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// An entity segment is emphasized when its text equals the selected value.
pub fn is_emphasized(selected: Option<&str>, segment: &Segment) -> bool {
    match (selected, segment) {
        (Some(value), Segment::Entity { content, .. }) => content == value,
        _ => false,
    }
}

/// Selection for one display session. Reset whenever the analyzed text changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: Option<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn toggle(&mut self, candidate: &str) -> Option<&str> {
        self.selected = toggle_selection(self.selected(), candidate);
        self.selected()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedSegment {
    #[serde(flatten)]
    pub segment: Segment,
    pub emphasized: bool,
}

pub fn highlight(segments: &[Segment], selected: Option<&str>) -> Vec<HighlightedSegment> {
    segments
        .iter()
        .map(|segment| HighlightedSegment {
            emphasized: is_emphasized(selected, segment),
            segment: segment.clone(),
        })
        .collect()
}
