use crate::schema::EntityAnnotation;
use std::collections::{BTreeMap, HashSet};

/// Count entities per label.
///
/// Always computed over the full entity list: spans shadowed during
/// highlighting still count.
pub fn label_counts<'a, I>(labels: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn annotation_counts(entities: &[EntityAnnotation]) -> BTreeMap<String, usize> {
    label_counts(entities.iter().map(|e| e.label.as_str()))
}

/// Unique entity texts in first-seen order.
pub fn distinct_texts(entities: &[EntityAnnotation]) -> Vec<&str> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .map(|e| e.text.as_str())
        .filter(|text| seen.insert(*text))
        .collect()
}
