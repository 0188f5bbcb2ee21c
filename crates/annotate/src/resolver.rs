//! Partitioning of analyzed text into plain and entity segments.
//!
//! Entity offsets come from an external service and are not trusted: spans may
//! be unsorted, empty, out of range or overlapping. The resolver cleans them up
//! instead of rejecting them, and reports what it had to fix in a [`SpanReport`].

use crate::schema::EntityAnnotation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Half-open `[start, end)` range in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharSpan {
    pub start: usize,
    pub end: usize,
}

impl CharSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn intersects(&self, other: &CharSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Plain {
        id: String,
        content: String,
        span: CharSpan,
    },
    Entity {
        id: String,
        content: String,
        span: CharSpan,
        entity: EntityAnnotation,
    },
}

impl Segment {
    pub fn id(&self) -> &str {
        match self {
            Segment::Plain { id, .. } | Segment::Entity { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Segment::Plain { content, .. } | Segment::Entity { content, .. } => content,
        }
    }

    pub fn span(&self) -> CharSpan {
        match self {
            Segment::Plain { span, .. } | Segment::Entity { span, .. } => *span,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Segment::Entity { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Segment::Entity { entity, .. } => Some(&entity.label),
            Segment::Plain { .. } => None,
        }
    }
}

/// Counts of the recoveries applied while resolving one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanReport {
    pub accepted: usize,
    pub clamped: usize,
    pub discarded_empty: usize,
    pub discarded_out_of_range: usize,
    pub shadowed: usize,
}

impl SpanReport {
    /// Entities that were dropped from highlighting for any reason.
    pub fn dropped(&self) -> usize {
        self.discarded_empty + self.discarded_out_of_range + self.shadowed
    }

    pub fn is_clean(&self) -> bool {
        self.clamped == 0 && self.dropped() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub segments: Vec<Segment>,
    pub report: SpanReport,
}

struct Candidate<'a> {
    index: usize,
    span: CharSpan,
    entity: &'a EntityAnnotation,
}

/// Resolve `entities` over `text` into an ordered, lossless segment sequence.
pub fn resolve(text: &str, entities: &[EntityAnnotation]) -> Vec<Segment> {
    resolve_with_report(text, entities).segments
}

pub fn resolve_with_report(text: &str, entities: &[EntityAnnotation]) -> Resolution {
    let boundaries = char_boundaries(text);
    let char_len = boundaries.len() - 1;
    let mut report = SpanReport::default();

    let mut candidates = Vec::with_capacity(entities.len());
    for (index, entity) in entities.iter().enumerate() {
        match clamp_span(entity, char_len) {
            SpanCheck::Empty => {
                report.discarded_empty += 1;
                debug!(index, start = entity.start, end = entity.end, label = %entity.label, "discarding empty span");
            }
            SpanCheck::OutOfRange => {
                report.discarded_out_of_range += 1;
                debug!(index, start = entity.start, end = entity.end, char_len, label = %entity.label, "discarding out-of-range span");
            }
            SpanCheck::Valid { span, clamped } => {
                if clamped {
                    report.clamped += 1;
                    debug!(index, start = entity.start, end = entity.end, clamped_start = span.start, clamped_end = span.end, "clamped span to text bounds");
                }
                candidates.push(Candidate { index, span, entity });
            }
        }
    }

    // Earliest first, longer match first, then input order
    candidates.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.len().cmp(&a.span.len()))
            .then(a.index.cmp(&b.index))
    });

    let mut accepted: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        // Accepted spans are sorted and disjoint, so only the last one can intersect.
        let overlaps = accepted
            .last()
            .is_some_and(|last| last.span.intersects(&candidate.span));
        if overlaps {
            report.shadowed += 1;
            debug!(index = candidate.index, start = candidate.span.start, end = candidate.span.end, label = %candidate.entity.label, "span shadowed by earlier entity");
        } else {
            accepted.push(candidate);
        }
    }
    report.accepted = accepted.len();

    let slice = |span: CharSpan| text[boundaries[span.start]..boundaries[span.end]].to_string();
    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0;

    for candidate in &accepted {
        if candidate.span.start > cursor {
            segments.push(plain_segment(CharSpan { start: cursor, end: candidate.span.start }, &slice));
        }
        segments.push(Segment::Entity {
            id: entity_id(candidate.span, &candidate.entity.label),
            content: slice(candidate.span),
            span: candidate.span,
            entity: candidate.entity.clone(),
        });
        cursor = candidate.span.end;
    }
    if cursor < char_len {
        segments.push(plain_segment(CharSpan { start: cursor, end: char_len }, &slice));
    }

    if !report.is_clean() {
        debug!(?report, "resolved entity spans with recoveries");
    }

    Resolution { segments, report }
}

enum SpanCheck {
    Empty,
    OutOfRange,
    Valid { span: CharSpan, clamped: bool },
}

fn clamp_span(entity: &EntityAnnotation, char_len: usize) -> SpanCheck {
    if entity.start >= entity.end {
        return SpanCheck::Empty;
    }

    let len = char_len as i64;
    if entity.end <= 0 || entity.start >= len {
        return SpanCheck::OutOfRange;
    }

    let start = entity.start.max(0);
    let end = entity.end.min(len);
    if start >= end {
        return SpanCheck::OutOfRange;
    }

    SpanCheck::Valid {
        span: CharSpan {
            start: start as usize,
            end: end as usize,
        },
        clamped: start != entity.start || end != entity.end,
    }
}

/// Byte offset of every character start, plus the total byte length.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn plain_segment(span: CharSpan, slice: &impl Fn(CharSpan) -> String) -> Segment {
    Segment::Plain {
        id: format!("plain-{}-{}", span.start, span.end),
        content: slice(span),
        span,
    }
}

/// Stable id for an entity span: same range and label give the same id.
pub fn entity_id(span: CharSpan, label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(span.start.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(span.end.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(label.as_bytes());
    let result = hasher.finalize();
    format!("ent-{}", hex::encode(&result[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ent(text: &str, label: &str, start: i64, end: i64) -> EntityAnnotation {
        EntityAnnotation::new(text, label, start, end)
    }

    fn contents(segments: &[Segment]) -> Vec<(bool, &str)> {
        segments.iter().map(|s| (s.is_entity(), s.content())).collect()
    }

    #[test]
    fn test_end_to_end_sentence() {
        let text = "Alice met Bob in Paris.";
        let entities = vec![
            ent("Alice", "PERSON", 0, 5),
            ent("Bob", "PERSON", 10, 13),
            ent("Paris", "GPE", 17, 22),
        ];

        let segments = resolve(text, &entities);
        assert_eq!(
            contents(&segments),
            vec![
                (true, "Alice"),
                (false, " met "),
                (true, "Bob"),
                (false, " in "),
                (true, "Paris"),
                (false, "."),
            ]
        );
        assert_eq!(segments[4].label(), Some("GPE"));
    }

    #[test]
    fn test_longer_match_shadows_prefix() {
        let text = "Paris is nice";
        let entities = vec![ent("Paris", "GPE", 0, 5), ent("Par", "GPE", 0, 3)];

        let resolution = resolve_with_report(text, &entities);
        assert_eq!(contents(&resolution.segments), vec![(true, "Paris"), (false, " is nice")]);
        assert_eq!(resolution.report.shadowed, 1);

        // Input order does not matter for the longer-first rule
        let reversed = vec![ent("Par", "GPE", 0, 3), ent("Paris", "GPE", 0, 5)];
        assert_eq!(resolve(text, &reversed), resolution.segments);
    }

    #[test]
    fn test_partial_overlap_first_wins() {
        let text = "New York City";
        let entities = vec![ent("York City", "GPE", 4, 13), ent("New York", "GPE", 0, 8)];

        let resolution = resolve_with_report(text, &entities);
        assert_eq!(contents(&resolution.segments), vec![(true, "New York"), (false, " City")]);
        assert_eq!(resolution.report.shadowed, 1);
    }

    #[test]
    fn test_equal_spans_keep_input_order() {
        let text = "Apple";
        let entities = vec![ent("Apple", "ORG", 0, 5), ent("Apple", "PRODUCT", 0, 5)];

        let segments = resolve(text, &entities);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].label(), Some("ORG"));
    }

    #[test]
    fn test_out_of_range_handling() {
        let clamped = resolve_with_report("Hello", &[ent("He", "X", -3, 2)]);
        assert_eq!(contents(&clamped.segments), vec![(true, "He"), (false, "llo")]);
        assert_eq!(clamped.segments[0].span(), CharSpan { start: 0, end: 2 });
        assert_eq!(clamped.report.clamped, 1);

        let discarded = resolve_with_report("Hello", &[ent("??", "X", 10, 12)]);
        assert_eq!(contents(&discarded.segments), vec![(false, "Hello")]);
        assert_eq!(discarded.report.discarded_out_of_range, 1);

        let tail = resolve("Hello", &[ent("lo", "X", 3, 99)]);
        assert_eq!(contents(&tail), vec![(false, "Hel"), (true, "lo")]);
    }

    #[test]
    fn test_empty_and_inverted_spans_discarded() {
        let resolution = resolve_with_report("Hello", &[ent("", "X", 2, 2), ent("", "X", 4, 1)]);
        assert_eq!(contents(&resolution.segments), vec![(false, "Hello")]);
        assert_eq!(resolution.report.discarded_empty, 2);
        assert_eq!(resolution.report.accepted, 0);
    }

    #[test]
    fn test_empty_text() {
        let resolution = resolve_with_report("", &[ent("x", "X", 0, 1)]);
        assert!(resolution.segments.is_empty());
        assert_eq!(resolution.report.discarded_out_of_range, 1);

        // Straddles the whole (empty) text
        let resolution = resolve_with_report("", &[ent("x", "X", -3, 2)]);
        assert!(resolution.segments.is_empty());
        assert_eq!(resolution.report.discarded_out_of_range, 1);
        assert_eq!(resolution.report.accepted, 0);
        assert_eq!(resolution.report.clamped, 0);
    }

    #[test]
    fn test_offsets_are_characters() {
        let text = "Café in Zürich €5";
        let entities = vec![ent("Café", "ORG", 0, 4), ent("Zürich", "GPE", 8, 14)];

        let segments = resolve(text, &entities);
        assert_eq!(
            contents(&segments),
            vec![(true, "Café"), (false, " in "), (true, "Zürich"), (false, " €5")]
        );
    }

    #[test]
    fn test_ids_are_stable() {
        let text = "Alice met Bob";
        let entities = vec![ent("Bob", "PERSON", 10, 13), ent("Alice", "PERSON", 0, 5)];

        let first = resolve(text, &entities);
        let second = resolve(text, &entities);
        assert_eq!(first, second);

        assert_eq!(first[0].id(), entity_id(CharSpan { start: 0, end: 5 }, "PERSON"));
        assert_eq!(first[1].id(), "plain-5-10");
        assert_ne!(
            entity_id(CharSpan { start: 0, end: 5 }, "PERSON"),
            entity_id(CharSpan { start: 0, end: 5 }, "ORG")
        );
        assert!(first[0].id().starts_with("ent-"));
        assert_eq!(first[0].id().len(), 4 + 16);
    }

    #[test]
    fn test_random_spans_partition_text() {
        let alphabet = ['a', 'B', ' ', '.', 'é', '€', '日', '😀'];
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let len = rng.gen_range(0..40usize);
            let text: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let entity_count = rng.gen_range(0..8);
            let entities: Vec<EntityAnnotation> = (0..entity_count)
                .map(|i| {
                    let start = rng.gen_range(-5..len as i64 + 5);
                    let end = rng.gen_range(-5..len as i64 + 8);
                    ent("x", if i % 2 == 0 { "PERSON" } else { "ORG" }, start, end)
                })
                .collect();

            let resolution = resolve_with_report(&text, &entities);
            let segments = &resolution.segments;

            let rebuilt: String = segments.iter().map(Segment::content).collect();
            assert_eq!(rebuilt, text);

            // Contiguous, non-empty, ordered
            let mut cursor = 0;
            for segment in segments {
                assert_eq!(segment.span().start, cursor);
                assert!(!segment.span().is_empty());
                assert_eq!(segment.content().chars().count(), segment.span().len());
                cursor = segment.span().end;
            }
            assert_eq!(cursor, text.chars().count());

            let entity_spans: Vec<CharSpan> = segments
                .iter()
                .filter(|s| s.is_entity())
                .map(Segment::span)
                .collect();
            for (i, a) in entity_spans.iter().enumerate() {
                for b in &entity_spans[i + 1..] {
                    assert!(!a.intersects(b));
                }
            }

            let report = resolution.report;
            assert_eq!(report.accepted, entity_spans.len());
            assert_eq!(report.accepted + report.dropped(), entities.len());

            assert_eq!(&resolve(&text, &entities), segments);
        }
    }
}
