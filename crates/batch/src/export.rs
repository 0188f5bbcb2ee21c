use crate::aggregate::{BatchResult, DocumentOutcome, DocumentRecord};
use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use std::collections::BTreeMap;

pub const CSV_HEADER: [&str; 11] = [
    "filename",
    "status",
    "text_length",
    "total_entities",
    "entity_counts",
    "sentiment",
    "polarity",
    "category",
    "confidence",
    "text_preview",
    "error",
];

/// Render a batch as CSV, one row per document in result order.
///
/// Line breaks inside free-text fields are folded into spaces, so the output
/// always has one line per record.
pub fn to_csv(batch: &BatchResult) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;

    for record in &batch.results {
        writer
            .write_record(csv_row(record))
            .with_context(|| format!("Failed to write CSV row for {}", record.filename))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn csv_row(record: &DocumentRecord) -> Vec<String> {
    let filename = single_line(&record.filename);

    match &record.outcome {
        DocumentOutcome::Success(summary) => vec![
            filename,
            "success".to_string(),
            summary.text_length.to_string(),
            summary.total_entities.to_string(),
            format_counts(&summary.counts),
            summary
                .sentiment
                .as_ref()
                .map(|s| s.display_label())
                .unwrap_or_default(),
            summary
                .sentiment
                .as_ref()
                .map(|s| format!("{:.3}", s.polarity))
                .unwrap_or_default(),
            summary
                .category
                .as_ref()
                .map(|c| single_line(&c.primary_category))
                .unwrap_or_default(),
            summary
                .category
                .as_ref()
                .map(|c| format!("{:.2}", c.confidence))
                .unwrap_or_default(),
            single_line(&summary.preview.text),
            String::new(),
        ],
        DocumentOutcome::Error { error } => {
            let mut row = vec![filename, "error".to_string()];
            row.resize(CSV_HEADER.len() - 1, String::new());
            row.push(single_line(error));
            row
        }
    }
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(label, count)| format!("{}:{}", label, count))
        .collect::<Vec<_>>()
        .join("; ")
}

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(|c: char| c == '\n' || c == '\r', " ")
}
