use crate::outcome::RawBatch;
use annotate::AnalysisResult;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Loads saved analysis payloads from disk.
pub struct PayloadReader;

impl PayloadReader {
    pub async fn read_batch(path: &Path) -> Result<RawBatch> {
        let json = Self::read_json(path).await?;
        RawBatch::from_json(&json)
            .with_context(|| format!("Failed to parse batch payload: {:?}", path))
    }

    pub async fn read_analysis(path: &Path) -> Result<AnalysisResult> {
        let json = Self::read_json(path).await?;
        AnalysisResult::from_json(&json)
            .with_context(|| format!("Failed to parse analysis payload: {:?}", path))
    }

    async fn read_json(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "json" => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read file: {:?}", path)),
            _ => anyhow::bail!("Unsupported payload format: {}", extension),
        }
    }
}
