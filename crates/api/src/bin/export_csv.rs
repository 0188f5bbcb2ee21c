//! Convert a saved batch response into the CSV export.
//!
//! Usage: export_csv <batch.json> [output.csv]

use anyhow::{Context, Result};
use api::AppConfig;
use batch::{aggregate_batch, to_csv, PayloadReader};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    api::telemetry::init_tracing(&config.logging);

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .context("Usage: export_csv <batch.json> [output.csv]")?;
    let output = args.next().map(PathBuf::from);

    let raw = PayloadReader::read_batch(&input).await?;
    let result = aggregate_batch(&raw, &config.aggregation);
    let csv = to_csv(&result)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, csv)
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!(
                total = result.total,
                successful = result.successful,
                failed = result.failed,
                "Wrote {:?}",
                path
            );
        }
        None => print!("{}", csv),
    }

    Ok(())
}
