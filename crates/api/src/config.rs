use anyhow::{Context, Result};
use batch::AggregateOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub aggregation: AggregateOptions,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when RUST_LOG is not set
    pub filter: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown log format: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8000".to_string(),
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
                filter: "info".to_string(),
            },
            aggregation: AggregateOptions::default(),
            cache: CacheConfig {
                enabled: true,
                max_entries: 1024,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whichever `NER_VIEW_*` keys `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("NER_VIEW_ADDR") {
            config.server.addr = addr;
        }
        if let Some(format) = lookup("NER_VIEW_LOG_FORMAT") {
            config.logging.format = format.parse()?;
        }
        if let Some(chars) = lookup("NER_VIEW_PREVIEW_CHARS") {
            config.aggregation.preview_chars = parse_number("NER_VIEW_PREVIEW_CHARS", &chars)?;
        }
        if let Some(sample) = lookup("NER_VIEW_SAMPLE_ENTITIES") {
            config.aggregation.sample_entities = parse_number("NER_VIEW_SAMPLE_ENTITIES", &sample)?;
        }
        if let Some(entries) = lookup("NER_VIEW_CACHE_ENTRIES") {
            config.cache.max_entries = parse_number("NER_VIEW_CACHE_ENTRIES", &entries)?;
            config.cache.enabled = config.cache.max_entries > 0;
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, value))
}
