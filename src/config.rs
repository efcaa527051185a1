use std::env;
use std::path::PathBuf;

use crate::error::{LexflowError, Result};

/// Lowest cost bcrypt accepts. Tests hash at this cost.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("lexflow_data"),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            log_format: LogFormat::Plain,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Missing .env is normal; real env vars still apply.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(dir) = lookup("LEXFLOW_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(cost) = lookup("LEXFLOW_BCRYPT_COST") {
            config.bcrypt_cost = cost
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|c| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(c))
                .ok_or_else(|| {
                    LexflowError::invalid("LEXFLOW_BCRYPT_COST", format!("`{cost}` is not a cost between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"))
                })?;
        }
        if let Some(format) = lookup("LEXFLOW_LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "plain" | "" => LogFormat::Plain,
                "json" => LogFormat::Json,
                other => {
                    return Err(LexflowError::invalid(
                        "LEXFLOW_LOG_FORMAT",
                        format!("`{other}` is not plain or json"),
                    ))
                }
            };
        }
        config.log_dir = lookup("LEXFLOW_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Ok(config)
    }
}
