use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::UsageError;
use crate::period::Granularity;
use crate::pricing::OverridePrices;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// History file or directory.
    pub history: Option<PathBuf>,
    /// Granularity name, checked by [`Config::default_granularity`].
    pub default_period: Option<String>,
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Action id → display name.
    #[serde(default)]
    pub actions: HashMap<String, String>,
}

/// Rates for models missing from the built-in table, per 1M tokens.
/// Accepts numbers or numeric strings, as preference fields are often text.
#[derive(Debug, Deserialize, Default)]
pub struct PricingConfig {
    pub input: Option<PriceValue>,
    pub output: Option<PriceValue>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            PriceValue::Number(n) => Some(*n),
            PriceValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl PricingConfig {
    pub fn overrides(&self) -> OverridePrices {
        OverridePrices {
            input: self.input.as_ref().and_then(PriceValue::as_f64),
            output: self.output.as_ref().and_then(PriceValue::as_f64),
        }
    }
}

impl Config {
    pub fn default_granularity(&self) -> Result<Option<Granularity>, UsageError> {
        self.default_period.as_deref().map(str::parse).transpose()
    }

    pub fn action_name(&self, action_id: &str) -> String {
        self.actions
            .get(action_id)
            .cloned()
            .unwrap_or_else(|| action_id.to_string())
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "promptmeter")
}

pub fn parse_config(data: &str) -> Result<Config> {
    toml::from_str(data).context("invalid config")
}

/// Load `config.toml` from the platform config dir. A missing or malformed
/// file gives the defaults; malformed files are logged.
pub fn load_config() -> Result<Config> {
    let Some(dirs) = project_dirs() else {
        return Ok(Config::default());
    };

    let path = dirs.config_dir().join("config.toml");
    let Ok(data) = fs::read_to_string(&path) else {
        tracing::debug!(path = %path.display(), "no config file");
        return Ok(Config::default());
    };

    match parse_config(&data) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{e:#}"),
                "ignoring invalid config"
            );
            Ok(Config::default())
        }
    }
}
