use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Model priced when a record carries no model id at all.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Rates used for unknown models when no override is configured, per 1M tokens.
pub const FALLBACK_INPUT_PRICE: f64 = 1.0;
pub const FALLBACK_OUTPUT_PRICE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Custom,
    Other,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Custom => "custom",
            Provider::Other => "other",
        })
    }
}

/// Substring → provider rules, checked in order against the lower-cased id.
/// More specific fragments must come before the ones they contain.
pub const PROVIDER_RULES: &[(&str, Provider)] = &[
    ("gemini", Provider::Gemini),
    ("gemma", Provider::Gemini),
    ("learnlm", Provider::Gemini),
    ("gpt", Provider::OpenAi),
    ("o4-mini", Provider::OpenAi),
    ("o3", Provider::OpenAi),
    ("o1", Provider::OpenAi),
    ("custom", Provider::Custom),
];

pub fn detect_provider(model_id: &str) -> Provider {
    let id = model_id.to_lowercase();
    PROVIDER_RULES
        .iter()
        .find(|(fragment, _)| id.contains(fragment))
        .map(|(_, provider)| *provider)
        .unwrap_or(Provider::Other)
}

/// Per-million-token pricing for one table entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPricing {
    /// Table key. Unique.
    pub id: Cow<'static, str>,
    /// Identifier sent upstream; variants share their base model's id.
    pub api_id: Cow<'static, str>,
    pub display_name: Cow<'static, str>,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub reasoning_output_per_million: f64,
    /// Suggested reasoning budget in tokens. Informational, never priced.
    pub default_reasoning_budget: u32,
    pub provider: Provider,
}

const fn builtin(
    id: &'static str,
    api_id: &'static str,
    display_name: &'static str,
    prices: (f64, f64, f64),
    default_reasoning_budget: u32,
    provider: Provider,
) -> ModelPricing {
    ModelPricing {
        id: Cow::Borrowed(id),
        api_id: Cow::Borrowed(api_id),
        display_name: Cow::Borrowed(display_name),
        input_per_million: prices.0,
        output_per_million: prices.1,
        reasoning_output_per_million: prices.2,
        default_reasoning_budget,
        provider,
    }
}

const BUILTIN_MODELS: &[ModelPricing] = &[
    builtin(
        "gemini-2.5-flash",
        "gemini-2.5-flash",
        "2.5 Flash",
        (0.15, 0.6, 3.5),
        0,
        Provider::Gemini,
    ),
    builtin(
        "gemini-2.5-flash__thinking",
        "gemini-2.5-flash",
        "2.5 Flash (thinking)",
        (0.15, 0.6, 3.5),
        500,
        Provider::Gemini,
    ),
    builtin(
        "gemini-2.5-pro",
        "gemini-2.5-pro",
        "2.5 Pro",
        (1.25, 10.0, 10.0),
        4000,
        Provider::Gemini,
    ),
    builtin(
        "o4-mini",
        "o4-mini",
        "o4-mini",
        (1.1, 4.4, 4.4),
        32768,
        Provider::OpenAi,
    ),
    builtin(
        "custom",
        "custom",
        "Custom",
        (1.0, 1.0, 1.0),
        32768,
        Provider::Custom,
    ),
];

/// Deployment-supplied rates for models missing from the table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverridePrices {
    pub input: Option<f64>,
    pub output: Option<f64>,
}

impl OverridePrices {
    /// Parse free-form preference strings. Blank or non-numeric text is ignored.
    pub fn parse(input: Option<&str>, output: Option<&str>) -> Self {
        let num = |s: Option<&str>| s.and_then(|v| v.trim().parse::<f64>().ok());
        Self {
            input: num(input),
            output: num(output),
        }
    }

    pub fn is_empty(&self) -> bool {
        usable_rate(self.input).is_none() && usable_rate(self.output).is_none()
    }
}

fn usable_rate(rate: Option<f64>) -> Option<f64> {
    rate.filter(|r| r.is_finite() && *r > 0.0)
}

/// Immutable registry of known model prices.
#[derive(Debug, Clone)]
pub struct PriceTable {
    models: HashMap<Cow<'static, str>, ModelPricing>,
}

impl PriceTable {
    pub fn builtin() -> Self {
        Self::from_models(BUILTIN_MODELS.iter().cloned())
    }

    /// Build a table from entries; a later entry replaces an earlier one with
    /// the same id, so ids stay unique.
    pub fn from_models(models: impl IntoIterator<Item = ModelPricing>) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelPricing> {
        self.models.get(model_id)
    }

    /// Entries sorted by id.
    pub fn models(&self) -> Vec<&ModelPricing> {
        let mut models: Vec<&ModelPricing> = self.models.values().collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    /// Pricing for any model id. Unknown ids get a synthesized entry priced
    /// from `overrides` when usable, else from the fallback constants.
    pub fn lookup(&self, model_id: &str, overrides: Option<&OverridePrices>) -> ModelPricing {
        if let Some(known) = self.get(model_id) {
            return known.clone();
        }

        let input = usable_rate(overrides.and_then(|o| o.input)).unwrap_or(FALLBACK_INPUT_PRICE);
        let output =
            usable_rate(overrides.and_then(|o| o.output)).unwrap_or(FALLBACK_OUTPUT_PRICE);

        ModelPricing {
            id: Cow::Owned(model_id.to_string()),
            api_id: Cow::Owned(model_id.to_string()),
            display_name: Cow::Owned(model_id.to_string()),
            input_per_million: input,
            output_per_million: output,
            reasoning_output_per_million: output,
            default_reasoning_budget: 0,
            provider: detect_provider(model_id),
        }
    }

    /// Display name for a model id; unknown ids are shown as-is.
    pub fn display_name(&self, model_id: &str) -> String {
        self.get(model_id)
            .map(|m| m.display_name.to_string())
            .unwrap_or_else(|| model_id.to_string())
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::builtin()
    }
}
