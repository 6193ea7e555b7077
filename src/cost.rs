use std::collections::HashSet;

use crate::pricing::{ModelPricing, OverridePrices, PriceTable, DEFAULT_MODEL};
use crate::types::{HistoryRecord, RequestStats};

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Cost of a single request, in the currency unit of the price table.
///
/// Prompt tokens are billed at the input rate, reasoning tokens at the
/// reasoning rate and the remainder of the reported total at the output rate.
pub fn price(
    table: &PriceTable,
    model_id: &str,
    stats: Option<&RequestStats>,
    overrides: Option<&OverridePrices>,
) -> f64 {
    let Some(stats) = stats else {
        return 0.0;
    };
    if stats.is_empty() {
        return 0.0;
    }
    priced(&table.lookup(model_id, overrides), stats)
}

fn priced(p: &ModelPricing, stats: &RequestStats) -> f64 {
    let input = stats.prompt() as f64 / TOKENS_PER_UNIT * p.input_per_million;
    let reasoning = stats.reasoning() as f64 / TOKENS_PER_UNIT * p.reasoning_output_per_million;
    let answer = stats.final_output_tokens() as f64 / TOKENS_PER_UNIT * p.output_per_million;
    (input + reasoning + answer).abs()
}

/// Pricing lookups with the deployment's overrides bound in.
pub trait PricingMap: Sync {
    /// True when `model_id` is priced from the table rather than synthesized.
    fn is_known(&self, model_id: &str) -> bool;

    fn cost_for_stats(&self, model_id: &str, stats: Option<&RequestStats>) -> f64;

    fn cost_for_record(&self, r: &HistoryRecord) -> f64 {
        let model = r.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
        self.cost_for_stats(model, r.stats.as_ref())
    }

    /// Models that appeared in records but are priced with synthesized rates.
    fn unknown_models(&self, records: &[HistoryRecord]) -> Vec<String> {
        let mut models: Vec<String> = records
            .iter()
            .filter_map(|r| r.model_id.as_deref())
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|m| !self.is_known(m))
            .map(str::to_string)
            .collect();
        models.sort();
        models
    }
}

/// A price table plus the explicit override rates for unknown models.
#[derive(Debug, Clone, Default)]
pub struct Pricing {
    pub table: PriceTable,
    pub overrides: OverridePrices,
}

impl Pricing {
    pub fn new(table: PriceTable, overrides: OverridePrices) -> Self {
        Self { table, overrides }
    }
}

impl PricingMap for Pricing {
    fn is_known(&self, model_id: &str) -> bool {
        self.table.get(model_id).is_some()
    }

    fn cost_for_stats(&self, model_id: &str, stats: Option<&RequestStats>) -> f64 {
        price(&self.table, model_id, stats, Some(&self.overrides))
    }
}
