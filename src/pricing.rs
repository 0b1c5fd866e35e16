//! Per-session cost.
//!
//! The effectiveness scorer only needs a `cost(session) -> f64` function. Any
//! closure with that shape implements [`CostModel`]; [`PricingTable`] is the
//! lookup-table implementation driven by configuration.

use crate::config::PricingConfig;
use crate::models::SessionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait CostModel {
    fn cost(&self, session: &SessionRecord) -> f64;
}

impl<F> CostModel for F
where
    F: Fn(&SessionRecord) -> f64,
{
    fn cost(&self, session: &SessionRecord) -> f64 {
        self(session)
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }
}

/// Built-in rates, keyed by model-name prefix.
pub fn default_model_pricing() -> BTreeMap<String, ModelPricing> {
    BTreeMap::from([
        ("claude-sonnet-4".to_string(), ModelPricing::new(3.0, 15.0)),
        ("claude-opus-4".to_string(), ModelPricing::new(15.0, 75.0)),
        ("claude-3-5-haiku".to_string(), ModelPricing::new(0.8, 4.0)),
        ("claude-3-5-sonnet".to_string(), ModelPricing::new(3.0, 15.0)),
    ])
}

#[derive(Debug, Clone)]
pub struct PricingTable {
    default: ModelPricing,
    models: BTreeMap<String, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new(ModelPricing::new(3.0, 15.0), default_model_pricing())
    }
}

impl PricingTable {
    pub fn new(default: ModelPricing, models: BTreeMap<String, ModelPricing>) -> Self {
        Self { default, models }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(
            ModelPricing::new(config.input_per_million, config.output_per_million),
            config.models.clone(),
        )
    }

    /// Exact model match first, then the longest matching prefix, then the default.
    pub fn rates_for(&self, model: Option<&str>) -> ModelPricing {
        let Some(model) = model else {
            return self.default;
        };
        if let Some(rates) = self.models.get(model) {
            return *rates;
        }
        self.models
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, rates)| *rates)
            .unwrap_or(self.default)
    }
}

impl CostModel for PricingTable {
    fn cost(&self, session: &SessionRecord) -> f64 {
        let rates = self.rates_for(session.model.as_deref());
        (session.input_tokens as f64 * rates.input_per_million
            + session.output_tokens as f64 * rates.output_per_million)
            / 1_000_000.0
    }
}
