// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost calculation and token estimation.
//!
//! Prices are configured per million tokens and default to zero, so cost is
//! only reported when an operator provides a price list.

use parley_config::model::CostConfig;
use parley_core::TokenUsage;

/// Characters per token assumed when the endpoint does not report usage.
pub const CHARS_PER_TOKEN: usize = 4;

/// Pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl From<&CostConfig> for ModelPricing {
    fn from(config: &CostConfig) -> Self {
        Self {
            input_per_mtok: config.input_price_per_mtok,
            output_per_mtok: config.output_price_per_mtok,
        }
    }
}

/// Calculate cost in USD for a given token usage and pricing.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let input = (usage.prompt_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
    let output = (usage.completion_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
    input + output
}

/// Approximate token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// Usage estimated from prompt and completion text.
pub fn estimate_usage(prompt: &str, completion: &str) -> TokenUsage {
    let prompt_tokens = estimate_tokens(prompt);
    let completion_tokens = estimate_tokens(completion);
    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens.saturating_add(completion_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_prices_cost_nothing() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            total_tokens: 2_000_000,
        };
        assert_eq!(calculate_cost(&usage, &ModelPricing::default()), 0.0);
    }

    #[test]
    fn cost_scales_per_million() {
        let usage = TokenUsage {
            prompt_tokens: 2_000,
            completion_tokens: 500,
            total_tokens: 2_500,
        };
        let pricing = ModelPricing {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
        };
        let cost = calculate_cost(&usage, &pricing);
        assert!((cost - 0.0135).abs() < 1e-9);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Counted in characters, not bytes.
        assert_eq!(estimate_tokens("안녕하세요"), 2);
    }

    #[test]
    fn estimated_usage_totals() {
        let usage = estimate_usage("12345678", "1234");
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, 3);
    }

    #[test]
    fn pricing_from_config() {
        let config = CostConfig {
            input_price_per_mtok: 0.5,
            output_price_per_mtok: 1.5,
            ..CostConfig::default()
        };
        let pricing = ModelPricing::from(&config);
        assert_eq!(pricing.input_per_mtok, 0.5);
        assert_eq!(pricing.output_per_mtok, 1.5);
    }
}
