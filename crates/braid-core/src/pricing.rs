//! Cost calculation — pricing tables and per-response cost computation.
//!
//! Tiers are USD per million tokens with cache multipliers. The append
//! engine calls [`calculate_cost`] only when the event payload did not carry
//! a pre-computed cost; unknown models return `None` and the session cost
//! counter is left unchanged.

use crate::tokens::TokenUsage;

/// Pricing tier per million tokens.
struct PricingTier {
    input_per_million: f64,
    output_per_million: f64,
    cache_write_5m_multiplier: f64,
    cache_write_1h_multiplier: f64,
    cache_read_multiplier: f64,
}

const OPUS: PricingTier = PricingTier {
    input_per_million: 5.0,
    output_per_million: 25.0,
    cache_write_5m_multiplier: 1.25,
    cache_write_1h_multiplier: 2.0,
    cache_read_multiplier: 0.1,
};

const SONNET: PricingTier = PricingTier {
    input_per_million: 3.0,
    output_per_million: 15.0,
    cache_write_5m_multiplier: 1.25,
    cache_write_1h_multiplier: 2.0,
    cache_read_multiplier: 0.1,
};

const HAIKU: PricingTier = PricingTier {
    input_per_million: 1.0,
    output_per_million: 5.0,
    cache_write_5m_multiplier: 1.25,
    cache_write_1h_multiplier: 2.0,
    cache_read_multiplier: 0.1,
};

const GPT_5: PricingTier = PricingTier {
    input_per_million: 1.25,
    output_per_million: 10.0,
    cache_write_5m_multiplier: 1.0,
    cache_write_1h_multiplier: 1.0,
    cache_read_multiplier: 0.1,
};

const GEMINI_PRO: PricingTier = PricingTier {
    input_per_million: 1.25,
    output_per_million: 5.0,
    cache_write_5m_multiplier: 1.0,
    cache_write_1h_multiplier: 1.0,
    cache_read_multiplier: 0.25,
};

const GEMINI_FLASH: PricingTier = PricingTier {
    input_per_million: 0.075,
    output_per_million: 0.3,
    cache_write_5m_multiplier: 1.0,
    cache_write_1h_multiplier: 1.0,
    cache_read_multiplier: 0.25,
};

/// Look up the pricing tier for a model, pattern-matching on model family.
fn lookup_tier(model: &str) -> Option<&'static PricingTier> {
    let m = model.to_ascii_lowercase();
    if m.contains("opus") {
        Some(&OPUS)
    } else if m.contains("sonnet") {
        Some(&SONNET)
    } else if m.contains("haiku") {
        Some(&HAIKU)
    } else if m.starts_with("gpt-") || m.starts_with("o1") || m.starts_with("o3") {
        Some(&GPT_5)
    } else if m.contains("gemini") && m.contains("flash") {
        Some(&GEMINI_FLASH)
    } else if m.contains("gemini") {
        Some(&GEMINI_PRO)
    } else {
        None
    }
}

/// Compute the USD cost of one response, or `None` for unknown models.
///
/// Plain `cacheCreationTokens` without a TTL breakdown are billed at the
/// 5-minute write rate.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> Option<f64> {
    let tier = lookup_tier(model)?;

    let per_token_in = tier.input_per_million / 1_000_000.0;
    let per_token_out = tier.output_per_million / 1_000_000.0;

    let mut cost = usage.input_tokens as f64 * per_token_in
        + usage.output_tokens as f64 * per_token_out
        + usage.cache_read_tokens.unwrap_or(0) as f64 * per_token_in * tier.cache_read_multiplier;

    let write_5m = usage.cache_creation_5m_tokens;
    let write_1h = usage.cache_creation_1h_tokens;
    if write_5m.is_some() || write_1h.is_some() {
        cost += write_5m.unwrap_or(0) as f64 * per_token_in * tier.cache_write_5m_multiplier;
        cost += write_1h.unwrap_or(0) as f64 * per_token_in * tier.cache_write_1h_multiplier;
    } else {
        cost += usage.cache_creation_tokens.unwrap_or(0) as f64
            * per_token_in
            * tier.cache_write_5m_multiplier;
    }

    Some(cost)
}
