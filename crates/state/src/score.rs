//! Authenticity scoring.
//!
//! A pure function over a product and its batch history: no persisted
//! state, no clock access, no side effects. Identical inputs always yield
//! identical scores, which on-chain/off-chain consistency checks rely on.

use chrono::{DateTime, Utc};

use agrotrace_types::{Batch, Product, config::ScoringConfig};

/// Base score before deductions.
const BASE_SCORE: i32 = 100;

/// Computes the 0–100 authenticity score for a product.
///
/// Policy (thresholds from [`ScoringConfig`]):
/// - deduct by whole days elapsed since harvest, highest matching tier only;
/// - deduct by the anomaly percentage across all batches' sensor logs,
///   highest matching tier only;
/// - add a small bonus when the first batch was processed within the
///   configured window after harvest;
/// - clamp to `[0, 100]`.
///
/// A product with no recorded harvest takes no age deduction and no bonus.
pub fn authenticity_score(
    product: &Product,
    batches: &[&Batch],
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(harvest) = &product.harvest {
        let age_days = (now - harvest.date).num_days().max(0) as u64;
        score -= tier_deduction(&config.age_tiers, age_days);

        if let Some(first) = batches.first() {
            let delay_days = (first.processed_at - harvest.date).num_days().max(0) as u64;
            if delay_days <= config.prompt_processing_window_days {
                score += i32::from(config.prompt_processing_bonus);
            }
        }
    }

    let total_readings: usize = batches.iter().map(|b| b.sensor_log.len()).sum();
    if total_readings > 0 {
        let anomalies: usize =
            batches.iter().map(|b| b.sensor_log.iter().filter(|r| r.anomaly).count()).sum();
        score -= anomaly_tier_deduction(
            &config.anomaly_tiers,
            anomalies as u64,
            total_readings as u64,
        );
    }

    score.clamp(0, 100) as u8
}

/// Returns the deduction of the highest tier whose threshold is strictly
/// exceeded, or 0 when none matches. Tiers are descending by threshold.
fn tier_deduction(tiers: &[agrotrace_types::config::ScoreTier], observed: u64) -> i32 {
    tiers
        .iter()
        .find(|tier| observed > tier.threshold)
        .map(|tier| i32::from(tier.deduction))
        .unwrap_or(0)
}

/// Like [`tier_deduction`] for anomaly-rate tiers, where the threshold is a
/// percentage of `total`. Compared cross-multiplied, without rounding, so a
/// fractional rate just above a boundary still lands in its tier.
fn anomaly_tier_deduction(
    tiers: &[agrotrace_types::config::ScoreTier],
    anomalies: u64,
    total: u64,
) -> i32 {
    tiers
        .iter()
        .find(|tier| anomalies * 100 > tier.threshold * total)
        .map(|tier| i32::from(tier.deduction))
        .unwrap_or(0)
}
