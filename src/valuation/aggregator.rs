//! Recency-weighted price statistics per currency pair
//!
//! Each sale of `from` priced in `to` contributes with weight
//! `max(1, 86400 / max(1, reference_time - item_updated_at))`: anything
//! up to a day old weighs at least one day's worth, older listings
//! bottom out at 1.

use crate::error::Result;
use crate::store::ValuationStore;
use crate::types::{CurrencyPairStat, SaleSample};

/// Seconds over which the recency weight decays to its floor
pub const DECAY_UNIT_SECS: f64 = 86_400.0;

/// Minimum sample count before outlier rejection is attempted
const OUTLIER_MIN_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedStats {
    pub count: usize,
    pub mean: f64,
    pub standard_dev: f64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Updated(CurrencyPairStat),
    /// No sales for the pair; the table is left untouched
    NoSamples,
    /// Variance could not be computed; the table is left untouched
    Undefined,
}

pub fn decay_weight(reference_time: i64, item_updated_at: i64) -> f64 {
    let age = (reference_time - item_updated_at).max(1) as f64;
    (DECAY_UNIT_SECS / age).max(1.0)
}

fn moments(prices: &[f64], weights: &[f64]) -> Option<WeightedStats> {
    if prices.is_empty() {
        return None;
    }

    let total_weight: f64 = weights.iter().sum();
    let weighted_sum: f64 = prices.iter().zip(weights).map(|(p, w)| p * w).sum();
    let mean = weighted_sum / total_weight.max(1.0);

    if total_weight == 0.0 {
        return None;
    }
    let variance = prices
        .iter()
        .zip(weights)
        .map(|(p, w)| w * (p - mean).powi(2))
        .sum::<f64>()
        / total_weight;

    if !mean.is_finite() || !variance.is_finite() {
        return None;
    }

    Some(WeightedStats {
        count: prices.len(),
        mean,
        standard_dev: variance.sqrt(),
        total_weight,
    })
}

/// Weighted mean and standard deviation of `samples`
///
/// With `reject_outliers`, a wide distribution (more than three samples
/// and a deviation above half the mean) is recomputed once without the
/// samples further than two deviations from the mean; `count` then
/// reflects the retained samples.
pub fn weighted_statistics(
    samples: &[SaleSample],
    reference_time: i64,
    reject_outliers: bool,
) -> Option<WeightedStats> {
    let prices: Vec<f64> = samples.iter().map(|s| s.amount).collect();
    let weights: Vec<f64> = samples
        .iter()
        .map(|s| decay_weight(reference_time, s.item_updated_at))
        .collect();

    let stats = moments(&prices, &weights)?;

    if !reject_outliers
        || stats.count <= OUTLIER_MIN_COUNT
        || stats.standard_dev <= stats.mean / 2.0
    {
        return Some(stats);
    }

    let limit = 2.0 * stats.standard_dev;
    let (kept_prices, kept_weights): (Vec<f64>, Vec<f64>) = prices
        .iter()
        .zip(&weights)
        .filter(|(p, _)| (*p - stats.mean).abs() <= limit)
        .map(|(p, w)| (*p, *w))
        .unzip();

    log::debug!(
        "Outlier rejection kept {} of {} samples (mean={:.4}, std={:.4})",
        kept_prices.len(),
        stats.count,
        stats.mean,
        stats.standard_dev
    );
    moments(&kept_prices, &kept_weights).or(Some(stats))
}

/// Refreshes `currency_summary` rows from the `sale` table
#[derive(Debug, Clone, Default)]
pub struct WeightedAggregator {
    reject_outliers: bool,
}

impl WeightedAggregator {
    pub fn new(reject_outliers: bool) -> Self {
        Self { reject_outliers }
    }

    /// Recompute the (`from`, `to`) pair from every recorded sale of
    /// `from` priced in `to`, weighting against `reference_time`
    pub fn update_summary<S: ValuationStore + ?Sized>(
        &self,
        store: &S,
        from: &str,
        to: &str,
        reference_time: i64,
        now: i64,
    ) -> Result<SummaryOutcome> {
        let samples = store.sale_samples(from, to)?;
        if samples.is_empty() {
            log::debug!("No sales of {} in {}, summary unchanged", from, to);
            return Ok(SummaryOutcome::NoSamples);
        }

        let Some(stats) = weighted_statistics(&samples, reference_time, self.reject_outliers)
        else {
            log::debug!("Undefined statistics for {} -> {}, summary unchanged", from, to);
            return Ok(SummaryOutcome::Undefined);
        };

        let stat = CurrencyPairStat {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            count: stats.count as i64,
            mean: stats.mean,
            standard_dev: stats.standard_dev,
            weight: stats.total_weight,
        };
        store.upsert_currency_pair(&stat, now)?;

        log::debug!(
            "📊 {} -> {}: count={} mean={:.4} std={:.4}",
            from,
            to,
            stat.count,
            stat.mean,
            stat.standard_dev
        );
        Ok(SummaryOutcome::Updated(stat))
    }
}
