//! Synthetic rate history for the trend view
use chrono::{Days, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default length of the trend series, in days.
pub const DEFAULT_TREND_DAYS: u32 = 7;

/// Maximum relative deviation of a trend point from the base rate.
const TREND_VARIATION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Builds `days` daily points ending at `end`, oldest first, each within ±5%
/// of `base_rate` and rounded to 6 decimals.
pub fn generate_trend<R: Rng + ?Sized>(
    base_rate: f64,
    days: u32,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<TrendPoint> {
    (0..days)
        .rev()
        .filter_map(|offset| {
            let date = end.checked_sub_days(Days::new(offset.into()))?;
            let variation = rng.gen_range(-TREND_VARIATION..=TREND_VARIATION);
            let rate = (base_rate * (1.0 + variation) * 1e6).round() / 1e6;
            Some(TrendPoint { date, rate })
        })
        .collect()
}

/// Lowest and highest rate of a series, `None` when it is empty.
pub fn trend_range(points: &[TrendPoint]) -> Option<(f64, f64)> {
    points.iter().map(|p| p.rate).fold(None, |acc, rate| match acc {
        None => Some((rate, rate)),
        Some((lo, hi)) => Some((lo.min(rate), hi.max(rate))),
    })
}
