//! Exchange rate resolution over a fixed rate table.
//!
//! A pair is resolved by trying, in order: identity, the direct table entry,
//! the inverse of the reverse entry, and finally a bridge through the pivot
//! currency. Non-identity results get a small cosmetic perturbation so the
//! numbers look like a live market; nothing here makes accuracy claims.
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Currency used to bridge pairs with no direct or reverse table entry.
pub const PIVOT_CURRENCY: &str = "USD";

/// Decimal places kept on every resolved rate.
const RATE_PRECISION: i32 = 6;

const BUILTIN_RATES: &[(&str, &str, f64)] = &[
    ("USD", "CNY", 7.314),
    ("USD", "EUR", 0.85),
    ("USD", "JPY", 150.3),
    ("USD", "GBP", 0.78),
    ("USD", "KRW", 1320.5),
    ("USD", "AUD", 1.52),
    ("USD", "CAD", 1.35),
    ("USD", "CHF", 0.88),
    ("USD", "SGD", 1.35),
    ("EUR", "CNY", 8.53),
    ("EUR", "JPY", 177.4),
    ("EUR", "GBP", 0.92),
    ("GBP", "CNY", 9.28),
    ("JPY", "CNY", 0.048),
    ("CNY", "JPY", 20.73),
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateError {
    #[error("Invalid currency code: '{0}'")]
    InvalidCode(String),
    #[error("Invalid currency pair key: '{0}' (expected FROM-TO)")]
    InvalidPairKey(String),
    #[error("Invalid rate {rate} for {pair}: rates must be positive and finite")]
    InvalidRate { pair: String, rate: f64 },
    #[error("Unsupported currency pair: {from} -> {to}")]
    UnsupportedPair { from: String, to: String },
}

/// How a resolved rate was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// `from == to`, always exactly 1.
    Local,
    /// Direct or inverted table entry.
    Table,
    /// Derived through the pivot currency.
    Bridged,
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Provenance::Local => "local",
            Provenance::Table => "table",
            Provenance::Bridged => "bridged",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub rate: f64,
    pub observed_at: DateTime<Utc>,
    pub provenance: Provenance,
}

fn pair_key(from: &str, to: &str) -> String {
    format!("{from}-{to}")
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Known direct exchange rates keyed by ordered pair (`"USD-CNY"`).
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table shipped with the application.
    pub fn builtin() -> Self {
        let rates = BUILTIN_RATES
            .iter()
            .map(|(from, to, rate)| (pair_key(from, to), *rate))
            .collect();
        Self { rates }
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: f64) -> Result<(), RateError> {
        for code in [from, to] {
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(RateError::InvalidCode(code.to_string()));
            }
        }
        let key = pair_key(from, to);
        if !rate.is_finite() || rate <= 0.0 {
            return Err(RateError::InvalidRate { pair: key, rate });
        }
        self.rates.insert(key, rate);
        Ok(())
    }

    /// Inserts a rate keyed as `"FROM-TO"`, the format used in config files.
    pub fn insert_key(&mut self, key: &str, rate: f64) -> Result<(), RateError> {
        match key.split_once('-') {
            Some((from, to)) if !from.is_empty() && !to.is_empty() => {
                self.insert(from, to, rate).map_err(|e| match e {
                    RateError::InvalidCode(_) => RateError::InvalidPairKey(key.to_string()),
                    other => other,
                })
            }
            _ => Err(RateError::InvalidPairKey(key.to_string())),
        }
    }

    pub fn direct(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(&pair_key(from, to)).copied()
    }

    pub fn reverse(&self, from: &str, to: &str) -> Option<f64> {
        self.direct(to, from).map(|rate| 1.0 / rate)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// One leg of a bridge: identity, direct entry or inverted reverse entry.
    fn leg(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.direct(from, to).or_else(|| self.reverse(from, to))
    }
}

/// Source of the cosmetic perturbation applied to non-identity rates.
pub trait Jitter: Send + Sync {
    /// Multiplier for a base rate observed at `at`; stays within `1 ± 0.01`.
    fn factor(&self, at: DateTime<Utc>) -> f64;
}

/// Slow sine wave over time plus a uniform random term, each bounded by ±0.5%.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketJitter;

impl MarketJitter {
    const WAVE_AMPLITUDE: f64 = 0.005;
    const NOISE_AMPLITUDE: f64 = 0.005;
    const WAVE_PERIOD_SECS: f64 = 3600.0;
}

impl Jitter for MarketJitter {
    fn factor(&self, at: DateTime<Utc>) -> f64 {
        let secs = at.timestamp_millis() as f64 / 1000.0;
        let wave =
            (secs * std::f64::consts::TAU / Self::WAVE_PERIOD_SECS).sin() * Self::WAVE_AMPLITUDE;
        let noise =
            rand::thread_rng().gen_range(-Self::NOISE_AMPLITUDE..=Self::NOISE_AMPLITUDE);
        1.0 + wave + noise
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn factor(&self, _at: DateTime<Utc>) -> f64 {
        1.0
    }
}

struct Lookup {
    base: f64,
    provenance: Provenance,
    /// A bridge leg had no table entry and fell back to 1.
    defaulted: bool,
}

type LookupStrategy = fn(&RateTable, &str, &str) -> Option<Lookup>;

fn lookup_direct(table: &RateTable, from: &str, to: &str) -> Option<Lookup> {
    table.direct(from, to).map(|base| Lookup {
        base,
        provenance: Provenance::Table,
        defaulted: false,
    })
}

fn lookup_reverse(table: &RateTable, from: &str, to: &str) -> Option<Lookup> {
    table.reverse(from, to).map(|base| Lookup {
        base,
        provenance: Provenance::Table,
        defaulted: false,
    })
}

fn lookup_bridged(table: &RateTable, from: &str, to: &str) -> Option<Lookup> {
    let to_pivot = table.leg(from, PIVOT_CURRENCY);
    let from_pivot = table.leg(PIVOT_CURRENCY, to);
    Some(Lookup {
        base: to_pivot.unwrap_or(1.0) * from_pivot.unwrap_or(1.0),
        provenance: Provenance::Bridged,
        defaulted: to_pivot.is_none() || from_pivot.is_none(),
    })
}

const LOOKUP_CHAIN: &[LookupStrategy] = &[lookup_direct, lookup_reverse, lookup_bridged];

/// Resolves exchange rates against a [`RateTable`].
#[derive(Clone)]
pub struct RateResolver {
    table: Arc<RateTable>,
    jitter: Arc<dyn Jitter>,
}

impl RateResolver {
    pub fn new(table: RateTable, jitter: Arc<dyn Jitter>) -> Self {
        Self {
            table: Arc::new(table),
            jitter,
        }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Resolves `from -> to`. Never fails: a pair unknown in every direction
    /// resolves through the bridge with each missing leg counted as 1.
    pub fn resolve(&self, from: &str, to: &str) -> ResolvedRate {
        self.resolve_inner(from, to).0
    }

    /// Like [`resolve`](Self::resolve) but rejects pairs whose bridge had to
    /// fall back to the neutral rate.
    pub fn try_resolve(&self, from: &str, to: &str) -> Result<ResolvedRate, RateError> {
        match self.resolve_inner(from, to) {
            (_, true) => Err(RateError::UnsupportedPair {
                from: from.to_string(),
                to: to.to_string(),
            }),
            (resolved, false) => Ok(resolved),
        }
    }

    fn resolve_inner(&self, from: &str, to: &str) -> (ResolvedRate, bool) {
        let observed_at = Utc::now();
        if from == to {
            return (
                ResolvedRate {
                    rate: 1.0,
                    observed_at,
                    provenance: Provenance::Local,
                },
                false,
            );
        }

        let lookup = LOOKUP_CHAIN
            .iter()
            .find_map(|strategy| strategy(&self.table, from, to))
            .unwrap_or(Lookup {
                base: 1.0,
                provenance: Provenance::Bridged,
                defaulted: true,
            });

        let perturbed = lookup.base * self.jitter.factor(observed_at);
        let rounded = round_to(perturbed, RATE_PRECISION);
        // Tiny rates can round to zero; keep them positive.
        let rate = if rounded > 0.0 { rounded } else { perturbed };
        debug!(
            "Resolved {from}->{to}: base {} ({}{}), rate {rate}",
            lookup.base,
            lookup.provenance,
            if lookup.defaulted { ", defaulted leg" } else { "" }
        );

        (
            ResolvedRate {
                rate,
                observed_at,
                provenance: lookup.provenance,
            },
            lookup.defaulted,
        )
    }
}

impl Default for RateResolver {
    fn default() -> Self {
        Self::new(RateTable::builtin(), Arc::new(MarketJitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JITTER_BOUND: f64 = 0.01;

    fn exact_resolver() -> RateResolver {
        RateResolver::new(RateTable::builtin(), Arc::new(NoJitter))
    }

    fn within(actual: f64, expected: f64, relative: f64) -> bool {
        // Half a unit in the sixth decimal covers rounding of small rates
        (actual - expected).abs() <= expected.abs() * relative + 5e-7
    }

    #[test]
    fn test_identity_is_exact_and_local() {
        let resolver = RateResolver::default();
        for code in ["USD", "CNY", "KRW", "XYZ"] {
            for _ in 0..20 {
                let resolved = resolver.resolve(code, code);
                assert_eq!(resolved.rate, 1.0);
                assert_eq!(resolved.provenance, Provenance::Local);
            }
        }
    }

    #[test]
    fn test_direct_table_entry() {
        let resolved = exact_resolver().resolve("USD", "CNY");
        assert_eq!(resolved.rate, 7.314);
        assert_eq!(resolved.provenance, Provenance::Table);
    }

    #[test]
    fn test_direct_entry_wins_over_reverse() {
        // Both CNY-JPY and JPY-CNY exist and disagree slightly
        let resolved = exact_resolver().resolve("CNY", "JPY");
        assert_eq!(resolved.rate, 20.73);
        assert_eq!(resolved.provenance, Provenance::Table);
    }

    #[test]
    fn test_reverse_entry_is_inverted() {
        let resolved = exact_resolver().resolve("CNY", "USD");
        assert_eq!(resolved.provenance, Provenance::Table);
        assert_eq!(resolved.rate, round_to(1.0 / 7.314, 6));
    }

    #[test]
    fn test_bridged_through_pivot() {
        let resolved = exact_resolver().resolve("KRW", "SGD");
        assert_eq!(resolved.provenance, Provenance::Bridged);
        assert_eq!(resolved.rate, round_to((1.0 / 1320.5) * 1.35, 6));

        let resolved = exact_resolver().resolve("AUD", "CHF");
        assert_eq!(resolved.provenance, Provenance::Bridged);
        assert_eq!(resolved.rate, round_to((1.0 / 1.52) * 0.88, 6));
    }

    #[test]
    fn test_unknown_pair_defaults_to_neutral_rate() {
        let resolver = exact_resolver();
        let resolved = resolver.resolve("XYZ", "ABC");
        assert_eq!(resolved.rate, 1.0);
        assert_eq!(resolved.provenance, Provenance::Bridged);

        // One known leg keeps its value
        let resolved = resolver.resolve("XYZ", "CNY");
        assert_eq!(resolved.rate, 7.314);
        assert_eq!(resolved.provenance, Provenance::Bridged);
    }

    #[test]
    fn test_try_resolve_rejects_defaulted_bridge() {
        let resolver = exact_resolver();
        assert_eq!(
            resolver.try_resolve("XYZ", "CNY"),
            Err(RateError::UnsupportedPair {
                from: "XYZ".to_string(),
                to: "CNY".to_string()
            })
        );
        assert!(resolver.try_resolve("KRW", "SGD").is_ok());
        assert!(resolver.try_resolve("XYZ", "XYZ").is_ok());
        // The pivot itself is an identity leg, not a missing one
        assert!(resolver.try_resolve("USD", "SGD").is_ok());
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let resolver = RateResolver::default();
        for _ in 0..200 {
            let resolved = resolver.resolve("USD", "CNY");
            assert!(within(resolved.rate, 7.314, JITTER_BOUND), "{}", resolved.rate);
            assert_eq!(resolved.provenance, Provenance::Table);
        }
    }

    #[test]
    fn test_market_jitter_factor_bounds() {
        let jitter = MarketJitter;
        let start = Utc::now();
        for minutes in 0..240 {
            let factor = jitter.factor(start + chrono::Duration::minutes(minutes));
            assert!((factor - 1.0).abs() <= JITTER_BOUND + 1e-12, "{factor}");
        }
    }

    #[test]
    fn test_symmetry_from_same_entry() {
        let resolver = RateResolver::default();
        for (a, b) in [("USD", "EUR"), ("GBP", "CNY"), ("USD", "KRW")] {
            let product = resolver.resolve(a, b).rate * resolver.resolve(b, a).rate;
            assert!(within(product, 1.0, 2.0 * JITTER_BOUND + 0.001), "{a}/{b}: {product}");
        }
    }

    #[test]
    fn test_triangulation_consistency() {
        let resolver = RateResolver::default();
        let bridged = resolver.resolve("KRW", "SGD").rate;
        let legs = resolver.resolve("KRW", "USD").rate * resolver.resolve("USD", "SGD").rate;
        assert!(within(bridged, legs, 3.0 * JITTER_BOUND + 0.001), "{bridged} vs {legs}");
    }

    #[test]
    fn test_results_are_well_formed() {
        let resolver = RateResolver::default();
        let before = Utc::now();
        for (from, to) in [("USD", "CNY"), ("KRW", "SGD"), ("XYZ", "ABC"), ("JPY", "CNY")] {
            let resolved = resolver.resolve(from, to);
            assert!(resolved.rate > 0.0 && resolved.rate.is_finite());
            assert!(resolved.observed_at >= before);
            assert_eq!(round_to(resolved.rate, 6), resolved.rate);
        }
    }

    #[test]
    fn test_table_insert_validation() {
        let mut table = RateTable::new();
        assert!(table.is_empty());
        table.insert("USD", "HKD", 7.8).unwrap();
        assert_eq!(table.direct("USD", "HKD"), Some(7.8));

        assert!(matches!(
            table.insert("USD", "HKD", 0.0),
            Err(RateError::InvalidRate { .. })
        ));
        assert!(matches!(
            table.insert("USD", "HKD", f64::NAN),
            Err(RateError::InvalidRate { .. })
        ));
        assert!(matches!(
            table.insert("", "HKD", 1.0),
            Err(RateError::InvalidCode(_))
        ));

        table.insert_key("EUR-HKD", 9.1).unwrap();
        assert_eq!(table.direct("EUR", "HKD"), Some(9.1));
        for key in ["EURHKD", "EUR-", "-HKD", "EUR-HK-D"] {
            assert_eq!(
                table.insert_key(key, 1.0),
                Err(RateError::InvalidPairKey(key.to_string()))
            );
        }
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_tiny_rates_stay_positive() {
        let mut table = RateTable::new();
        table.insert("AAA", "BBB", 1e-9).unwrap();
        let resolved = RateResolver::new(table, Arc::new(NoJitter)).resolve("AAA", "BBB");
        assert!(resolved.rate > 0.0);
    }
}
