//! Rate provider backed by the local rate table
use crate::core::currency::CurrencyRateProvider;
use crate::core::rate::{RateResolver, ResolvedRate};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct TableRateProvider {
    resolver: RateResolver,
    strict: bool,
    latency: Duration,
}

impl TableRateProvider {
    pub fn new(resolver: RateResolver) -> Self {
        Self {
            resolver,
            strict: false,
            latency: Duration::ZERO,
        }
    }

    /// Fail on pairs that cannot be bridged instead of defaulting to 1.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Delay every lookup, mimicking a network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl CurrencyRateProvider for TableRateProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<ResolvedRate> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        debug!("Resolving rate {from} -> {to} (strict: {})", self.strict);
        if self.strict {
            Ok(self.resolver.try_resolve(from, to)?)
        } else {
            Ok(self.resolver.resolve(from, to))
        }
    }
}
