//! Amount conversion and the conversion history record
use crate::core::session::Session;
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `conversion_history` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub from_amount: f64,
    pub to_amount: f64,
    pub exchange_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Converts `amount` at `rate`, rounded to cents.
pub fn convert_amount(amount: f64, rate: f64) -> f64 {
    (amount * rate * 100.0).round() / 100.0
}

pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        bail!("Amount must be a non-negative number, got {amount}");
    }
    Ok(amount)
}

#[async_trait]
pub trait ConversionStore: Send + Sync {
    async fn insert_conversion(&self, session: &Session, record: &ConversionRecord) -> Result<()>;
    async fn list_conversions(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<ConversionRecord>>;
}
