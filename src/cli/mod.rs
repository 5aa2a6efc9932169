pub mod account;
pub mod convert;
pub mod currencies;
pub mod history;
pub mod rates;
pub mod setup;
pub mod trend;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::conversion::ConversionStore;
use crate::core::currency::{CurrencyCode, CurrencyRateProvider};
use crate::core::profile::ProfileStore;
use crate::core::rate::{Jitter, MarketJitter, NoJitter, RateResolver};
use crate::core::session::{Session, SessionManager};
use crate::providers::supabase::SupabaseClient;
use crate::providers::table::TableRateProvider;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SESSION_COLLECTION: &str = "session";

/// Services shared by every command.
pub struct AppContext {
    pub config: AppConfig,
    pub rates: Arc<dyn CurrencyRateProvider>,
    pub backend: Option<Backend>,
}

/// The hosted account backend, present only when configured.
pub struct Backend {
    pub sessions: SessionManager,
    pub history: Arc<dyn ConversionStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppContext {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let jitter: Arc<dyn Jitter> = if config.rates.jitter {
            Arc::new(MarketJitter)
        } else {
            Arc::new(NoJitter)
        };
        let resolver = RateResolver::new(config.rate_table()?, jitter);
        let rates = TableRateProvider::new(resolver)
            .strict(config.rates.strict)
            .with_latency(Duration::from_millis(config.rates.latency_ms));

        let backend = match &config.providers.supabase {
            Some(supabase) => {
                let client = Arc::new(SupabaseClient::new(&supabase.url, &supabase.anon_key)?);
                let store = open_store(&config);
                let sessions = SessionManager::new(
                    client.clone(),
                    Some(client.clone()),
                    store.collection_or_memory(SESSION_COLLECTION),
                );
                sessions.start().await.context("Failed to restore session")?;
                Some(Backend {
                    sessions,
                    history: client.clone(),
                    profiles: client,
                })
            }
            None => {
                debug!("No account backend configured");
                None
            }
        };

        Ok(Self {
            config,
            rates: Arc::new(rates),
            backend,
        })
    }

    pub fn backend(&self) -> Result<&Backend> {
        self.backend.as_ref().context(
            "No account backend configured; add providers.supabase to the configuration",
        )
    }

    pub fn current_session(&self) -> Option<Session> {
        self.backend.as_ref().and_then(|b| b.sessions.current())
    }

    pub fn require_session(&self) -> Result<Session> {
        self.backend()?
            .sessions
            .current()
            .context("Not signed in; run `xrate login` first")
    }
}

/// Opens the local store under the data path. Without a usable data path
/// the session only lasts for the current command.
fn open_store(config: &AppConfig) -> KeyValueStore {
    match config.default_data_path() {
        Ok(path) => KeyValueStore::open(&path),
        Err(e) => {
            warn!("No data directory available, session will not persist: {e}");
            KeyValueStore::in_memory()
        }
    }
}

/// Parses a user-supplied currency code, upper-casing it first.
pub fn parse_code(input: &str) -> Result<CurrencyCode> {
    Ok(input.to_ascii_uppercase().parse::<CurrencyCode>()?)
}
