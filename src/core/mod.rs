//! Core business logic abstractions

pub mod config;
pub mod conversion;
pub mod currency;
pub mod log;
pub mod profile;
pub mod rate;
pub mod session;
pub mod store;
pub mod trend;

// Re-export main types for cleaner imports
pub use currency::{CurrencyCode, CurrencyRateProvider};
pub use rate::{Provenance, RateResolver, RateTable, ResolvedRate};
pub use session::{Session, SessionManager};
