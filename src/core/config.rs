use crate::core::rate::RateTable;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            from: "USD".to_string(),
            to: "CNY".to_string(),
            amount: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RatesConfig {
    /// Apply the cosmetic market perturbation to resolved rates.
    pub jitter: bool,
    /// Reject pairs that cannot be bridged instead of defaulting to 1.
    pub strict: bool,
    /// Simulated lookup latency in milliseconds.
    pub latency_ms: u64,
    /// Extra or replacement table entries keyed as `FROM-TO`.
    pub overrides: BTreeMap<String, f64>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            jitter: true,
            strict: false,
            latency_ms: 0,
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    pub supabase: Option<SupabaseConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The built-in rate table with the configured overrides applied.
    pub fn rate_table(&self) -> Result<RateTable> {
        let mut table = RateTable::builtin();
        for (key, rate) in &self.rates.overrides {
            table
                .insert_key(key, *rate)
                .with_context(|| format!("Invalid rate override '{key}'"))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
defaults:
  from: "EUR"
  to: "JPY"
  amount: 250.0
rates:
  jitter: false
  latency_ms: 300
  overrides:
    USD-HKD: 7.8
    USD-CNY: 7.25
providers:
  supabase:
    url: "https://project.supabase.co"
    anon_key: "anon"
data_path: "/tmp/xrate"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.defaults.from, "EUR");
        assert_eq!(config.defaults.to, "JPY");
        assert_eq!(config.defaults.amount, 250.0);
        assert!(!config.rates.jitter);
        // Unset fields keep their defaults
        assert!(!config.rates.strict);
        assert_eq!(config.rates.latency_ms, 300);
        assert_eq!(config.rates.overrides.len(), 2);
        let supabase = config.providers.supabase.as_ref().unwrap();
        assert_eq!(supabase.url, "https://project.supabase.co");
        assert_eq!(supabase.anon_key, "anon");
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/xrate")
        );

        let table = config.rate_table().unwrap();
        assert_eq!(table.direct("USD", "HKD"), Some(7.8));
        assert_eq!(table.direct("USD", "CNY"), Some(7.25));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.defaults.from, "USD");
        assert_eq!(config.defaults.to, "CNY");
        assert_eq!(config.defaults.amount, 100.0);
        assert!(config.rates.jitter);
        assert!(config.providers.supabase.is_none());
        assert_eq!(
            config.rate_table().unwrap().len(),
            RateTable::builtin().len()
        );
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("defaults: { from: GBP }").expect("Failed to deserialize");
        assert_eq!(config.defaults.from, "GBP");
        assert_eq!(config.defaults.to, "CNY");
        assert_eq!(config.defaults.amount, 100.0);
        assert_eq!(config.rates, RatesConfig::default());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let yaml_str = r#"
rates:
  overrides:
    USDHKD: 7.8
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        let err = config.rate_table().unwrap_err();
        assert_eq!(err.to_string(), "Invalid rate override 'USDHKD'");

        let yaml_str = r#"
rates:
  overrides:
    USD-HKD: -1.0
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.rate_table().is_err());
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        fs::write(file.path(), "defaults:\n  from: GBP\n  to: USD\n  amount: 1\n")?;
        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.defaults.from, "GBP");

        let missing = AppConfig::load_from_path("/nonexistent/xrate/config.yaml");
        assert!(
            missing
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
        Ok(())
    }
}
