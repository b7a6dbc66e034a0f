use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use common::{DEFAULT_AUTO_RELEASE_HOURS, Escrow, InMemoryStore, JsonFileStore, TransactionStore};

use crate::state::AppState;

pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub store_path: Option<String>,
    pub auto_release_hours: i64,
    pub release_check_secs: u64,
    pub public_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_value("PORT", lookup("PORT"), 8080)?;

        let store_path = lookup("STORE_PATH").filter(|path| !path.trim().is_empty());

        let auto_release_hours = parse_value(
            "AUTO_RELEASE_HOURS",
            lookup("AUTO_RELEASE_HOURS"),
            DEFAULT_AUTO_RELEASE_HOURS,
        )?;
        if auto_release_hours <= 0 {
            anyhow::bail!("AUTO_RELEASE_HOURS must be positive, got {auto_release_hours}");
        }

        let release_check_secs =
            parse_value("RELEASE_CHECK_SECS", lookup("RELEASE_CHECK_SECS"), 60)?;
        if release_check_secs == 0 {
            anyhow::bail!("RELEASE_CHECK_SECS must be positive");
        }

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "https://depayit.com".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bind_address,
            port,
            store_path,
            auto_release_hours,
            release_check_secs,
            public_base_url,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        let store: Arc<dyn TransactionStore> = match &self.store_path {
            Some(path) => {
                let store = JsonFileStore::open(path)
                    .await
                    .with_context(|| format!("Failed to open transaction store `{}`", path))?;
                log::info!("Using JSON file store at {}", path);
                Arc::new(store)
            }
            None => {
                log::warn!("STORE_PATH not set, transactions are kept in memory only");
                Arc::new(InMemoryStore::new())
            }
        };

        let escrow = Escrow::new(store, chrono::Duration::hours(self.auto_release_hours));
        Ok(AppState::new(escrow, &self.public_base_url))
    }
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got `{}`", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_path, None);
        assert_eq!(config.auto_release_hours, DEFAULT_AUTO_RELEASE_HOURS);
        assert_eq!(config.release_check_secs, 60);
        assert_eq!(config.public_base_url, "https://depayit.com");
    }

    #[test]
    fn reads_supplied_values() {
        let config = config_from(&[
            ("BIND_ADDRESS", "0.0.0.0"),
            ("PORT", " 9090 "),
            ("STORE_PATH", "data/transactions.json"),
            ("AUTO_RELEASE_HOURS", "72"),
            ("RELEASE_CHECK_SECS", "5"),
            ("PUBLIC_BASE_URL", "https://escrow.example/"),
        ])
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.store_path.as_deref(), Some("data/transactions.json"));
        assert_eq!(config.auto_release_hours, 72);
        assert_eq!(config.release_check_secs, 5);
        assert_eq!(config.public_base_url, "https://escrow.example");
    }

    #[test]
    fn blank_store_path_means_memory_store() {
        let config = config_from(&[("STORE_PATH", "  ")]).unwrap();
        assert_eq!(config.store_path, None);
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).err().unwrap();
        assert!(err.to_string().contains("PORT"));

        assert!(config_from(&[("PORT", "70000")]).is_err());
        assert!(config_from(&[("RELEASE_CHECK_SECS", "-5")]).is_err());
    }

    #[test]
    fn non_positive_windows_are_rejected() {
        for hours in ["0", "-1"] {
            let err = config_from(&[("AUTO_RELEASE_HOURS", hours)]).err().unwrap();
            assert!(err.to_string().contains("AUTO_RELEASE_HOURS"));
        }
        let err = config_from(&[("RELEASE_CHECK_SECS", "0")]).err().unwrap();
        assert!(err.to_string().contains("RELEASE_CHECK_SECS"));
    }

    #[tokio::test]
    async fn store_path_selects_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = config_from(&[("STORE_PATH", path.to_str().unwrap())]).unwrap();

        let state = config.create_app_state().await.unwrap();
        assert!(state.escrow.list().await.unwrap().is_empty());
        assert!(path.exists());
    }
}
