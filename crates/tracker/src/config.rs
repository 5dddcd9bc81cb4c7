//! Tracker configuration (`ifta.toml`).
//!
//! Every field is optional. Secrets and the provider timeout can also come
//! from the environment:
//!
//! - `IFTA_ROUTING_API_KEY`: routing provider API key
//! - `IFTA_ROUTING_TIMEOUT_SECS`: bounded provider timeout
//!
//! Environment values override the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ifta_engine::{ApportionPolicy, Coordinate};
use ifta_storage::{JsonDirLegStore, LegStore, MemoryLegStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::provider::{HereRoutingProvider, RoutingProvider, StaticRouteProvider};

pub const API_KEY_ENV: &str = "IFTA_ROUTING_API_KEY";
pub const TIMEOUT_ENV: &str = "IFTA_ROUTING_TIMEOUT_SECS";

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ifta.toml";

pub const DEFAULT_BASE_URL: &str = "https://router.hereapi.com/v8";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub routing: RoutingConfig,
    pub terminal: Option<TerminalConfig>,
    pub policy: ApportionPolicy,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Here,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Saved response served by the static provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            provider: ProviderKind::Here,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fixture: None,
        }
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fixed terminal coordinate used as every deadhead return's destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the JSON store; in-memory when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl TrackerConfig {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// `./ifta.toml` is used if present, otherwise defaults. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, TrackerError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    TrackerConfig::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(raw: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig =
            toml::from_str(raw).map_err(|e| TrackerError::Config(e.to_string()))?;
        config.validate_policy()?;
        Ok(config)
    }

    /// Both tolerances are ratios and must lie in `[0, 1]`.
    pub fn validate_policy(&self) -> Result<(), TrackerError> {
        let tolerances = [
            ("policy.coverage_tolerance", self.policy.coverage_tolerance),
            (
                "policy.reconciliation_tolerance",
                self.policy.reconciliation_tolerance,
            ),
        ];
        for (name, value) in tolerances {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(TrackerError::Config(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), TrackerError> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.routing.api_key = Some(key);
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.routing.timeout_secs = raw.trim().parse().map_err(|_| {
                TrackerError::Config(format!("{TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Terminal coordinate, validated.
    pub fn terminal_coordinate(&self) -> Result<Option<Coordinate>, TrackerError> {
        match self.terminal {
            Some(t) => Ok(Some(Coordinate::new(t.latitude, t.longitude)?)),
            None => Ok(None),
        }
    }

    /// Build the configured routing provider.
    pub fn build_provider(&self) -> Result<Arc<dyn RoutingProvider>, TrackerError> {
        self.validate_policy()?;
        if self.routing.timeout_secs == 0 {
            return Err(TrackerError::Config(
                "routing.timeout_secs must be greater than zero".to_string(),
            ));
        }
        match self.routing.provider {
            ProviderKind::Here => Ok(Arc::new(HereRoutingProvider::new(&self.routing)?)),
            ProviderKind::Static => {
                let fixture = self.routing.fixture.as_ref().ok_or_else(|| {
                    TrackerError::Config(
                        "routing.fixture is required for the static provider".to_string(),
                    )
                })?;
                Ok(Arc::new(StaticRouteProvider::from_file(fixture)?))
            }
        }
    }

    /// Open the configured leg store.
    pub async fn open_store(&self) -> Result<Arc<dyn LegStore>, TrackerError> {
        match &self.storage.data_dir {
            Some(dir) => {
                log::info!("using JSON leg store at {}", dir.display());
                Ok(Arc::new(JsonDirLegStore::open(dir.clone()).await?))
            }
            None => {
                log::info!("using in-memory leg store");
                Ok(Arc::new(MemoryLegStore::new()))
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    #[test]
    fn empty_file_yields_defaults() {
        let config = TrackerConfig::from_toml("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.routing.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.routing.timeout_secs, 15);
        assert_eq!(
            config.policy.coverage_tolerance,
            Decimal::from_str("0.005").unwrap()
        );
    }

    #[test]
    fn parses_all_sections() {
        let config = TrackerConfig::from_toml(
            r#"
            [routing]
            provider = "static"
            fixture = "route.json"
            timeout_secs = 5

            [terminal]
            latitude = 35.4676
            longitude = -97.5164

            [policy]
            coverage_tolerance = "0.01"
            reconciliation_tolerance = "0.05"

            [storage]
            data_dir = ".ifta"
            "#,
        )
        .unwrap();
        assert_eq!(config.routing.provider, ProviderKind::Static);
        assert_eq!(config.routing.fixture, Some(PathBuf::from("route.json")));
        assert_eq!(config.routing.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.policy.reconciliation_tolerance,
            Decimal::from_str("0.05").unwrap()
        );
        assert_eq!(config.storage.data_dir, Some(PathBuf::from(".ifta")));
        let terminal = config.terminal_coordinate().unwrap().unwrap();
        assert_eq!(terminal.latitude, 35.4676);
    }

    #[test]
    fn unknown_provider_rejected() {
        let result = TrackerConfig::from_toml("[routing]\nprovider = \"carrier-pigeon\"\n");
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn env_overrides_file() {
        let mut config =
            TrackerConfig::from_toml("[routing]\napi_key = \"from-file\"\ntimeout_secs = 30\n")
                .unwrap();
        let env: HashMap<&str, &str> =
            HashMap::from([(API_KEY_ENV, "from-env"), (TIMEOUT_ENV, "7")]);
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.routing.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.routing.timeout_secs, 7);
    }

    #[test]
    fn bad_timeout_env_is_config_error() {
        let mut config = TrackerConfig::default();
        let result = config.apply_env(|k| (k == TIMEOUT_ENV).then(|| "soon".to_string()));
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn here_provider_without_key_is_config_error() {
        if std::env::var(API_KEY_ENV).is_ok() {
            return;
        }
        let config = TrackerConfig::default();
        assert!(matches!(
            config.build_provider(),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn static_provider_requires_fixture() {
        let mut config = TrackerConfig::default();
        config.routing.provider = ProviderKind::Static;
        assert!(matches!(
            config.build_provider(),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn out_of_range_tolerances_rejected() {
        for policy in [
            "coverage_tolerance = \"-0.01\"",
            "coverage_tolerance = \"1.5\"",
            "reconciliation_tolerance = \"-1\"",
            "reconciliation_tolerance = \"2\"",
        ] {
            let result = TrackerConfig::from_toml(&format!("[policy]\n{policy}\n"));
            assert!(matches!(result, Err(TrackerError::Config(_))), "{policy}");
        }
        let edges = TrackerConfig::from_toml(
            "[policy]\ncoverage_tolerance = \"0\"\nreconciliation_tolerance = \"1\"\n",
        );
        assert!(edges.is_ok());
    }

    #[test]
    fn provider_refused_for_programmatic_bad_policy() {
        let mut config = TrackerConfig::default();
        config.routing.provider = ProviderKind::Static;
        config.routing.fixture = Some(PathBuf::from("unused.json"));
        config.policy.coverage_tolerance = Decimal::NEGATIVE_ONE;
        let err = config.build_provider().err().unwrap();
        assert!(err.to_string().contains("policy.coverage_tolerance"), "{err}");
    }

    #[test]
    fn invalid_terminal_rejected() {
        let mut config = TrackerConfig::default();
        config.terminal = Some(TerminalConfig {
            latitude: 120.0,
            longitude: 0.0,
        });
        assert!(config.terminal_coordinate().is_err());
    }
}
