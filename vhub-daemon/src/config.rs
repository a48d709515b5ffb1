//! Daemon settings and the health-check configuration file.
//!
//! ```json
//! { "enableHealthCheck": true,
//!   "healthChecks": [ { "region": "amer", "environment": "dev", "url": "http://svc1:8080" } ] }
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;
use crate::paths::{
    backup_path, data_path, health_config_path, DEFAULT_HEALTH_INTERVAL, DEFAULT_PORT,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_SAVE_INTERVAL,
};

/// Everything [`crate::run`] needs; built by the CLI from flags.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub data_file: PathBuf,
    pub backup_file: PathBuf,
    /// `None` disables health polling.
    pub health_config: Option<PathBuf>,
    /// Directory holding `dashboard.html` / `registry.csv` overrides.
    pub template_dir: Option<PathBuf>,
    pub listen: SocketAddr,
    pub save_interval: Duration,
    pub health_interval: Duration,
    pub probe_timeout: Duration,
    /// Seed the default region/environment skeleton on first run.
    pub seed_defaults: bool,
}

impl DaemonConfig {
    /// Defaults rooted at `<home>/.vhub/`. The health config is picked up only
    /// if the default file exists.
    pub fn for_home(home: &Path) -> Self {
        let health = health_config_path(home);
        Self {
            data_file: data_path(home),
            backup_file: backup_path(home),
            health_config: health.is_file().then_some(health),
            template_dir: None,
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            save_interval: DEFAULT_SAVE_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            seed_defaults: true,
        }
    }
}

/// Parsed health-check configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub enable_health_check: bool,
    #[serde(default)]
    pub health_checks: Vec<HealthCheckEntry>,
}

/// One endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckEntry {
    #[serde(alias = "Region")]
    pub region: String,
    #[serde(alias = "Environment")]
    pub environment: String,
    #[serde(alias = "URL")]
    pub url: String,
}

impl HealthCheckConfig {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let contents = std::fs::read_to_string(path).map_err(|e| DaemonError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, DaemonError> {
        let config: Self = serde_json::from_str(contents).map_err(|e| DaemonError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(entry) = config.health_checks.iter().find(|e| e.url.trim().is_empty()) {
            return Err(DaemonError::Config {
                path: path.to_path_buf(),
                reason: format!(
                    "empty url for {}/{}",
                    entry.region, entry.environment
                ),
            });
        }
        Ok(config)
    }
}
