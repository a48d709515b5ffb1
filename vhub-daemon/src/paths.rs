use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATA_FILE: &str = "data.json";
pub const BACKUP_FILE: &str = "data.json.bak";
pub const HEALTH_CONFIG_FILE: &str = "healthcheck.json";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn vhub_root(home: &Path) -> PathBuf {
    home.join(".vhub")
}

pub fn data_path(home: &Path) -> PathBuf {
    vhub_root(home).join(DATA_FILE)
}

pub fn backup_path(home: &Path) -> PathBuf {
    vhub_root(home).join(BACKUP_FILE)
}

pub fn health_config_path(home: &Path) -> PathBuf {
    vhub_root(home).join(HEALTH_CONFIG_FILE)
}
