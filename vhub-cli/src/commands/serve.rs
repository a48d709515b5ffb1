//! `vhub serve`: run the registry server in the foreground.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use vhub_daemon::paths::DEFAULT_PORT;
use vhub_daemon::{start_blocking, DaemonConfig};

/// Arguments for `vhub serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Primary data file [default: ~/.vhub/data.json].
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Backup data file [default: ~/.vhub/data.json.bak].
    #[arg(long)]
    pub backup_file: Option<PathBuf>,

    /// Health-check config [default: ~/.vhub/healthcheck.json, if present].
    #[arg(long)]
    pub health_config: Option<PathBuf>,

    /// Directory with `dashboard.html` / `registry.csv` template overrides.
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between periodic saves.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub save_interval: u64,

    /// Seconds between health-check cycles.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_interval: u64,

    /// Per-probe timeout in seconds.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_timeout: u64,

    /// Start with an empty tree on first run instead of the default regions.
    #[arg(long)]
    pub no_seed: bool,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let config = self.into_config(DaemonConfig::for_home(&home));
        println!(
            "vhub serving {} on http://{}",
            config.data_file.display(),
            config.listen
        );
        start_blocking(config).context("server exited with error")
    }

    fn into_config(self, mut config: DaemonConfig) -> DaemonConfig {
        if let Some(path) = self.data_file {
            // An explicit data file keeps its backup next to it.
            config.backup_file = vhub_core::persistence::backup_path_for(&path);
            config.data_file = path;
        }
        if let Some(path) = self.backup_file {
            config.backup_file = path;
        }
        if let Some(path) = self.health_config {
            config.health_config = Some(path);
        }
        config.template_dir = self.templates;
        config.listen = SocketAddr::new(self.bind, self.port);
        config.save_interval = Duration::from_secs(self.save_interval);
        config.health_interval = Duration::from_secs(self.health_interval);
        config.probe_timeout = Duration::from_secs(self.probe_timeout);
        config.seed_defaults = !self.no_seed;
        config
    }
}
