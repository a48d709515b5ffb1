use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use vhub_core::{LoadSource, Persistence, RegistryData, RegistryStore};
use vhub_renderer::Renderer;

use crate::config::{DaemonConfig, HealthCheckConfig};
use crate::error::{io_err, DaemonError};
use crate::health::HealthPoller;
use crate::http::{router, AppState};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: DaemonConfig) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon: load state, then serve HTTP alongside the periodic save and
/// health loops until ctrl-c or any task exits.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    run_until(config, shutdown_tx).await
}

/// Same as [`run`], with the shutdown channel supplied by the caller.
pub async fn run_until(
    config: DaemonConfig,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let persistence = Arc::new(Persistence::new(&config.data_file, &config.backup_file));
    let store = Arc::new(RegistryStore::new());
    load_state(&config, &persistence, &store)?;

    let renderer = Arc::new(Renderer::with_overrides(config.template_dir.as_deref())?);
    let health = start_poller(&config);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| io_err(config.listen.to_string(), e))?;
    tracing::info!(addr = %config.listen, "listening");

    let state = AppState {
        store: Arc::clone(&store),
        persistence: Arc::clone(&persistence),
        health: health.clone(),
        renderer,
    };

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        let app = router(state);
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .map_err(|e| DaemonError::Runtime(format!("http server failed: {e}")));
            let _ = shutdown.send(());
            result
        })
    };

    let save_handle = {
        let shutdown = shutdown_tx.clone();
        let store = Arc::clone(&store);
        let persistence = Arc::clone(&persistence);
        let interval = config.save_interval;
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = periodic_save_task(store, persistence, interval, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let health_handle = {
        let shutdown = shutdown_tx.clone();
        let interval = config.health_interval;
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let Some(poller) = health else {
                return Ok(());
            };
            let result = poller.run(interval, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "ctrl-c handler failed");
                            Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}")))
                        }
                    }
                }
            }
        })
    };

    let (server_result, save_result, health_result, signal_result) =
        tokio::join!(server_handle, save_handle, health_handle, signal_handle);

    // Final save runs even when a task failed.
    let final_save = save_blocking(Arc::clone(&store), Arc::clone(&persistence)).await;

    handle_join("http_server", server_result)?;
    handle_join("periodic_save", save_result)?;
    handle_join("health_poller", health_result)?;
    handle_join("signal_handler", signal_result)?;
    final_save?;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Bootstrap the files, load primary or backup, and seed on first run.
fn load_state(
    config: &DaemonConfig,
    persistence: &Persistence,
    store: &RegistryStore,
) -> Result<(), DaemonError> {
    let first_run = persistence.bootstrap()?;
    match persistence.load(store)? {
        LoadSource::Primary => {}
        LoadSource::Backup => tracing::warn!(
            primary = %persistence.primary_path().display(),
            backup = %persistence.backup_path().display(),
            "primary data file unusable, loaded backup"
        ),
    }

    if first_run && config.seed_defaults {
        store.replace(RegistryData::default_skeleton());
        persistence.save(store)?;
        tracing::info!(path = %persistence.primary_path().display(), "seeded default regions");
    }

    let (regions, environments, apps) = store.counts();
    tracing::info!(regions, environments, apps, "registry loaded");
    Ok(())
}

/// A bad or disabled health config only turns the poller off.
fn start_poller(config: &DaemonConfig) -> Option<HealthPoller> {
    let path = config.health_config.as_ref()?;
    match HealthCheckConfig::load(path) {
        Ok(hc) if hc.enable_health_check => {
            tracing::info!(endpoints = hc.health_checks.len(), "health checks enabled");
            Some(HealthPoller::new(&hc.health_checks, config.probe_timeout))
        }
        Ok(_) => {
            tracing::info!("health checks disabled by config");
            None
        }
        Err(err) => {
            tracing::error!(error = %err, "health poller not started");
            None
        }
    }
}

async fn periodic_save_task(
    store: Arc<RegistryStore>,
    persistence: Arc<Persistence>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                // Save errors keep the in-memory tree authoritative; retry next tick.
                if let Err(err) = save_blocking(Arc::clone(&store), Arc::clone(&persistence)).await {
                    tracing::error!(error = %err, "periodic save failed");
                } else {
                    tracing::debug!("periodic save complete");
                }
            }
        }
    }
    Ok(())
}

async fn save_blocking(
    store: Arc<RegistryStore>,
    persistence: Arc<Persistence>,
) -> Result<(), DaemonError> {
    tokio::task::spawn_blocking(move || persistence.save(&store))
        .await
        .map_err(|err| DaemonError::Runtime(format!("save task join error: {err}")))??;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};
    use tempfile::TempDir;
    use vhub_core::types::CreateAppOptions;

    fn config(dir: &TempDir) -> DaemonConfig {
        let mut config = DaemonConfig::for_home(dir.path());
        config.listen = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        config
    }

    #[test]
    fn first_run_seeds_skeleton() {
        let dir = TempDir::new().expect("tempdir");
        let config = config(&dir);
        let persistence = Persistence::new(&config.data_file, &config.backup_file);
        let store = RegistryStore::new();

        load_state(&config, &persistence, &store).expect("load");
        assert_eq!(store.counts(), (3, 15, 0));

        // Second start loads what is on disk and does not reseed.
        store.delete_region("apac").expect("delete");
        persistence.save(&store).expect("save");
        let reloaded = RegistryStore::new();
        load_state(&config, &persistence, &reloaded).expect("reload");
        assert_eq!(reloaded.counts(), (2, 10, 0));
    }

    #[test]
    fn no_seed_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = config(&dir);
        config.seed_defaults = false;
        let persistence = Persistence::new(&config.data_file, &config.backup_file);
        let store = RegistryStore::new();
        load_state(&config, &persistence, &store).expect("load");
        assert_eq!(store.counts(), (0, 0, 0));
    }

    #[test]
    fn unusable_files_are_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let config = config(&dir);
        std::fs::create_dir_all(config.data_file.parent().expect("parent")).expect("mkdir");
        std::fs::write(&config.data_file, "{").expect("write");
        std::fs::write(&config.backup_file, "[").expect("write");

        let persistence = Persistence::new(&config.data_file, &config.backup_file);
        let err = load_state(&config, &persistence, &RegistryStore::new()).unwrap_err();
        assert!(matches!(err, DaemonError::Persist(_)), "got: {err}");
    }

    #[test]
    fn broken_health_config_disables_poller_only() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = config(&dir);
        let path = dir.path().join("hc.json");
        std::fs::write(&path, "not json").expect("write");
        config.health_config = Some(path.clone());
        assert!(start_poller(&config).is_none());

        std::fs::write(&path, r#"{"enableHealthCheck": false, "healthChecks": []}"#)
            .expect("write");
        assert!(start_poller(&config).is_none());

        std::fs::write(
            &path,
            r#"{"enableHealthCheck": true, "healthChecks": [
                {"region": "amer", "environment": "dev", "url": "http://127.0.0.1:1"}]}"#,
        )
        .expect("write");
        assert!(start_poller(&config).is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_loop_waits_for_interval_and_final_save_writes() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = config(&dir);
        config.seed_defaults = false;
        let store = Arc::new(RegistryStore::new());
        let persistence = Arc::new(Persistence::new(&config.data_file, &config.backup_file));
        store.create_region("amer").expect("region");
        store.create_environment("amer", "dev").expect("env");
        store
            .create_app("amer", "dev", "svc", CreateAppOptions::with_version("1"))
            .expect("app");

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(periodic_save_task(
            Arc::clone(&store),
            Arc::clone(&persistence),
            Duration::from_secs(3600),
            shutdown_rx,
        ));
        shutdown_tx.send(()).expect("send");
        handle_join("periodic_save", task.await).expect("task");
        assert!(!config.data_file.exists(), "no tick before shutdown");

        save_blocking(Arc::clone(&store), Arc::clone(&persistence))
            .await
            .expect("final save");
        let raw = std::fs::read_to_string(&config.data_file).expect("read");
        assert!(raw.contains("\"svc\""));
    }

    #[tokio::test(start_paused = true)]
    async fn save_loop_writes_both_files_after_interval() {
        let dir = TempDir::new().expect("tempdir");
        let config = config(&dir);
        let store = Arc::new(RegistryStore::new());
        let persistence = Arc::new(Persistence::new(&config.data_file, &config.backup_file));
        store.create_region("amer").expect("region");
        store.create_environment("amer", "dev").expect("env");
        store
            .create_app("amer", "dev", "svc", CreateAppOptions::with_version("1"))
            .expect("app");

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(periodic_save_task(
            Arc::clone(&store),
            Arc::clone(&persistence),
            Duration::from_secs(60),
            shutdown_rx,
        ));

        // Let the task start its ticker, then stay short of the first interval.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!config.data_file.exists(), "no save before the interval");

        tokio::time::advance(Duration::from_secs(60)).await;
        let mut waited = 0;
        while !config.data_file.exists() && waited < 500 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }

        let primary = std::fs::read_to_string(&config.data_file).expect("primary");
        let backup = std::fs::read_to_string(&config.backup_file).expect("backup");
        assert!(primary.contains("\"svc\""), "got: {primary}");
        assert_eq!(primary, backup);

        shutdown_tx.send(()).expect("send");
        handle_join("periodic_save", task.await).expect("task");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_until_stops_on_broadcast() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = config(&dir);
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("free port")
            .port();
        config.listen = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let data_file = config.data_file.clone();
        let (shutdown_tx, _) = broadcast::channel(16);
        let handle = tokio::spawn(run_until(config, shutdown_tx.clone()));

        let mut waited = 0;
        while tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err() && waited < 250 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        shutdown_tx.send(()).expect("send");

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("daemon exits")
            .expect("join")
            .expect("run result");
        let raw = std::fs::read_to_string(&data_file).expect("read");
        assert!(raw.contains("\"amer\""));
    }
}
