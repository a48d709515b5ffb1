//! Background health poller.
//!
//! A fixed list of endpoints is loaded once at startup. Each cycle probes
//! `<url>/healthcheck` for every entry in turn and overwrites that entry's
//! status and timestamp. Readers take [`HealthPoller::snapshot`], which copies
//! the list under a shared lock and never waits on a probe.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};

use vhub_core::types::{HealthState, HealthStatus};

use crate::config::HealthCheckEntry;
use crate::error::DaemonError;

/// Shared handle to the poller state. Clone freely.
#[derive(Clone)]
pub struct HealthPoller {
    statuses: Arc<RwLock<Vec<HealthStatus>>>,
    agent: ureq::Agent,
}

impl HealthPoller {
    /// Every entry starts as [`HealthState::Unknown`] with no timestamp.
    pub fn new(entries: &[HealthCheckEntry], probe_timeout: Duration) -> Self {
        let statuses = entries
            .iter()
            .map(|entry| HealthStatus {
                region: entry.region.clone(),
                environment: entry.environment.clone(),
                url: entry.url.clone(),
                status: HealthState::Unknown,
                last_checked: None,
            })
            .collect();
        let agent = ureq::AgentBuilder::new().timeout(probe_timeout).build();
        Self {
            statuses: Arc::new(RwLock::new(statuses)),
            agent,
        }
    }

    /// Independent copy of the current status list, in configured order.
    pub async fn snapshot(&self) -> Vec<HealthStatus> {
        self.statuses.read().await.clone()
    }

    /// Probe every entry once.
    ///
    /// Probes run on the blocking pool without holding the lock; each result
    /// is written back as a single replacement of that entry's fields.
    pub async fn run_cycle(&self) {
        let urls: Vec<String> = self
            .statuses
            .read()
            .await
            .iter()
            .map(|s| s.url.clone())
            .collect();

        for (index, url) in urls.into_iter().enumerate() {
            let agent = self.agent.clone();
            let probe_url = url.clone();
            let state = match tokio::task::spawn_blocking(move || probe(&agent, &probe_url)).await
            {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "health probe task failed");
                    HealthState::Fail
                }
            };

            let mut statuses = self.statuses.write().await;
            if let Some(entry) = statuses.get_mut(index) {
                entry.status = state;
                entry.last_checked = Some(Utc::now());
            }
        }
    }

    /// Run a cycle now, then one every `interval`, until shutdown.
    pub async fn run(
        self,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), DaemonError> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = self.run_cycle() => {
                    let summary = self.snapshot().await;
                    let failing = summary.iter().filter(|s| s.status == HealthState::Fail).count();
                    tracing::debug!(endpoints = summary.len(), failing, "health cycle complete");
                }
            }
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        Ok(())
    }
}

/// Blocking GET of `<url>/healthcheck`. Only a 2xx answer counts as healthy.
pub fn probe(agent: &ureq::Agent, url: &str) -> HealthState {
    let target = healthcheck_url(url);
    match agent.get(&target).call() {
        Ok(response) if (200..300).contains(&response.status()) => HealthState::Ok,
        Ok(response) => {
            tracing::warn!(url = %target, status = response.status(), "health check failed");
            HealthState::Fail
        }
        Err(ureq::Error::Status(code, _)) => {
            tracing::warn!(url = %target, status = code, "health check failed");
            HealthState::Fail
        }
        Err(err) => {
            tracing::warn!(url = %target, error = %err, "health check unreachable");
            HealthState::Fail
        }
    }
}

fn healthcheck_url(url: &str) -> String {
    format!("{}/healthcheck", url.trim().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/up/healthcheck", get(|| async { "ok" }))
            .route(
                "/down/healthcheck",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn entry(region: &str, url: String) -> HealthCheckEntry {
        HealthCheckEntry {
            region: region.to_string(),
            environment: "dev".to_string(),
            url,
        }
    }

    #[test]
    fn healthcheck_url_strips_trailing_slash() {
        assert_eq!(healthcheck_url("http://a:1/"), "http://a:1/healthcheck");
        assert_eq!(healthcheck_url("http://a:1"), "http://a:1/healthcheck");
    }

    #[tokio::test]
    async fn new_poller_reports_unknown() {
        let poller = HealthPoller::new(
            &[entry("amer", "http://127.0.0.1:1".into())],
            Duration::from_secs(1),
        );
        let snapshot = poller.snapshot().await;
        assert_eq!(snapshot[0].status, HealthState::Unknown);
        assert!(snapshot[0].last_checked.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_cycle_marks_ok_and_fail() {
        let base = spawn_stub().await;
        let poller = HealthPoller::new(
            &[
                entry("amer", format!("{base}/up")),
                entry("emea", format!("{base}/down/")),
                entry("apac", "http://127.0.0.1:1".into()),
            ],
            Duration::from_secs(2),
        );
        poller.run_cycle().await;

        let snapshot = poller.snapshot().await;
        let states: Vec<_> = snapshot.iter().map(|s| s.status).collect();
        assert_eq!(
            states,
            [HealthState::Ok, HealthState::Fail, HealthState::Fail]
        );
        assert!(snapshot.iter().all(|s| s.last_checked.is_some()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshot_is_detached_from_later_cycles() {
        let base = spawn_stub().await;
        let poller = HealthPoller::new(&[entry("amer", format!("{base}/up"))], Duration::from_secs(2));
        let before = poller.snapshot().await;
        poller.run_cycle().await;
        assert_eq!(before[0].status, HealthState::Unknown);
        assert_eq!(poller.snapshot().await[0].status, HealthState::Ok);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_stops_on_shutdown() {
        let base = spawn_stub().await;
        let poller = HealthPoller::new(&[entry("amer", format!("{base}/up"))], Duration::from_secs(2));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(poller.clone().run(Duration::from_secs(3600), shutdown_rx));

        // The first cycle runs without waiting for the interval.
        let mut ticks = 0;
        while poller.snapshot().await[0].last_checked.is_none() && ticks < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ticks += 1;
        }
        assert_eq!(poller.snapshot().await[0].status, HealthState::Ok);

        shutdown_tx.send(()).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller exits")
            .expect("join")
            .expect("run result");
    }
}
