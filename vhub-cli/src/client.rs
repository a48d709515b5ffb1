//! Blocking HTTP client for a running `vhub serve`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// `--server` flag shared by every client subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Base URL of the vhub server.
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
}

impl ServerArgs {
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.server)
    }
}

pub struct ApiClient {
    base: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(server: &str) -> Self {
        Self {
            base: format!("{}/api/v1", server.trim_end_matches('/')),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
        }
    }

    /// `/regions/<a>/environments/<b>/apps/<c>` with each name percent-encoded.
    pub fn app_path(region: &str, environment: &str, app: &str) -> String {
        format!(
            "/regions/{}/environments/{}/apps/{}",
            encode_segment(region),
            encode_segment(environment),
            encode_segment(app)
        )
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base);
        let response = self.agent.get(&url).call().map_err(|e| server_error(&url, e))?;
        response
            .into_json()
            .with_context(|| format!("invalid JSON from {url}"))
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base);
        let response = self
            .agent
            .put(&url)
            .send_json(body)
            .map_err(|e| server_error(&url, e))?;
        response
            .into_json()
            .with_context(|| format!("invalid JSON from {url}"))
    }
}

fn server_error(url: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let message = response
                .into_json::<serde_json::Value>()
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| "no error message".to_string());
            anyhow!("server returned {code}: {message}")
        }
        other => anyhow!(other).context(format!("could not reach {url}; is `vhub serve` running?")),
    }
}

fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_path_encodes_segments() {
        assert_eq!(
            ApiClient::app_path("amer", "dev", "svc 1"),
            "/regions/amer/environments/dev/apps/svc%201"
        );
    }

    #[test]
    fn base_url_ignores_trailing_slash() {
        let client = ApiClient::new("http://localhost:9000/");
        assert_eq!(client.base, "http://localhost:9000/api/v1");
    }
}
