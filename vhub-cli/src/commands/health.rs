//! `vhub health`: latest health-check results.

use anyhow::Result;
use chrono::SecondsFormat;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use vhub_core::types::{HealthState, HealthStatus};

use crate::client::ServerArgs;

/// Arguments for `vhub health`.
#[derive(Args, Debug)]
pub struct HealthArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "region")]
    region: String,
    #[tabled(rename = "environment")]
    environment: String,
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "last checked")]
    last_checked: String,
}

impl HealthArgs {
    pub fn run(self) -> Result<()> {
        let statuses: Vec<HealthStatus> = self.server.client().get("/health")?;
        if statuses.is_empty() {
            println!("Health checks disabled.");
            return Ok(());
        }

        let failing = statuses
            .iter()
            .filter(|s| s.status == HealthState::Fail)
            .count();
        let rows: Vec<HealthRow> = statuses
            .into_iter()
            .map(|s| HealthRow {
                indicator: indicator(s.status),
                region: s.region,
                environment: s.environment,
                url: s.url,
                status: s.status.to_string(),
                last_checked: s
                    .last_checked
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_else(|| "never".to_string()),
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        if failing > 0 {
            println!("{}", format!("{failing} endpoint(s) failing").red().bold());
        }
        Ok(())
    }
}

fn indicator(state: HealthState) -> String {
    match state {
        HealthState::Ok => "■".green().bold().to_string(),
        HealthState::Fail => "■".red().bold().to_string(),
        HealthState::Unknown => "■".yellow().bold().to_string(),
    }
}
