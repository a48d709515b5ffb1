//! `vhub list`: every app with its deployed version.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use vhub_core::types::Region;

use crate::client::ServerArgs;

/// Arguments for `vhub list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show one region.
    #[arg(long)]
    pub region: Option<String>,

    /// Emit the raw region tree as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Tabled, Debug, PartialEq, Eq)]
struct AppRow {
    #[tabled(rename = "region")]
    region: String,
    #[tabled(rename = "environment")]
    environment: String,
    #[tabled(rename = "app")]
    app: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "updated")]
    date: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let client = self.server.client();
        let mut regions: Vec<Region> = client.get("/regions")?;
        if let Some(filter) = self.region.as_ref() {
            regions.retain(|r| r.name == *filter);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&regions)?);
            return Ok(());
        }

        let rows = app_rows(&regions);
        if rows.is_empty() {
            println!("No apps registered.");
            return Ok(());
        }
        let count = rows.len();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{} app(s)", count.to_string().bold());
        Ok(())
    }
}

fn app_rows(regions: &[Region]) -> Vec<AppRow> {
    let mut rows = Vec::new();
    for region in regions {
        for environment in region.environments.values() {
            for app in environment.apps.values() {
                rows.push(AppRow {
                    region: region.name.clone(),
                    environment: environment.name.clone(),
                    app: app.name.clone(),
                    version: app.version.clone(),
                    date: app.date().unwrap_or("-").to_string(),
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhub_core::RegistryStore;
    use vhub_core::types::CreateAppOptions;

    #[test]
    fn rows_flatten_tree_in_order() {
        let store = RegistryStore::new();
        store.create_region("emea").expect("region");
        store.create_region("amer").expect("region");
        store.create_environment("amer", "dev").expect("env");
        store.create_environment("emea", "qa").expect("env");
        store
            .create_app("emea", "qa", "b", CreateAppOptions::with_version("2"))
            .expect("app");
        store
            .create_app("amer", "dev", "a", CreateAppOptions::with_version("1"))
            .expect("app");

        let rows = app_rows(&store.list_regions());
        let names: Vec<_> = rows.iter().map(|r| (r.region.as_str(), r.app.as_str())).collect();
        assert_eq!(names, [("amer", "a"), ("emea", "b")]);
        assert_ne!(rows[0].date, "-");
    }
}
