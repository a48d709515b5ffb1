//! `vhub get`: show one app.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use vhub_core::types::App;

use crate::client::{ApiClient, ServerArgs};

/// Arguments for `vhub get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    pub region: String,
    pub environment: String,
    pub app: String,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

impl GetArgs {
    pub fn run(self) -> Result<()> {
        let path = ApiClient::app_path(&self.region, &self.environment, &self.app);
        let app: App = self.server.client().get(&path)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&app)?);
            return Ok(());
        }

        println!(
            "{}/{}/{}",
            self.region,
            self.environment,
            app.name.bold()
        );
        println!("  version: {}", app.version.green());
        println!("  route:   {}", app.route().unwrap_or("-"));
        println!("  updated: {}", app.date().unwrap_or("-"));
        Ok(())
    }
}
