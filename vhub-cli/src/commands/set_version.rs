//! `vhub set-version`: record a new deployed version.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use vhub_core::types::App;

use crate::client::{ApiClient, ServerArgs};

/// Arguments for `vhub set-version`.
#[derive(Args, Debug)]
pub struct SetVersionArgs {
    pub region: String,
    pub environment: String,
    pub app: String,
    pub version: String,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Serialize)]
struct VersionBody<'a> {
    version: &'a str,
}

impl SetVersionArgs {
    pub fn run(self) -> Result<()> {
        let path = format!(
            "{}/version",
            ApiClient::app_path(&self.region, &self.environment, &self.app)
        );
        let app: App = self
            .server
            .client()
            .put(&path, &VersionBody { version: &self.version })
            .with_context(|| {
                format!(
                    "failed to set version of {}/{}/{}",
                    self.region, self.environment, self.app
                )
            })?;
        println!(
            "{}/{}/{} is now at {}",
            self.region, self.environment, app.name, app.version
        );
        Ok(())
    }
}
