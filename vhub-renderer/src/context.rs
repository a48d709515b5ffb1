//! Template context: serializable rendering payloads built from [`RegistryData`].

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use vhub_core::types::{App, HealthStatus, RegistryData};

use crate::error::RenderError;

/// Payload for the HTML dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardContext {
    pub regions: Vec<RegionCtx>,
    pub health: Vec<HealthCtx>,
    pub totals: TotalsCtx,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionCtx {
    pub name: String,
    pub environments: Vec<EnvironmentCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentCtx {
    pub name: String,
    pub apps: Vec<App>,
}

/// Health row with display-ready strings.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCtx {
    pub region: String,
    pub environment: String,
    pub url: String,
    pub status: String,
    /// Empty until the first probe finishes.
    pub last_checked: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsCtx {
    pub regions: usize,
    pub environments: usize,
    pub apps: usize,
}

/// One CSV line: an app with its full path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRow {
    pub region: String,
    pub environment: String,
    pub app: String,
    pub version: String,
    pub route: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CsvContext {
    pub rows: Vec<CsvRow>,
}

impl DashboardContext {
    pub fn new(data: &RegistryData, health: &[HealthStatus]) -> Self {
        let regions = data
            .regions
            .values()
            .map(|region| RegionCtx {
                name: region.name.clone(),
                environments: region
                    .environments
                    .values()
                    .map(|env| EnvironmentCtx {
                        name: env.name.clone(),
                        apps: env.apps.values().cloned().collect(),
                    })
                    .collect(),
            })
            .collect();

        let health = health
            .iter()
            .map(|h| HealthCtx {
                region: h.region.clone(),
                environment: h.environment.clone(),
                url: h.url.clone(),
                status: h.status.to_string(),
                last_checked: h
                    .last_checked
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_default(),
            })
            .collect();

        let (regions_total, environments, apps) = data.counts();
        Self {
            regions,
            health,
            totals: TotalsCtx {
                regions: regions_total,
                environments,
                apps,
            },
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

impl CsvContext {
    pub fn new(data: &RegistryData) -> Self {
        Self {
            rows: csv_rows(data),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// Flatten the tree into rows, ordered region → environment → app by name.
pub fn csv_rows(data: &RegistryData) -> Vec<CsvRow> {
    let mut rows = Vec::new();
    for region in data.regions.values() {
        for env in region.environments.values() {
            for app in env.apps.values() {
                rows.push(CsvRow {
                    region: region.name.clone(),
                    environment: env.name.clone(),
                    app: app.name.clone(),
                    version: app.version.clone(),
                    route: app.route.clone(),
                    date: app.date.clone(),
                });
            }
        }
    }
    rows
}
