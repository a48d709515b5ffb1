//! Tera rendering engine: [`Renderer`].
//!
//! | Template          | Output                          | Autoescape |
//! |-------------------|---------------------------------|------------|
//! | `dashboard.html`  | HTML page served at `/`         | yes        |
//! | `registry.csv`    | CSV export served at `/csv`     | no         |
//!
//! Tera decides autoescaping from the template name suffix, so the names keep
//! their real extensions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::{Tera, Value};

use vhub_core::types::{HealthStatus, RegistryData};

use crate::context::{CsvContext, DashboardContext};
use crate::error::RenderError;

pub const DASHBOARD_TEMPLATE: &str = "dashboard.html";
pub const CSV_TEMPLATE: &str = "registry.csv";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (DASHBOARD_TEMPLATE, include_str!("templates/dashboard.html.tera")),
    (CSV_TEMPLATE, include_str!("templates/registry.csv.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

/// Read `dashboard.html` / `registry.csv` overrides from `dir`, if present.
fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    let mut templates = Vec::new();
    for (name, _) in TPLS {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push(((*name).to_string(), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.register_filter("csv", csv_filter);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

/// `{{ value | csv }}`: RFC 4180 field quoting.
fn csv_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(Value::String(csv_field(&raw)))
}

pub(crate) fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Tera-based renderer for the dashboard and CSV export.
///
/// Build once at startup and share; rendering takes `&self`.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Embedded templates, replaced by same-named files found in
    /// `user_template_dir`.
    pub fn with_overrides(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer {
            tera: build_tera(user_template_dir)?,
        })
    }

    pub fn render_dashboard(
        &self,
        data: &RegistryData,
        health: &[HealthStatus],
    ) -> Result<String, RenderError> {
        let ctx = DashboardContext::new(data, health).to_tera_context()?;
        Ok(self.tera.render(DASHBOARD_TEMPLATE, &ctx)?)
    }

    pub fn render_csv(&self, data: &RegistryData) -> Result<String, RenderError> {
        let ctx = CsvContext::new(data).to_tera_context()?;
        Ok(self.tera.render(CSV_TEMPLATE, &ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
