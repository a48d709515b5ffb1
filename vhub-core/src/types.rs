//! Domain types for the version hub.
//!
//! The tree is strictly nested: [`RegistryData`] → [`Region`] →
//! [`Environment`] → [`App`]. Child maps are keyed by the child's name and are
//! never absent for an existing parent; decoding turns a `null` map into an
//! empty one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Version assigned to an app created without an explicit version.
pub const UNDEFINED_VERSION: &str = "undefined";

/// Regions seeded into a brand-new data file.
pub const DEFAULT_REGIONS: &[&str] = &["amer", "emea", "apac"];

/// Environments seeded into every default region.
pub const DEFAULT_ENVIRONMENTS: &[&str] = &["production", "qa", "uat", "dev", "dr"];

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Root of the persisted tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistryData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub regions: BTreeMap<String, Region>,
}

/// Coarsest level of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub environments: BTreeMap<String, Environment>,
}

/// A deployment environment inside one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub apps: BTreeMap<String, App>,
}

/// A tracked application and its currently deployed version.
///
/// `route` and `date` use the empty string for "not set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub route: String,
    /// Last-modified timestamp, RFC 3339.
    #[serde(default)]
    pub date: String,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environments: BTreeMap::new(),
        }
    }

    /// Fill empty environment and app names from their map keys.
    pub fn normalize(&mut self) {
        for (key, env) in self.environments.iter_mut() {
            if env.name.is_empty() {
                env.name = key.clone();
            }
            env.normalize();
        }
    }
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            apps: BTreeMap::new(),
        }
    }

    pub fn normalize(&mut self) {
        for (key, app) in self.apps.iter_mut() {
            if app.name.is_empty() {
                app.name = key.clone();
            }
        }
    }
}

impl App {
    /// Build an app from create options, stamping `date` with the current time.
    pub fn new(name: impl Into<String>, options: CreateAppOptions) -> Self {
        Self {
            name: name.into(),
            version: options
                .version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| UNDEFINED_VERSION.to_string()),
            route: options.route.unwrap_or_default(),
            date: timestamp_now(),
        }
    }

    pub fn route(&self) -> Option<&str> {
        (!self.route.is_empty()).then_some(self.route.as_str())
    }

    pub fn date(&self) -> Option<&str> {
        (!self.date.is_empty()).then_some(self.date.as_str())
    }
}

impl RegistryData {
    /// The `amer`/`emea`/`apac` skeleton written on first run.
    pub fn default_skeleton() -> Self {
        let mut data = Self::default();
        for region_name in DEFAULT_REGIONS {
            let mut region = Region::new(*region_name);
            for env_name in DEFAULT_ENVIRONMENTS {
                region
                    .environments
                    .insert((*env_name).to_string(), Environment::new(*env_name));
            }
            data.regions.insert((*region_name).to_string(), region);
        }
        data
    }

    /// Fill empty entity names from their map keys.
    pub fn normalize(&mut self) {
        for (region_key, region) in self.regions.iter_mut() {
            if region.name.is_empty() {
                region.name = region_key.clone();
            }
            region.normalize();
        }
    }

    /// `(regions, environments, apps)` totals.
    pub fn counts(&self) -> (usize, usize, usize) {
        let regions = self.regions.len();
        let environments = self.regions.values().map(|r| r.environments.len()).sum();
        let apps = self
            .regions
            .values()
            .flat_map(|r| r.environments.values())
            .map(|e| e.apps.len())
            .sum();
        (regions, environments, apps)
    }
}

// ---------------------------------------------------------------------------
// Mutation inputs
// ---------------------------------------------------------------------------

/// Optional fields accepted when creating an app.
///
/// `version` defaults to [`UNDEFINED_VERSION`]; `route` defaults to unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateAppOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl CreateAppOptions {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            route: None,
        }
    }
}

/// Partial update of an existing app. `name` is never changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl AppPatch {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.route.is_none()
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Last known state of a probed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HealthState {
    #[default]
    Unknown,
    #[serde(rename = "OK")]
    Ok,
    Fail,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "Unknown"),
            HealthState::Ok => write!(f, "OK"),
            HealthState::Fail => write!(f, "Fail"),
        }
    }
}

/// One configured endpoint and the result of its latest probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub region: String,
    pub environment: String,
    pub url: String,
    pub status: HealthState,
    pub last_checked: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current UTC time as an RFC 3339 string, second precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_maps_decode_as_empty() {
        let json = r#"{"regions":{"amer":{"name":"amer","environments":null},
            "emea":{"name":"emea","environments":{"dev":{"name":"dev","apps":null}}}}}"#;
        let data: RegistryData = serde_json::from_str(json).expect("decode");
        assert!(data.regions["amer"].environments.is_empty());
        assert!(data.regions["emea"].environments["dev"].apps.is_empty());
    }

    #[test]
    fn null_root_decodes_as_empty_tree() {
        let data: RegistryData = serde_json::from_str(r#"{"regions":null}"#).expect("decode");
        assert!(data.regions.is_empty());
    }

    #[test]
    fn normalize_fills_names_from_keys() {
        let json = r#"{"regions":{"amer":{"environments":{"dev":{"apps":{"svc":{"version":"1"}}}}}}}"#;
        let mut data: RegistryData = serde_json::from_str(json).expect("decode");
        data.normalize();
        let env = &data.regions["amer"].environments["dev"];
        assert_eq!(data.regions["amer"].name, "amer");
        assert_eq!(env.name, "dev");
        assert_eq!(env.apps["svc"].name, "svc");
    }

    #[test]
    fn app_defaults_to_undefined_version() {
        let app = App::new("svc", CreateAppOptions::default());
        assert_eq!(app.version, UNDEFINED_VERSION);
        assert_eq!(app.route(), None);
        assert!(app.date().is_some());
    }

    #[test]
    fn blank_version_on_create_becomes_undefined() {
        for blank in ["", "   "] {
            let app = App::new("svc", CreateAppOptions::with_version(blank));
            assert_eq!(app.version, UNDEFINED_VERSION, "{blank:?}");
        }
    }

    #[test]
    fn app_serializes_every_field() {
        let app = App {
            name: "svc".into(),
            version: "1.0.0".into(),
            route: String::new(),
            date: String::new(),
        };
        let value = serde_json::to_value(&app).expect("encode");
        assert_eq!(
            value,
            serde_json::json!({"name": "svc", "version": "1.0.0", "route": "", "date": ""})
        );
    }

    #[test]
    fn default_skeleton_shape() {
        let data = RegistryData::default_skeleton();
        assert_eq!(data.counts(), (3, 15, 0));
        assert!(data.regions["apac"].environments.contains_key("dr"));
    }

    #[test]
    fn health_state_wire_names() {
        assert_eq!(serde_json::to_string(&HealthState::Ok).unwrap(), r#""OK""#);
        assert_eq!(serde_json::to_string(&HealthState::Fail).unwrap(), r#""Fail""#);
        assert_eq!(HealthState::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn empty_patch_detected() {
        assert!(AppPatch::default().is_empty());
        assert!(!AppPatch {
            version: Some("2".into()),
            route: None
        }
        .is_empty());
    }
}
