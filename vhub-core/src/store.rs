//! In-memory region → environment → app store.
//!
//! # Locking
//!
//! One [`RwLock`] guards the whole tree. Reads take the shared lock and return
//! deep copies; writes take the exclusive lock for the entire
//! lookup-then-mutate sequence, so two concurrent creates of the same path
//! resolve to exactly one success and one [`StoreError::Conflict`].
//!
//! Lookups walk region → environment → app in order and report the first
//! missing segment.
//!
//! Nothing here touches the filesystem; see [`crate::persistence`].

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{NodePath, StoreError};
use crate::types::{
    timestamp_now, App, AppPatch, CreateAppOptions, Environment, Region, RegistryData,
};

/// Thread-safe owner of the whole tree.
///
/// Construct once at startup and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct RegistryStore {
    inner: RwLock<RegistryData>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(mut data: RegistryData) -> Self {
        data.normalize();
        Self {
            inner: RwLock::new(data),
        }
    }

    // -----------------------------------------------------------------------
    // Whole-tree access
    // -----------------------------------------------------------------------

    /// Deep copy of the whole tree.
    pub fn snapshot(&self) -> RegistryData {
        self.read().clone()
    }

    /// JSON encoding of the tree, produced under the shared lock.
    ///
    /// The lock is released when this returns, before the caller does any I/O.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let guard = self.read();
        serde_json::to_vec(&*guard)
    }

    /// Swap in a new tree wholesale. No merge with the previous contents.
    pub fn replace(&self, mut data: RegistryData) {
        data.normalize();
        *self.write() = data;
    }

    /// `(regions, environments, apps)` totals.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.read().counts()
    }

    // -----------------------------------------------------------------------
    // Regions
    // -----------------------------------------------------------------------

    pub fn list_regions(&self) -> Vec<Region> {
        self.read().regions.values().cloned().collect()
    }

    pub fn create_region(&self, name: &str) -> Result<Region, StoreError> {
        validate_name(name)?;
        let mut data = self.write();
        if data.regions.contains_key(name) {
            return Err(StoreError::Conflict(NodePath::region(name)));
        }
        let region = Region::new(name);
        data.regions.insert(name.to_owned(), region.clone());
        Ok(region)
    }

    pub fn get_region(&self, name: &str) -> Result<Region, StoreError> {
        let data = self.read();
        region_ref(&data.regions, name).cloned()
    }

    /// Replace the contents of an existing region. The name stays the path name.
    pub fn replace_region(&self, name: &str, mut region: Region) -> Result<Region, StoreError> {
        region.name = name.to_owned();
        region.normalize();
        let mut data = self.write();
        let slot = region_mut(&mut data.regions, name)?;
        *slot = region.clone();
        Ok(region)
    }

    /// Removes the region and everything beneath it.
    pub fn delete_region(&self, name: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        data.regions
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(NodePath::region(name)))
    }

    // -----------------------------------------------------------------------
    // Environments
    // -----------------------------------------------------------------------

    pub fn create_environment(&self, region: &str, name: &str) -> Result<Environment, StoreError> {
        validate_name(name)?;
        let mut data = self.write();
        let parent = region_mut(&mut data.regions, region)?;
        if parent.environments.contains_key(name) {
            return Err(StoreError::Conflict(NodePath::environment(region, name)));
        }
        let environment = Environment::new(name);
        parent
            .environments
            .insert(name.to_owned(), environment.clone());
        Ok(environment)
    }

    pub fn list_environments(&self, region: &str) -> Result<Vec<Environment>, StoreError> {
        let data = self.read();
        let parent = region_ref(&data.regions, region)?;
        Ok(parent.environments.values().cloned().collect())
    }

    pub fn get_environment(&self, region: &str, name: &str) -> Result<Environment, StoreError> {
        let data = self.read();
        environment_ref(&data.regions, region, name).cloned()
    }

    /// Replace the apps of an existing environment. The name stays the path name.
    pub fn replace_environment(
        &self,
        region: &str,
        name: &str,
        mut environment: Environment,
    ) -> Result<Environment, StoreError> {
        environment.name = name.to_owned();
        environment.normalize();
        let mut data = self.write();
        let slot = environment_mut(&mut data.regions, region, name)?;
        *slot = environment.clone();
        Ok(environment)
    }

    pub fn delete_environment(&self, region: &str, name: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        let parent = region_mut(&mut data.regions, region)?;
        parent
            .environments
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(NodePath::environment(region, name)))
    }

    // -----------------------------------------------------------------------
    // Apps
    // -----------------------------------------------------------------------

    pub fn create_app(
        &self,
        region: &str,
        environment: &str,
        name: &str,
        options: CreateAppOptions,
    ) -> Result<App, StoreError> {
        validate_name(name)?;
        let mut data = self.write();
        let parent = environment_mut(&mut data.regions, region, environment)?;
        if parent.apps.contains_key(name) {
            return Err(StoreError::Conflict(NodePath::app(region, environment, name)));
        }
        let app = App::new(name, options);
        parent.apps.insert(name.to_owned(), app.clone());
        Ok(app)
    }

    pub fn list_apps(&self, region: &str, environment: &str) -> Result<Vec<App>, StoreError> {
        let data = self.read();
        let parent = environment_ref(&data.regions, region, environment)?;
        Ok(parent.apps.values().cloned().collect())
    }

    pub fn get_app(&self, region: &str, environment: &str, name: &str) -> Result<App, StoreError> {
        let data = self.read();
        environment_ref(&data.regions, region, environment)?
            .apps
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(NodePath::app(region, environment, name)))
    }

    /// Replace `version` and re-stamp `date`. `name` and `route` are untouched.
    pub fn update_app_version(
        &self,
        region: &str,
        environment: &str,
        name: &str,
        version: &str,
    ) -> Result<App, StoreError> {
        self.update_app(
            region,
            environment,
            name,
            AppPatch {
                version: Some(version.to_owned()),
                route: None,
            },
        )
    }

    /// Apply the fields present in `patch` and re-stamp `date`.
    pub fn update_app(
        &self,
        region: &str,
        environment: &str,
        name: &str,
        patch: AppPatch,
    ) -> Result<App, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidInput("nothing to update"));
        }
        if patch.version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(StoreError::InvalidInput("version must not be empty"));
        }
        let mut data = self.write();
        let app = app_mut(&mut data.regions, region, environment, name)?;
        if let Some(version) = patch.version {
            app.version = version;
        }
        if let Some(route) = patch.route {
            app.route = route;
        }
        app.date = timestamp_now();
        Ok(app.clone())
    }

    pub fn delete_app(&self, region: &str, environment: &str, name: &str) -> Result<(), StoreError> {
        let mut data = self.write();
        let parent = environment_mut(&mut data.regions, region, environment)?;
        parent
            .apps
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(NodePath::app(region, environment, name)))
    }

    // -----------------------------------------------------------------------
    // Lock helpers
    // -----------------------------------------------------------------------

    // A panic while holding the lock cannot leave the tree half-built: every
    // mutation is a single map insert/remove or field assignment.
    fn read(&self) -> RwLockReadGuard<'_, RegistryData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Path walking
// ---------------------------------------------------------------------------

fn region_ref<'a>(
    regions: &'a BTreeMap<String, Region>,
    region: &str,
) -> Result<&'a Region, StoreError> {
    regions
        .get(region)
        .ok_or_else(|| StoreError::NotFound(NodePath::region(region)))
}

fn region_mut<'a>(
    regions: &'a mut BTreeMap<String, Region>,
    region: &str,
) -> Result<&'a mut Region, StoreError> {
    regions
        .get_mut(region)
        .ok_or_else(|| StoreError::NotFound(NodePath::region(region)))
}

fn environment_ref<'a>(
    regions: &'a BTreeMap<String, Region>,
    region: &str,
    environment: &str,
) -> Result<&'a Environment, StoreError> {
    region_ref(regions, region)?
        .environments
        .get(environment)
        .ok_or_else(|| StoreError::NotFound(NodePath::environment(region, environment)))
}

fn environment_mut<'a>(
    regions: &'a mut BTreeMap<String, Region>,
    region: &str,
    environment: &str,
) -> Result<&'a mut Environment, StoreError> {
    region_mut(regions, region)?
        .environments
        .get_mut(environment)
        .ok_or_else(|| StoreError::NotFound(NodePath::environment(region, environment)))
}

fn app_mut<'a>(
    regions: &'a mut BTreeMap<String, Region>,
    region: &str,
    environment: &str,
    app: &str,
) -> Result<&'a mut App, StoreError> {
    environment_mut(regions, region, environment)?
        .apps
        .get_mut(app)
        .ok_or_else(|| StoreError::NotFound(NodePath::app(region, environment, app)))
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
