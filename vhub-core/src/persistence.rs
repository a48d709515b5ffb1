//! Durable JSON storage with a backup copy.
//!
//! # Storage layout
//!
//! ```text
//! <primary>        e.g. ~/.vhub/data.json
//! <backup>         e.g. ~/.vhub/data.json.bak
//! ```
//!
//! Both files hold the same encoding (see [`RegistryData`]).
//!
//! # Protocol
//!
//! - `save`: encode once under the store's shared lock, release it, then write
//!   the **backup first** and the primary second. A backup failure aborts the
//!   save before the primary is touched.
//! - `load`: primary, then backup. Whichever decodes first replaces the whole
//!   in-memory tree.
//! - Every single-file write is `<file>.tmp` → `chmod 0644` → `rename`, so a
//!   crash never leaves a half-written file under the real name.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{io_err, PersistError};
use crate::store::RegistryStore;
use crate::types::RegistryData;

/// Which copy a successful [`Persistence::load`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
}

/// Owner of the primary/backup file pair.
#[derive(Debug)]
pub struct Persistence {
    primary: PathBuf,
    backup: PathBuf,
    // Serialises whole saves so an older snapshot never lands after a newer one.
    save_lock: Mutex<()>,
}

impl Persistence {
    pub fn new(primary: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            backup: backup.into(),
            save_lock: Mutex::new(()),
        }
    }

    /// Backup lives next to the primary as `<primary>.bak`.
    pub fn with_default_backup(primary: impl Into<PathBuf>) -> Self {
        let primary = primary.into();
        let backup = backup_path_for(&primary);
        Self::new(primary, backup)
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// First run: if neither file exists, write an empty tree to both.
    ///
    /// Returns `true` when the files were created by this call.
    pub fn bootstrap(&self) -> Result<bool, PersistError> {
        if self.primary.exists() || self.backup.exists() {
            return Ok(false);
        }
        let empty = serde_json::to_vec(&RegistryData::default())?;
        write_atomic(&self.backup, &empty)?;
        write_atomic(&self.primary, &empty)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Replace the store's contents with the primary copy, falling back to the
    /// backup copy if the primary is missing, unreadable, or malformed.
    pub fn load(&self, store: &RegistryStore) -> Result<LoadSource, PersistError> {
        let (data, source) = self.read_with_fallback()?;
        store.replace(data);
        Ok(source)
    }

    /// Decode without touching any store.
    pub fn read_with_fallback(&self) -> Result<(RegistryData, LoadSource), PersistError> {
        let primary_err = match read_file(&self.primary) {
            Ok(data) => return Ok((data, LoadSource::Primary)),
            Err(err) => err,
        };
        match read_file(&self.backup) {
            Ok(data) => Ok((data, LoadSource::Backup)),
            Err(backup_err) => Err(PersistError::Unrecoverable {
                primary: Box::new(primary_err),
                backup: Box::new(backup_err),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Encode the store and write backup, then primary.
    pub fn save(&self, store: &RegistryStore) -> Result<(), PersistError> {
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let bytes = store.encode()?;
        self.write_encoded(&bytes)
    }

    fn write_encoded(&self, bytes: &[u8]) -> Result<(), PersistError> {
        write_atomic(&self.backup, bytes)?;
        write_atomic(&self.primary, bytes)?;
        Ok(())
    }
}

/// `<primary>.bak`, e.g. `data.json` → `data.json.bak`.
pub fn backup_path_for(primary: &Path) -> PathBuf {
    let mut name = primary
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    name.push(".bak");
    primary.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<RegistryData, PersistError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| PersistError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    let published = set_file_permissions(&tmp)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| io_err(path, e)));
    if published.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    published
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), PersistError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), PersistError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
