//! Keeping the config and lock documents consistent
//!
//! [`PersistenceCoordinator`] owns the document locations and offers two write modes:
//!
//! - [`PersistenceCoordinator::ensure_persisted`] (used by `add`) only inserts missing
//!   entries and writes nothing when both already exist.
//! - [`upsert_config_and_lock`] (used by `scan`) inserts or updates, reporting per
//!   document whether anything changed. It never writes; the caller saves only the
//!   documents that changed.
//!
//! Both validate the [`RemoteArtifact`] before creating a lock entry. The documents are
//! passed in and handed back by value, never mutated behind a shared reference.
//!
//! Config and lock are two separate atomic writes. A crash between them can leave a
//! config entry without a lock entry; the next `add` fills the gap.

mod filename;

pub use filename::{FileNameIssue, display_file_name, normalize_file_name};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::MmmError;
use crate::lockfile::{LockFile, LockedMod};
use crate::manifest::{ConfigLocation, Manifest, ModEntry};
use crate::minecraft::GameVersionSource;
use crate::models::{Loader, Platform, RemoteArtifact};

/// Per-mod options recorded in a new config entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOptions {
    pub version: Option<String>,
    pub allow_version_fallback: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub config_added: bool,
    pub lock_added: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub config_added: bool,
    pub config_updated: bool,
    pub lock_added: bool,
    pub lock_updated: bool,
}

impl UpsertOutcome {
    #[must_use]
    pub const fn config_changed(&self) -> bool {
        self.config_added || self.config_updated
    }

    #[must_use]
    pub const fn lock_changed(&self) -> bool {
        self.lock_added || self.lock_updated
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: Self) {
        self.config_added |= other.config_added;
        self.config_updated |= other.config_updated;
        self.lock_added |= other.lock_added;
        self.lock_updated |= other.lock_updated;
    }
}

fn missing(reason: &str) -> MmmError {
    MmmError::Validation {
        reason: reason.to_string(),
    }
}

/// Check an artifact can become a lock entry and return its normalized file name.
pub fn validate_artifact(artifact: &RemoteArtifact) -> Result<String, MmmError> {
    if artifact.name.trim().is_empty() {
        return Err(missing("remote mod missing name"));
    }
    let file_name = normalize_file_name(&artifact.file_name)?;
    if artifact.hash.trim().is_empty() {
        return Err(missing("remote mod missing hash"));
    }
    if artifact.release_date.trim().is_empty() {
        return Err(missing("remote mod missing release date"));
    }
    if artifact.download_url.trim().is_empty() {
        return Err(missing("remote mod missing download url"));
    }
    Ok(file_name)
}

fn check_identity(project_id: &str) -> Result<(), MmmError> {
    if project_id.trim().is_empty() {
        return Err(missing("missing resolved id"));
    }
    Ok(())
}

fn config_entry(platform: Platform, project_id: &str, artifact: &RemoteArtifact, options: &PersistOptions) -> ModEntry {
    ModEntry {
        platform,
        id: project_id.to_string(),
        allowed_release_types: None,
        name: artifact.name.clone(),
        allow_version_fallback: options.allow_version_fallback.then_some(true),
        version: options.version.clone().filter(|v| !v.trim().is_empty()),
    }
}

fn lock_entry(platform: Platform, project_id: &str, artifact: &RemoteArtifact, file_name: String) -> LockedMod {
    LockedMod {
        platform,
        id: project_id.to_string(),
        name: artifact.name.clone(),
        file_name,
        released_on: artifact.release_date.clone(),
        hash: artifact.hash.clone(),
        download_url: artifact.download_url.clone(),
    }
}

/// The lock entry an artifact would become, after identity and artifact validation.
pub fn locked_mod(platform: Platform, project_id: &str, artifact: &RemoteArtifact) -> Result<LockedMod, MmmError> {
    check_identity(project_id)?;
    let file_name = validate_artifact(artifact)?;
    Ok(lock_entry(platform, project_id, artifact, file_name))
}

/// Insert or update the entries for `(platform, project_id)` in memory.
///
/// The config name is refreshed when it changed. The lock entry is replaced when its
/// name, file name, release date, download URL or hash differ. The hash comparison
/// ignores case; every other field compares exactly.
pub fn upsert_config_and_lock(
    mut manifest: Manifest,
    mut lock: LockFile,
    platform: Platform,
    project_id: &str,
    artifact: &RemoteArtifact,
    options: &PersistOptions,
) -> Result<(Manifest, LockFile, UpsertOutcome), MmmError> {
    check_identity(project_id)?;
    let file_name = validate_artifact(artifact)?;
    let mut outcome = UpsertOutcome::default();

    match manifest.find_mod_mut(platform, project_id) {
        None => {
            manifest.mods.push(config_entry(platform, project_id, artifact, options));
            outcome.config_added = true;
        }
        Some(entry) if entry.name != artifact.name => {
            entry.name.clone_from(&artifact.name);
            outcome.config_updated = true;
        }
        Some(_) => {}
    }

    let next = lock_entry(platform, project_id, artifact, file_name);
    match lock.find_mod_mut(platform, project_id) {
        None => {
            lock.mods.push(next);
            outcome.lock_added = true;
        }
        Some(current) => {
            let changed = current.name != next.name
                || current.file_name != next.file_name
                || current.released_on != next.released_on
                || !current.hash.eq_ignore_ascii_case(&next.hash)
                || current.download_url != next.download_url;
            if changed {
                *current = next;
                outcome.lock_updated = true;
            }
        }
    }

    debug!(%platform, project_id, ?outcome, "Upserted mod entries");
    Ok((manifest, lock, outcome))
}

/// Reads and writes the config and lock documents at one location.
#[derive(Debug, Clone)]
pub struct PersistenceCoordinator {
    location: ConfigLocation,
}

impl PersistenceCoordinator {
    #[must_use]
    pub const fn new(location: ConfigLocation) -> Self {
        Self {
            location,
        }
    }

    #[must_use]
    pub const fn location(&self) -> &ConfigLocation {
        &self.location
    }

    /// Load both documents, creating them when needed.
    ///
    /// A missing config is [`MmmError::ConfigNotFound`] when `quiet`. Otherwise a new
    /// fabric config for the latest Minecraft release is written. A missing lock is
    /// always created empty.
    pub async fn ensure_config_and_lock(
        &self,
        quiet: bool,
        versions: &dyn GameVersionSource,
    ) -> Result<(Manifest, LockFile)> {
        let config_path = self.location.config_path();
        let manifest = match Manifest::load(config_path) {
            Ok(manifest) => manifest,
            Err(MmmError::ConfigNotFound { .. }) if !quiet => {
                let game_version =
                    versions.latest_release().await.context("Failed to look up the latest Minecraft release")?;
                let manifest = Manifest::new(Loader::Fabric, game_version);
                manifest.save(config_path)?;
                info!(path = %config_path.display(), game_version = %manifest.game_version, "Created config file");
                manifest
            }
            Err(e) => return Err(e.into()),
        };

        let lock = LockFile::ensure(&self.location.lock_path())?;
        Ok((manifest, lock))
    }

    /// Add entries for `(platform, project_id)` that are missing, writing only the
    /// documents that gained one.
    pub fn ensure_persisted(
        &self,
        mut manifest: Manifest,
        mut lock: LockFile,
        platform: Platform,
        project_id: &str,
        artifact: &RemoteArtifact,
        options: &PersistOptions,
    ) -> Result<(Manifest, LockFile, EnsureOutcome)> {
        check_identity(project_id)?;
        let mut outcome = EnsureOutcome::default();

        let new_lock_entry = if lock.find_mod(platform, project_id).is_none() {
            let file_name = validate_artifact(artifact)?;
            Some(lock_entry(platform, project_id, artifact, file_name))
        } else {
            None
        };

        if manifest.find_mod(platform, project_id).is_none() {
            manifest.mods.push(config_entry(platform, project_id, artifact, options));
            outcome.config_added = true;
        }
        if let Some(entry) = new_lock_entry {
            lock.mods.push(entry);
            outcome.lock_added = true;
        }

        if outcome.config_added {
            self.save_config(&manifest)?;
        }
        if outcome.lock_added {
            self.save_lock(&lock)?;
        }

        debug!(%platform, project_id, ?outcome, "Ensured mod entries");
        Ok((manifest, lock, outcome))
    }

    pub fn save_config(&self, manifest: &Manifest) -> Result<()> {
        manifest
            .save(self.location.config_path())
            .with_context(|| format!("Failed to write {}", self.location.config_path().display()))
    }

    pub fn save_lock(&self, lock: &LockFile) -> Result<()> {
        let path = self.location.lock_path();
        lock.save(&path).with_context(|| format!("Failed to write {}", path.display()))
    }
}
