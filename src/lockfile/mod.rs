//! The lock document (`modlist-lock.json`): installed state of the mods folder
//!
//! Each entry pins one managed mod to a concrete file, with enough information to
//! re-download and verify it. The document is a bare JSON array:
//!
//! ```json
//! [
//!   {
//!     "type": "modrinth",
//!     "id": "AANobbMI",
//!     "name": "Sodium",
//!     "fileName": "sodium-fabric-0.5.3+mc1.20.1.jar",
//!     "releasedOn": "2023-09-25T17:28:37Z",
//!     "hash": "b4e3e1f2b4b0b8b4f1d0c4f3a2a1a0b9c8d7e6f5",
//!     "downloadUrl": "https://cdn.modrinth.com/data/AANobbMI/versions/.../sodium.jar"
//!   }
//! ]
//! ```
//!
//! Entries are only ever created from a [`RemoteArtifact`](crate::models::RemoteArtifact)
//! that passed [`validate_artifact`](crate::persistence::validate_artifact).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::MmmError;
use crate::models::Platform;
use crate::utils::atomic_write_json;

/// Parsed lock document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockFile {
    pub mods: Vec<LockedMod>,
}

/// One installed mod file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedMod {
    #[serde(rename = "type")]
    pub platform: Platform,
    pub id: String,
    pub name: String,
    /// Bare file name inside the mods folder
    pub file_name: String,
    pub released_on: String,
    /// Hex sha1 of the file
    pub hash: String,
    pub download_url: String,
}

impl LockFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the lock document, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self, MmmError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        serde_json::from_str(&content).map_err(|e| MmmError::LockInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load the lock document, writing an empty `[]` first when it does not exist.
    pub fn ensure(path: &Path) -> Result<Self> {
        if !path.exists() {
            let empty = Self::new();
            empty.save(path)?;
            tracing::debug!(path = %path.display(), "Created empty lock file");
            return Ok(empty);
        }
        Ok(Self::load(path)?)
    }

    /// Atomically write the lock document as indented JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)?;
        tracing::debug!(path = %path.display(), mods = self.mods.len(), "Saved lock file");
        Ok(())
    }

    #[must_use]
    pub fn find_mod(&self, platform: Platform, id: &str) -> Option<&LockedMod> {
        self.mods.iter().find(|m| m.platform == platform && m.id == id)
    }

    pub fn find_mod_mut(&mut self, platform: Platform, id: &str) -> Option<&mut LockedMod> {
        self.mods.iter_mut().find(|m| m.platform == platform && m.id == id)
    }

    /// Whether any entry owns a file with this exact name.
    #[must_use]
    pub fn has_file_name(&self, file_name: &str) -> bool {
        self.mods.iter().any(|m| m.file_name == file_name)
    }
}
