//! Loading and saving the config document.

use anyhow::Result;
use std::path::Path;

use super::Manifest;
use crate::core::MmmError;
use crate::utils::atomic_write_json;

impl Manifest {
    /// Load the config document.
    ///
    /// A missing file is [`MmmError::ConfigNotFound`] so callers can decide whether to
    /// initialize a new one.
    pub fn load(path: &Path) -> Result<Self, MmmError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MmmError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| MmmError::ConfigInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Atomically write the config document as indented JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)?;
        tracing::debug!(path = %path.display(), mods = self.mods.len(), "Saved config");
        Ok(())
    }
}
