//! The config document (`modlist.json`): desired state of the mods folder
//!
//! The config records *which* mods the user wants and the policy used to resolve them.
//! Its companion [lock document](crate::lockfile) records which concrete files were
//! installed.
//!
//! # Format
//!
//! ```json
//! {
//!   "loader": "fabric",
//!   "gameVersion": "1.20.1",
//!   "defaultAllowedReleaseTypes": ["release", "beta"],
//!   "modsFolder": "mods",
//!   "mods": [
//!     { "type": "modrinth", "id": "AANobbMI", "name": "Sodium" },
//!     { "type": "curseforge", "id": "238222", "name": "JEI", "version": "jei-1.20.1-15.2.0.27.jar" }
//!   ]
//! }
//! ```
//!
//! A mod's identity is `(type, id)`; it is unique within the document.

mod io;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::IGNORE_FILE;
use crate::models::{Loader, Platform, ReleaseType};

/// Parsed config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub loader: Loader,
    pub game_version: String,
    pub default_allowed_release_types: Vec<ReleaseType>,
    pub mods_folder: String,
    #[serde(default)]
    pub mods: Vec<ModEntry>,
}

/// A managed mod in the config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModEntry {
    #[serde(rename = "type")]
    pub platform: Platform,
    pub id: String,
    /// Overrides `defaultAllowedReleaseTypes` for this mod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_release_types: Option<Vec<ReleaseType>>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_version_fallback: Option<bool>,
    /// Pinned version number (Modrinth) or file name (CurseForge).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Manifest {
    /// Fresh config with an empty mod list.
    #[must_use]
    pub fn new(loader: Loader, game_version: impl Into<String>) -> Self {
        Self {
            loader,
            game_version: game_version.into(),
            default_allowed_release_types: vec![ReleaseType::Release, ReleaseType::Beta],
            mods_folder: "mods".to_string(),
            mods: Vec::new(),
        }
    }

    #[must_use]
    pub fn find_mod(&self, platform: Platform, id: &str) -> Option<&ModEntry> {
        self.mods.iter().find(|m| m.platform == platform && m.id == id)
    }

    pub fn find_mod_mut(&mut self, platform: Platform, id: &str) -> Option<&mut ModEntry> {
        self.mods.iter_mut().find(|m| m.platform == platform && m.id == id)
    }

    /// Release types for a mod, falling back to the document default.
    #[must_use]
    pub fn release_types_for(&self, entry: Option<&ModEntry>) -> Vec<ReleaseType> {
        entry
            .and_then(|e| e.allowed_release_types.clone())
            .unwrap_or_else(|| self.default_allowed_release_types.clone())
    }
}

/// Paths derived from the location of the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    config_path: PathBuf,
}

impl ConfigLocation {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Directory holding the config document.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// `<dir>/<config stem>-lock.json`
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let stem = self
            .config_path
            .file_stem()
            .map_or_else(|| "modlist".into(), |s| s.to_string_lossy());
        self.dir().join(format!("{stem}-lock.json"))
    }

    /// Mods folder: absolute paths are used as-is, relative ones hang off [`Self::dir`].
    #[must_use]
    pub fn mods_folder(&self, manifest: &Manifest) -> PathBuf {
        let folder = Path::new(&manifest.mods_folder);
        if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            self.dir().join(folder)
        }
    }

    #[must_use]
    pub fn ignore_file(&self) -> PathBuf {
        self.dir().join(IGNORE_FILE)
    }
}
