//! Shared data types for mod resolution and persistence
//!
//! These are the vocabulary types passed between the resolver, the content
//! identifier, the dialog and the persistence coordinator. The persisted
//! documents live in [`crate::manifest`] and [`crate::lockfile`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::MmmError;

/// One of the two supported mod registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// <https://www.curseforge.com>
    Curseforge,
    /// <https://modrinth.com>
    Modrinth,
}

impl Platform {
    /// Both platforms in menu order.
    pub const ALL: [Self; 2] = [Self::Curseforge, Self::Modrinth];

    /// Lowercase name as used on the command line and in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Curseforge => "curseforge",
            Self::Modrinth => "modrinth",
        }
    }

    /// The other registry.
    #[must_use]
    pub const fn alternate(self) -> Self {
        match self {
            Self::Curseforge => Self::Modrinth,
            Self::Modrinth => Self::Curseforge,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = MmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curseforge" => Ok(Self::Curseforge),
            "modrinth" => Ok(Self::Modrinth),
            _ => Err(MmmError::UnknownPlatform {
                platform: s.to_string(),
            }),
        }
    }
}

/// Mod loader family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Bukkit,
    Bungeecord,
    Cauldron,
    Datapack,
    Fabric,
    Folia,
    Forge,
    Liteloader,
    Modloader,
    Neoforge,
    Paper,
    Purpur,
    Quilt,
    Rift,
    Spigot,
    Sponge,
    Velocity,
    Waterfall,
}

impl Loader {
    /// Lowercase name as used by the registries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bukkit => "bukkit",
            Self::Bungeecord => "bungeecord",
            Self::Cauldron => "cauldron",
            Self::Datapack => "datapack",
            Self::Fabric => "fabric",
            Self::Folia => "folia",
            Self::Forge => "forge",
            Self::Liteloader => "liteloader",
            Self::Modloader => "modloader",
            Self::Neoforge => "neoforge",
            Self::Paper => "paper",
            Self::Purpur => "purpur",
            Self::Quilt => "quilt",
            Self::Rift => "rift",
            Self::Spigot => "spigot",
            Self::Sponge => "sponge",
            Self::Velocity => "velocity",
            Self::Waterfall => "waterfall",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release channel of a published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Alpha,
    Beta,
    Release,
}

impl ReleaseType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete downloadable file chosen by the resolver.
///
/// Never persisted directly: it must pass
/// [`validate_artifact`](crate::persistence::validate_artifact) before it becomes a
/// [`LockedMod`](crate::lockfile::LockedMod).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    /// Project title as reported by the registry
    pub name: String,
    pub file_name: String,
    /// RFC 3339 timestamp
    pub release_date: String,
    /// Lowercase hex sha1
    pub hash: String,
    pub download_url: String,
}

/// Resolution policy for a single resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConstraints {
    pub allowed_release_types: Vec<ReleaseType>,
    pub game_version: String,
    pub loader: Loader,
    /// Step the game version down when nothing matches.
    pub allow_fallback: bool,
    /// Exact version number (Modrinth) or file name (CurseForge) to pin to.
    pub fixed_version: Option<String>,
}
