//! Remote mod registries
//!
//! - [`transport`] shared retrying, cancellable HTTP transport
//! - [`modrinth`] Modrinth API client ([`ModrinthApi`])
//! - [`curseforge`] CurseForge API client ([`CurseforgeApi`])
//! - [`fingerprint`] CurseForge file fingerprint
//!
//! The API traits are the seam used by the resolver and the content identifier, so
//! both can be exercised against in-memory registries in tests.

pub mod curseforge;
pub mod fingerprint;
pub mod modrinth;
pub mod transport;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use curseforge::{CurseforgeApi, CurseforgeClient};
pub use modrinth::{ModrinthApi, ModrinthClient};
pub use transport::HttpTransport;

use crate::constants::{CURSEFORGE_API_URL, MINECRAFT_VERSION_MANIFEST_URL, MODRINTH_API_URL};
use crate::core::MmmError;

/// Registry endpoints and credentials, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub modrinth_url: String,
    pub modrinth_api_key: Option<String>,
    pub curseforge_url: String,
    pub curseforge_api_key: String,
    pub minecraft_manifest_url: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            modrinth_url: MODRINTH_API_URL.to_string(),
            modrinth_api_key: None,
            curseforge_url: CURSEFORGE_API_URL.to_string(),
            curseforge_api_key: String::new(),
            minecraft_manifest_url: MINECRAFT_VERSION_MANIFEST_URL.to_string(),
        }
    }
}

impl RegistrySettings {
    /// Read settings from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            modrinth_url: get("MODRINTH_API_URL").unwrap_or(defaults.modrinth_url),
            modrinth_api_key: get("MODRINTH_API_KEY"),
            curseforge_url: get("CURSEFORGE_API_URL").unwrap_or(defaults.curseforge_url),
            curseforge_api_key: get("CURSEFORGE_API_KEY").unwrap_or_default(),
            minecraft_manifest_url: get("MMM_MINECRAFT_MANIFEST_URL")
                .unwrap_or(defaults.minecraft_manifest_url),
        }
    }
}

/// Live clients for both registries sharing one transport.
#[derive(Clone)]
pub struct Registries {
    pub transport: Arc<HttpTransport>,
    pub modrinth: Arc<dyn ModrinthApi>,
    pub curseforge: Arc<dyn CurseforgeApi>,
    pub settings: RegistrySettings,
}

impl Registries {
    pub fn connect(settings: RegistrySettings, cancel: CancellationToken) -> Result<Self, MmmError> {
        let transport = Arc::new(HttpTransport::new(cancel)?);
        let modrinth = Arc::new(ModrinthClient::new(
            Arc::clone(&transport),
            settings.modrinth_url.clone(),
            settings.modrinth_api_key.clone(),
        ));
        let curseforge = Arc::new(CurseforgeClient::new(
            Arc::clone(&transport),
            settings.curseforge_url.clone(),
            settings.curseforge_api_key.clone(),
        ));

        Ok(Self {
            transport,
            modrinth,
            curseforge,
            settings,
        })
    }
}
