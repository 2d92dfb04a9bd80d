//! Content identification of unmanaged local mod files
//!
//! [`ContentIdentifier::identify`] classifies hashed local jars against both registries:
//!
//! - **match**: a registry recognized the file
//! - **unknown**: both registries answered "not found"
//! - **unsure**: a lookup failed for any other reason (network, decode, unexpected
//!   status). Unsure candidates are never retried on the other registry and never
//!   reported as unknown, since the file may well exist upstream.
//!
//! The preferred registry is asked first; only its misses go to the alternate one.

pub mod files;
pub mod ignore;

mod curseforge;
mod modrinth;

pub use curseforge::CurseforgeLookup;
pub use files::{hash_candidates, unmanaged_jars};
pub use ignore::IgnoreRules;
pub use modrinth::ModrinthLookup;

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::MmmError;
use crate::models::{Platform, RemoteArtifact};
use crate::registry::Registries;

/// A local file awaiting identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// Lowercase hex sha1 of the file contents
    pub hash: String,
}

/// A local file recognized by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch {
    pub candidate: ScanCandidate,
    pub platform: Platform,
    pub project_id: String,
    pub name: String,
    /// RFC 3339 timestamp
    pub release_date: String,
    pub download_url: String,
}

impl ScanMatch {
    /// The match as a resolved artifact, naming the local file.
    #[must_use]
    pub fn artifact(&self) -> RemoteArtifact {
        RemoteArtifact {
            name: self.name.clone(),
            file_name: self.candidate.file_name.clone(),
            release_date: self.release_date.clone(),
            hash: self.candidate.hash.clone(),
            download_url: self.download_url.clone(),
        }
    }
}

/// A local file whose lookup failed inconclusively.
#[derive(Debug, Clone)]
pub struct ScanUnsure {
    pub path: PathBuf,
    pub error: MmmError,
}

/// Outcome of looking up candidates on one registry.
#[derive(Debug, Clone, Default)]
pub struct PlatformLookup {
    pub matches: Vec<ScanMatch>,
    /// Registry answered "not found"
    pub misses: Vec<ScanCandidate>,
    pub unsure: Vec<ScanUnsure>,
}

/// Result of [`ContentIdentifier::identify`].
#[derive(Debug, Clone, Default)]
pub struct Identification {
    /// Preferred platform first, then by name, then by file name
    pub matches: Vec<ScanMatch>,
    /// Sorted by path
    pub unknown: Vec<ScanCandidate>,
    /// Sorted by path
    pub unsure: Vec<ScanUnsure>,
}

/// Hash-based lookup on one registry.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    fn platform(&self) -> Platform;

    /// Classify every candidate. Only cancellation fails the whole call.
    async fn lookup(
        &self,
        candidates: &[ScanCandidate],
        cancel: &CancellationToken,
    ) -> Result<PlatformLookup, MmmError>;
}

/// Preferred/fallback arbitration over both registries.
#[derive(Clone)]
pub struct ContentIdentifier {
    modrinth: Arc<dyn ContentLookup>,
    curseforge: Arc<dyn ContentLookup>,
}

impl ContentIdentifier {
    pub fn new(modrinth: Arc<dyn ContentLookup>, curseforge: Arc<dyn ContentLookup>) -> Self {
        Self {
            modrinth,
            curseforge,
        }
    }

    #[must_use]
    pub fn from_registries(registries: &Registries) -> Self {
        Self::new(
            Arc::new(ModrinthLookup::new(Arc::clone(&registries.modrinth))),
            Arc::new(CurseforgeLookup::new(Arc::clone(&registries.curseforge))),
        )
    }

    fn lookup_for(&self, platform: Platform) -> &dyn ContentLookup {
        match platform {
            Platform::Modrinth => self.modrinth.as_ref(),
            Platform::Curseforge => self.curseforge.as_ref(),
        }
    }

    pub async fn identify(
        &self,
        candidates: &[ScanCandidate],
        preferred: Platform,
        cancel: &CancellationToken,
    ) -> Result<Identification, MmmError> {
        let primary = self.lookup_for(preferred).lookup(candidates, cancel).await?;
        debug!(
            platform = %preferred,
            matches = primary.matches.len(),
            misses = primary.misses.len(),
            unsure = primary.unsure.len(),
            "Preferred platform lookup finished"
        );

        let secondary = if primary.misses.is_empty() {
            PlatformLookup::default()
        } else {
            let alternate = preferred.alternate();
            info!(platform = %alternate, count = primary.misses.len(), "Looking up remaining files on alternate platform");
            self.lookup_for(alternate).lookup(&primary.misses, cancel).await?
        };

        Ok(merge(preferred, primary, secondary))
    }
}

fn merge(preferred: Platform, primary: PlatformLookup, secondary: PlatformLookup) -> Identification {
    let mut matches: Vec<ScanMatch> = primary.matches.into_iter().chain(secondary.matches).collect();
    let matched: HashSet<PathBuf> = matches.iter().map(|m| m.candidate.path.clone()).collect();

    let mut unsure: Vec<ScanUnsure> = primary
        .unsure
        .into_iter()
        .chain(secondary.unsure)
        .filter(|u| !matched.contains(&u.path))
        .collect();
    let unsure_paths: HashSet<PathBuf> = unsure.iter().map(|u| u.path.clone()).collect();

    let mut unknown: Vec<ScanCandidate> =
        secondary.misses.into_iter().filter(|c| !unsure_paths.contains(&c.path)).collect();

    matches.sort_by(|a, b| {
        (a.platform != preferred)
            .cmp(&(b.platform != preferred))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.candidate.file_name.cmp(&b.candidate.file_name))
    });
    unsure.sort_by(|a, b| a.path.cmp(&b.path));
    unknown.sort_by(|a, b| a.path.cmp(&b.path));

    Identification {
        matches,
        unknown,
        unsure,
    }
}
