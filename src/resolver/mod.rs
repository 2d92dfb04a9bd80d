//! Version resolution: turn `(platform, project id, constraints)` into one artifact
//!
//! # Algorithm
//!
//! 1. Fetch the project (404 is [`MmmError::ModNotFound`]).
//! 2. Starting at the requested game version, list candidate files for the
//!    current version and loader.
//! 3. Filter. A pinned version keeps only its exact match. Otherwise keep
//!    candidates with an allowed release type, the current game version and an
//!    acceptable status.
//! 4. Nothing left: step the game version down when fallback is allowed
//!    ([`next_version_down`]), else fail with [`MmmError::NoCompatibleFile`].
//! 5. Pick the newest candidate (stable, ties keep registry order) and require a
//!    sha1, a download URL and a file name.
//!
//! Registry differences live behind [`VersionSource`]; [`VersionResolver`] selects
//! the source by [`Platform`]. Retries are the transport's job, never the resolver's.

mod fallback;
mod sources;

pub use fallback::next_version_down;
pub use sources::{CurseforgeSource, ModrinthSource};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::core::MmmError;
use crate::models::{FetchConstraints, Loader, Platform, RemoteArtifact, ReleaseType};
use crate::registry::Registries;

/// A registry file normalized for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_name: String,
    pub release_date: DateTime<Utc>,
    pub release_type: Option<ReleaseType>,
    /// Lists the game version the listing was requested for
    pub matches_game_version: bool,
    /// Availability/status allows installation
    pub acceptable: bool,
    /// Values a pinned version is compared against
    pub version_keys: Vec<String>,
    pub keys_ignore_case: bool,
    pub hash: Option<String>,
    pub download_url: Option<String>,
}

impl FileCandidate {
    fn is_pinned_match(&self, pinned: &str) -> bool {
        self.version_keys.iter().any(|key| {
            if self.keys_ignore_case {
                key.eq_ignore_ascii_case(pinned)
            } else {
                key == pinned
            }
        })
    }

    fn passes(&self, constraints: &FetchConstraints) -> bool {
        match &constraints.fixed_version {
            Some(pinned) => self.is_pinned_match(pinned),
            None => {
                self.release_type.is_some_and(|t| constraints.allowed_release_types.contains(&t))
                    && self.matches_game_version
                    && self.acceptable
            }
        }
    }
}

/// One registry's view of a project, as needed by the resolver.
#[async_trait]
pub trait VersionSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Display name of the project.
    async fn project_name(&self, project_id: &str) -> Result<String, MmmError>;

    /// Files for one game version and loader, in registry order.
    async fn candidates(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Loader,
    ) -> Result<Vec<FileCandidate>, MmmError>;
}

/// Capability used by the `add` command and the disambiguation dialog.
#[async_trait]
pub trait ModResolver: Send + Sync {
    async fn resolve(
        &self,
        platform: Platform,
        project_id: &str,
        constraints: &FetchConstraints,
    ) -> Result<RemoteArtifact, MmmError>;
}

/// Resolver over both registries.
#[derive(Clone)]
pub struct VersionResolver {
    modrinth: Arc<dyn VersionSource>,
    curseforge: Arc<dyn VersionSource>,
}

impl VersionResolver {
    pub fn new(modrinth: Arc<dyn VersionSource>, curseforge: Arc<dyn VersionSource>) -> Self {
        Self {
            modrinth,
            curseforge,
        }
    }

    #[must_use]
    pub fn from_registries(registries: &Registries) -> Self {
        Self::new(
            Arc::new(ModrinthSource::new(Arc::clone(&registries.modrinth))),
            Arc::new(CurseforgeSource::new(Arc::clone(&registries.curseforge))),
        )
    }

    fn source(&self, platform: Platform) -> &dyn VersionSource {
        match platform {
            Platform::Modrinth => self.modrinth.as_ref(),
            Platform::Curseforge => self.curseforge.as_ref(),
        }
    }

    /// Resolve with a platform given by name; unknown names are
    /// [`MmmError::UnknownPlatform`].
    pub async fn resolve_named(
        &self,
        platform: &str,
        project_id: &str,
        constraints: &FetchConstraints,
    ) -> Result<RemoteArtifact, MmmError> {
        let platform: Platform = platform.parse()?;
        self.resolve(platform, project_id, constraints).await
    }
}

#[async_trait]
impl ModResolver for VersionResolver {
    async fn resolve(
        &self,
        platform: Platform,
        project_id: &str,
        constraints: &FetchConstraints,
    ) -> Result<RemoteArtifact, MmmError> {
        resolve_from(self.source(platform), project_id, constraints).await
    }
}

/// Run the selection algorithm against one source.
pub async fn resolve_from(
    source: &dyn VersionSource,
    project_id: &str,
    constraints: &FetchConstraints,
) -> Result<RemoteArtifact, MmmError> {
    let platform = source.platform();
    let no_file = || MmmError::NoCompatibleFile {
        platform: platform.to_string(),
        project_id: project_id.to_string(),
    };

    let name = source.project_name(project_id).await?;
    let mut game_version = constraints.game_version.clone();

    loop {
        let candidates = source.candidates(project_id, &game_version, constraints.loader).await?;
        let total = candidates.len();
        let mut filtered: Vec<FileCandidate> =
            candidates.into_iter().filter(|c| c.passes(constraints)).collect();

        debug!(%platform, project_id, %game_version, total, kept = filtered.len(), "Filtered candidates");

        if filtered.is_empty() {
            match next_version_down(&game_version).filter(|_| constraints.allow_fallback) {
                Some(next) => {
                    debug!(%platform, project_id, from = %game_version, to = %next, "Falling back to older game version");
                    game_version = next;
                    continue;
                }
                None => return Err(no_file()),
            }
        }

        // sort_by is stable: equal dates keep registry order
        filtered.sort_by(|a, b| b.release_date.cmp(&a.release_date));
        let winner = filtered.swap_remove(0);

        return into_artifact(name, winner).ok_or_else(no_file);
    }
}

fn into_artifact(name: String, candidate: FileCandidate) -> Option<RemoteArtifact> {
    let hash = candidate.hash.filter(|h| !h.trim().is_empty())?;
    let download_url = candidate.download_url.filter(|u| !u.trim().is_empty())?;
    if candidate.file_name.trim().is_empty() {
        return None;
    }

    Some(RemoteArtifact {
        name,
        file_name: candidate.file_name,
        release_date: candidate.release_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        hash,
        download_url,
    })
}
