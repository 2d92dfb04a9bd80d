//! Registry adapters for the resolver
//!
//! Each adapter turns one registry's version/file listing into [`FileCandidate`]s.
//! Only the field names, the hash algorithm and the loader mapping differ between them;
//! the selection algorithm in [`super`] is shared.

use async_trait::async_trait;
use std::sync::Arc;

use super::{FileCandidate, VersionSource};
use crate::core::MmmError;
use crate::models::{Loader, Platform};
use crate::registry::curseforge::{self, ModLoaderType};
use crate::registry::modrinth;
use crate::registry::{CurseforgeApi, ModrinthApi};

/// Modrinth: versions keyed by `version_number`, sha1 from the primary file.
pub struct ModrinthSource {
    api: Arc<dyn ModrinthApi>,
}

impl ModrinthSource {
    pub fn new(api: Arc<dyn ModrinthApi>) -> Self {
        Self {
            api,
        }
    }
}

fn modrinth_candidate(version: modrinth::Version, game_version: &str) -> FileCandidate {
    let file = version.main_file();
    FileCandidate {
        file_name: file.map(|f| f.filename.clone()).unwrap_or_default(),
        release_date: version.date_published,
        release_type: Some(version.version_type),
        matches_game_version: version.game_versions.iter().any(|v| v == game_version),
        acceptable: version.is_acceptable(),
        version_keys: vec![version.version_number.clone()],
        keys_ignore_case: false,
        hash: file.and_then(|f| f.hashes.sha1.clone()),
        download_url: file.map(|f| f.url.clone()),
    }
}

#[async_trait]
impl VersionSource for ModrinthSource {
    fn platform(&self) -> Platform {
        Platform::Modrinth
    }

    async fn project_name(&self, project_id: &str) -> Result<String, MmmError> {
        Ok(self.api.project(project_id).await?.title)
    }

    async fn candidates(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Loader,
    ) -> Result<Vec<FileCandidate>, MmmError> {
        let versions = self.api.versions(project_id, game_version, loader).await?;
        Ok(versions.into_iter().map(|v| modrinth_candidate(v, game_version)).collect())
    }
}

/// CurseForge: files keyed by file/display name, sha1 from `hashes`.
pub struct CurseforgeSource {
    api: Arc<dyn CurseforgeApi>,
}

impl CurseforgeSource {
    pub fn new(api: Arc<dyn CurseforgeApi>) -> Self {
        Self {
            api,
        }
    }
}

fn curseforge_candidate(file: curseforge::File, game_version: &str) -> FileCandidate {
    FileCandidate {
        release_date: file.file_date,
        release_type: file.release_type(),
        matches_game_version: file.supports_game_version(game_version),
        acceptable: file.is_acceptable(),
        version_keys: vec![file.file_name.clone(), file.display_name.clone()],
        keys_ignore_case: true,
        hash: file.sha1().map(str::to_string),
        download_url: file.download_url.clone(),
        file_name: file.file_name,
    }
}

#[async_trait]
impl VersionSource for CurseforgeSource {
    fn platform(&self) -> Platform {
        Platform::Curseforge
    }

    async fn project_name(&self, project_id: &str) -> Result<String, MmmError> {
        Ok(self.api.project(project_id).await?.name)
    }

    async fn candidates(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Loader,
    ) -> Result<Vec<FileCandidate>, MmmError> {
        let loader_type = ModLoaderType::try_from(loader)?;
        let files = self.api.files(project_id, game_version, loader_type).await?;
        Ok(files.into_iter().map(|f| curseforge_candidate(f, game_version)).collect())
    }
}
