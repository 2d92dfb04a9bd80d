//! In-memory registries implementing [`ModrinthApi`] and [`CurseforgeApi`].
//!
//! Responses are keyed the same way the real APIs are queried, so tests can describe a
//! registry snapshot and then count how often each endpoint was hit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::MmmError;
use crate::models::{Loader, ReleaseType};
use crate::registry::curseforge::{self, FingerprintMatch, ModLoaderType};
use crate::registry::modrinth::{self, FileHashes, VersionFile};
use crate::registry::{CurseforgeApi, ModrinthApi};

fn date(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map(|d| d.with_timezone(&Utc)).unwrap_or_default()
}

/// Build a Modrinth version with a single primary file.
pub fn modrinth_version(
    project_id: &str,
    version_number: &str,
    published: &str,
    game_versions: &[&str],
    sha1: &str,
    file_name: &str,
) -> modrinth::Version {
    modrinth::Version {
        id: format!("{project_id}-{version_number}"),
        project_id: project_id.to_string(),
        name: Some(version_number.to_string()),
        version_number: version_number.to_string(),
        version_type: ReleaseType::Release,
        status: Some("listed".to_string()),
        date_published: date(published),
        game_versions: game_versions.iter().map(|v| (*v).to_string()).collect(),
        loaders: vec!["fabric".to_string()],
        files: vec![VersionFile {
            hashes: FileHashes {
                sha1: Some(sha1.to_string()),
                sha512: None,
            },
            url: format!("https://cdn.modrinth.com/data/{project_id}/{file_name}"),
            filename: file_name.to_string(),
            primary: true,
            size: 1,
        }],
    }
}

/// Build an approved CurseForge release file.
pub fn curseforge_file(
    mod_id: u64,
    file_name: &str,
    published: &str,
    game_versions: &[&str],
    sha1: &str,
    fingerprint: u32,
) -> curseforge::File {
    curseforge::File {
        id: u64::from(fingerprint),
        mod_id,
        is_available: true,
        display_name: file_name.to_string(),
        file_name: file_name.to_string(),
        release_type: 1,
        file_status: 4,
        hashes: vec![curseforge::FileHash {
            value: sha1.to_string(),
            algo: curseforge::HASH_ALGO_SHA1,
        }],
        file_date: date(published),
        download_url: Some(format!("https://edge.forgecdn.net/files/{file_name}")),
        game_versions: game_versions.iter().map(|v| (*v).to_string()).collect(),
        sortable_game_versions: game_versions
            .iter()
            .map(|v| curseforge::SortableGameVersion {
                game_version_name: (*v).to_string(),
            })
            .collect(),
        file_fingerprint: fingerprint,
    }
}

/// In-memory Modrinth.
#[derive(Default)]
pub struct FakeModrinth {
    projects: Mutex<HashMap<String, Result<String, MmmError>>>,
    versions: Mutex<HashMap<(String, String), Vec<modrinth::Version>>>,
    hashes: Mutex<HashMap<String, Result<modrinth::Version, MmmError>>>,
    pub project_calls: AtomicUsize,
    pub version_calls: AtomicUsize,
    pub hash_calls: AtomicUsize,
}

impl FakeModrinth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_project(self, id: &str, title: &str) -> Self {
        self.projects.lock().unwrap().insert(id.to_string(), Ok(title.to_string()));
        self
    }

    #[must_use]
    pub fn with_project_error(self, id: &str, error: MmmError) -> Self {
        self.projects.lock().unwrap().insert(id.to_string(), Err(error));
        self
    }

    /// Versions returned for `(project, game_version)`.
    #[must_use]
    pub fn with_versions(self, id: &str, game_version: &str, versions: Vec<modrinth::Version>) -> Self {
        self.versions.lock().unwrap().insert((id.to_string(), game_version.to_string()), versions);
        self
    }

    #[must_use]
    pub fn with_hash(self, sha1: &str, version: modrinth::Version) -> Self {
        self.hashes.lock().unwrap().insert(sha1.to_string(), Ok(version));
        self
    }

    #[must_use]
    pub fn with_hash_error(self, sha1: &str, error: MmmError) -> Self {
        self.hashes.lock().unwrap().insert(sha1.to_string(), Err(error));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.project_calls.load(Ordering::SeqCst)
            + self.version_calls.load(Ordering::SeqCst)
            + self.hash_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModrinthApi for FakeModrinth {
    async fn project(&self, project_id: &str) -> Result<modrinth::Project, MmmError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        match self.projects.lock().unwrap().get(project_id) {
            Some(Ok(title)) => Ok(modrinth::Project {
                id: project_id.to_string(),
                slug: None,
                title: title.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(MmmError::ModNotFound {
                platform: "modrinth".to_string(),
                project_id: project_id.to_string(),
            }),
        }
    }

    async fn versions(
        &self,
        project_id: &str,
        game_version: &str,
        _loader: Loader,
    ) -> Result<Vec<modrinth::Version>, MmmError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        let key = (project_id.to_string(), game_version.to_string());
        Ok(self.versions.lock().unwrap().get(&key).cloned().unwrap_or_default())
    }

    async fn version_from_hash(&self, sha1: &str) -> Result<Option<modrinth::Version>, MmmError> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        match self.hashes.lock().unwrap().get(sha1) {
            Some(Ok(version)) => Ok(Some(version.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }
}

/// In-memory CurseForge.
#[derive(Default)]
pub struct FakeCurseforge {
    projects: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<(String, String), Vec<curseforge::File>>>,
    fingerprints: Mutex<HashMap<u32, FingerprintMatch>>,
    fingerprint_error: Mutex<Option<String>>,
    /// Every batch passed to `match_fingerprints`, in call order.
    pub fingerprint_batches: Mutex<Vec<Vec<u32>>>,
    pub project_calls: AtomicUsize,
    pub file_calls: AtomicUsize,
}

impl FakeCurseforge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_project(self, id: &str, name: &str) -> Self {
        self.projects.lock().unwrap().insert(id.to_string(), name.to_string());
        self
    }

    #[must_use]
    pub fn with_files(self, id: &str, game_version: &str, files: Vec<curseforge::File>) -> Self {
        self.files.lock().unwrap().insert((id.to_string(), game_version.to_string()), files);
        self
    }

    /// Register an exact match for the file's `file_fingerprint`.
    #[must_use]
    pub fn with_fingerprint(self, file: curseforge::File) -> Self {
        let matched = FingerprintMatch {
            id: file.mod_id,
            file,
        };
        self.fingerprints.lock().unwrap().insert(matched.file.file_fingerprint, matched);
        self
    }

    /// Make every fingerprint batch fail with `reason`.
    #[must_use]
    pub fn with_fingerprint_error(self, reason: &str) -> Self {
        *self.fingerprint_error.lock().unwrap() = Some(reason.to_string());
        self
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.fingerprint_batches.lock().unwrap().len()
    }
}

#[async_trait]
impl CurseforgeApi for FakeCurseforge {
    async fn project(&self, project_id: &str) -> Result<curseforge::Mod, MmmError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        match self.projects.lock().unwrap().get(project_id) {
            Some(name) => Ok(curseforge::Mod {
                id: project_id.parse().unwrap_or_default(),
                name: name.clone(),
                slug: None,
            }),
            None => Err(MmmError::ModNotFound {
                platform: "curseforge".to_string(),
                project_id: project_id.to_string(),
            }),
        }
    }

    async fn files(
        &self,
        project_id: &str,
        game_version: &str,
        _loader: ModLoaderType,
    ) -> Result<Vec<curseforge::File>, MmmError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let key = (project_id.to_string(), game_version.to_string());
        Ok(self.files.lock().unwrap().get(&key).cloned().unwrap_or_default())
    }

    async fn match_fingerprints(&self, fingerprints: &[u32]) -> Result<Vec<FingerprintMatch>, MmmError> {
        self.fingerprint_batches.lock().unwrap().push(fingerprints.to_vec());
        if let Some(reason) = self.fingerprint_error.lock().unwrap().clone() {
            return Err(MmmError::FingerprintApi {
                fingerprints: fingerprints.to_vec(),
                reason,
            });
        }
        let known = self.fingerprints.lock().unwrap();
        Ok(fingerprints.iter().filter_map(|fp| known.get(fp).cloned()).collect())
    }
}
