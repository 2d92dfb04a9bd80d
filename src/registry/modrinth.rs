//! Modrinth API client
//!
//! Endpoints used:
//! - `GET /v2/project/{id}` for the project title
//! - `GET /v2/project/{id}/version` filtered by game version and loader
//! - `GET /v2/version_file/{sha1}?algorithm=sha1` for content identification

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::transport::{HttpTransport, decode_json, unexpected_status};
use crate::constants::METADATA_TIMEOUT;
use crate::core::MmmError;
use crate::models::{Loader, ReleaseType};

const PLATFORM: &str = "modrinth";

/// Project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
}

/// One published version of a project.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub version_number: String,
    pub version_type: ReleaseType,
    /// `listed`, `archived`, `draft`, `unlisted`, `scheduled` or `unknown`
    #[serde(default)]
    pub status: Option<String>,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFile {
    pub hashes: FileHashes,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileHashes {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
}

impl Version {
    /// The primary file, or the first one when none is flagged.
    #[must_use]
    pub fn main_file(&self) -> Option<&VersionFile> {
        self.files.iter().find(|f| f.primary).or_else(|| self.files.first())
    }

    /// Whether the version is publicly downloadable.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        matches!(self.status.as_deref(), None | Some("listed" | "archived" | "unlisted"))
    }
}

/// Modrinth operations the resolver and identifier rely on.
#[async_trait]
pub trait ModrinthApi: Send + Sync {
    /// Project metadata. 404 is [`MmmError::ModNotFound`].
    async fn project(&self, project_id: &str) -> Result<Project, MmmError>;

    /// Versions compatible with one game version and loader.
    async fn versions(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Loader,
    ) -> Result<Vec<Version>, MmmError>;

    /// Version owning a file with this sha1, `None` when Modrinth does not know it.
    async fn version_from_hash(&self, sha1: &str) -> Result<Option<Version>, MmmError>;
}

/// HTTP implementation of [`ModrinthApi`].
#[derive(Debug, Clone)]
pub struct ModrinthClient {
    transport: Arc<HttpTransport>,
    base_url: String,
    api_key: Option<String>,
}

impl ModrinthClient {
    pub fn new(transport: Arc<HttpTransport>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn get(&self, client: &reqwest::Client, url: &str) -> reqwest::RequestBuilder {
        let request = client.get(url).header(reqwest::header::ACCEPT, "application/json");
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, key),
            None => request,
        }
    }
}

#[async_trait]
impl ModrinthApi for ModrinthClient {
    async fn project(&self, project_id: &str) -> Result<Project, MmmError> {
        let url = format!("{}/v2/project/{project_id}", self.base_url);
        debug!(%url, "Fetching Modrinth project");

        let response = self
            .transport
            .send(PLATFORM, "get project", METADATA_TIMEOUT, |c| self.get(c, &url))
            .await?;

        match response.status() {
            StatusCode::OK => decode_json(response, PLATFORM, "get project").await,
            StatusCode::NOT_FOUND => Err(MmmError::ModNotFound {
                platform: PLATFORM.to_string(),
                project_id: project_id.to_string(),
            }),
            status => Err(unexpected_status(PLATFORM, "get project", status)),
        }
    }

    async fn versions(
        &self,
        project_id: &str,
        game_version: &str,
        loader: Loader,
    ) -> Result<Vec<Version>, MmmError> {
        let url = format!("{}/v2/project/{project_id}/version", self.base_url);
        let query = [
            ("game_versions", serde_json::json!([game_version]).to_string()),
            ("loaders", serde_json::json!([loader.as_str()]).to_string()),
        ];
        debug!(%url, game_version, %loader, "Fetching Modrinth versions");

        let response = self
            .transport
            .send(PLATFORM, "get versions", METADATA_TIMEOUT, |c| self.get(c, &url).query(&query))
            .await?;

        match response.status() {
            StatusCode::OK => decode_json(response, PLATFORM, "get versions").await,
            StatusCode::NOT_FOUND => Err(MmmError::ModNotFound {
                platform: PLATFORM.to_string(),
                project_id: project_id.to_string(),
            }),
            status => Err(unexpected_status(PLATFORM, "get versions", status)),
        }
    }

    async fn version_from_hash(&self, sha1: &str) -> Result<Option<Version>, MmmError> {
        let url = format!("{}/v2/version_file/{sha1}", self.base_url);

        let response = self
            .transport
            .send(PLATFORM, "lookup hash", METADATA_TIMEOUT, |c| {
                self.get(c, &url).query(&[("algorithm", "sha1")])
            })
            .await?;

        match response.status() {
            StatusCode::OK => decode_json(response, PLATFORM, "lookup hash").await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(unexpected_status(PLATFORM, "lookup hash", status)),
        }
    }
}
