//! CurseForge API client
//!
//! Endpoints used:
//! - `GET /mods/{id}` for the project name
//! - `GET /mods/{id}/files?gameVersion=&modLoaderType=` (paginated)
//! - `POST /fingerprints/432` to match local files by fingerprint in one batch
//!
//! All calls carry the `x-api-key` header from `CURSEFORGE_API_KEY`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::transport::{HttpTransport, decode_json, unexpected_status};
use crate::constants::{CURSEFORGE_MINECRAFT_GAME_ID, METADATA_TIMEOUT};
use crate::core::MmmError;
use crate::models::{Loader, ReleaseType};

const PLATFORM: &str = "curseforge";
const PAGE_SIZE: u32 = 50;

/// `hashes[].algo` value for SHA-1.
pub const HASH_ALGO_SHA1: u8 = 1;

/// File statuses that are safe to install: approved (4) and released (10).
const ACCEPTABLE_FILE_STATUSES: [u8; 2] = [4, 10];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    index: u32,
    page_size: u32,
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct FilesPage {
    data: Vec<File>,
    pagination: Option<Pagination>,
}

/// Project (mod) metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mod {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// One uploaded file of a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: u64,
    pub mod_id: u64,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub display_name: String,
    pub file_name: String,
    /// 1 release, 2 beta, 3 alpha
    pub release_type: u8,
    pub file_status: u8,
    #[serde(default)]
    pub hashes: Vec<FileHash>,
    pub file_date: DateTime<Utc>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub sortable_game_versions: Vec<SortableGameVersion>,
    #[serde(default)]
    pub file_fingerprint: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHash {
    pub value: String,
    pub algo: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortableGameVersion {
    #[serde(default)]
    pub game_version_name: String,
}

/// One exact fingerprint match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintMatch {
    /// Project id
    pub id: u64,
    pub file: File,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintData {
    #[serde(default)]
    exact_matches: Vec<FingerprintMatch>,
}

const fn default_true() -> bool {
    true
}

impl File {
    #[must_use]
    pub fn sha1(&self) -> Option<&str> {
        self.hashes
            .iter()
            .find(|h| h.algo == HASH_ALGO_SHA1 && !h.value.is_empty())
            .map(|h| h.value.as_str())
    }

    #[must_use]
    pub const fn release_type(&self) -> Option<ReleaseType> {
        match self.release_type {
            1 => Some(ReleaseType::Release),
            2 => Some(ReleaseType::Beta),
            3 => Some(ReleaseType::Alpha),
            _ => None,
        }
    }

    /// Available and in an approved/released state.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.is_available && ACCEPTABLE_FILE_STATUSES.contains(&self.file_status)
    }

    /// Case-insensitive game version check across both version lists.
    #[must_use]
    pub fn supports_game_version(&self, game_version: &str) -> bool {
        self.sortable_game_versions
            .iter()
            .map(|v| v.game_version_name.as_str())
            .chain(self.game_versions.iter().map(String::as_str))
            .any(|v| v.eq_ignore_ascii_case(game_version))
    }
}

/// CurseForge `modLoaderType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModLoaderType {
    Any = 0,
    Forge = 1,
    Cauldron = 2,
    LiteLoader = 3,
    Fabric = 4,
    Quilt = 5,
    NeoForge = 6,
}

impl TryFrom<Loader> for ModLoaderType {
    type Error = MmmError;

    fn try_from(loader: Loader) -> Result<Self, Self::Error> {
        match loader {
            Loader::Forge => Ok(Self::Forge),
            Loader::Cauldron => Ok(Self::Cauldron),
            Loader::Liteloader => Ok(Self::LiteLoader),
            Loader::Fabric => Ok(Self::Fabric),
            Loader::Quilt => Ok(Self::Quilt),
            Loader::Neoforge => Ok(Self::NeoForge),
            other => Err(MmmError::UnknownLoader {
                loader: other.to_string(),
            }),
        }
    }
}

/// CurseForge operations the resolver and identifier rely on.
#[async_trait]
pub trait CurseforgeApi: Send + Sync {
    /// Project metadata. 404 is [`MmmError::ModNotFound`].
    async fn project(&self, project_id: &str) -> Result<Mod, MmmError>;

    /// All files compatible with one game version and loader.
    async fn files(
        &self,
        project_id: &str,
        game_version: &str,
        loader: ModLoaderType,
    ) -> Result<Vec<File>, MmmError>;

    /// Exact matches for a batch of fingerprints, in one request.
    async fn match_fingerprints(&self, fingerprints: &[u32])
    -> Result<Vec<FingerprintMatch>, MmmError>;
}

/// HTTP implementation of [`CurseforgeApi`].
#[derive(Debug, Clone)]
pub struct CurseforgeClient {
    transport: Arc<HttpTransport>,
    base_url: String,
    api_key: String,
}

impl CurseforgeClient {
    pub fn new(transport: Arc<HttpTransport>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn with_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(reqwest::header::ACCEPT, "application/json")
            .header("x-api-key", &self.api_key)
    }

    fn not_found(project_id: &str) -> MmmError {
        MmmError::ModNotFound {
            platform: PLATFORM.to_string(),
            project_id: project_id.to_string(),
        }
    }
}

#[async_trait]
impl CurseforgeApi for CurseforgeClient {
    async fn project(&self, project_id: &str) -> Result<Mod, MmmError> {
        // CurseForge project ids are numeric, a slug can never exist there
        if project_id.is_empty() || !project_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Self::not_found(project_id));
        }

        let url = format!("{}/mods/{project_id}", self.base_url);
        debug!(%url, "Fetching CurseForge project");

        let response = self
            .transport
            .send(PLATFORM, "get project", METADATA_TIMEOUT, |c| self.with_headers(c.get(&url)))
            .await?;

        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope<Mod> = decode_json(response, PLATFORM, "get project").await?;
                Ok(envelope.data)
            }
            StatusCode::NOT_FOUND => Err(Self::not_found(project_id)),
            status => Err(unexpected_status(PLATFORM, "get project", status)),
        }
    }

    async fn files(
        &self,
        project_id: &str,
        game_version: &str,
        loader: ModLoaderType,
    ) -> Result<Vec<File>, MmmError> {
        let url = format!("{}/mods/{project_id}/files", self.base_url);
        let mut files = Vec::new();
        let mut index = 0u32;

        loop {
            debug!(%url, game_version, index, "Fetching CurseForge files");
            let query = [
                ("gameVersion", game_version.to_string()),
                ("modLoaderType", (loader as u8).to_string()),
                ("index", index.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];

            let response = self
                .transport
                .send(PLATFORM, "get files", METADATA_TIMEOUT, |c| {
                    self.with_headers(c.get(&url)).query(&query)
                })
                .await?;

            let page: FilesPage = match response.status() {
                StatusCode::OK => decode_json(response, PLATFORM, "get files").await?,
                StatusCode::NOT_FOUND => return Err(Self::not_found(project_id)),
                status => return Err(unexpected_status(PLATFORM, "get files", status)),
            };

            let received = u32::try_from(page.data.len()).unwrap_or(u32::MAX);
            files.extend(page.data);

            match page.pagination {
                Some(p) if received > 0 && p.index + p.page_size.max(received) < p.total_count => {
                    index = p.index + p.page_size.max(received);
                }
                _ => break,
            }
        }

        Ok(files)
    }

    async fn match_fingerprints(
        &self,
        fingerprints: &[u32],
    ) -> Result<Vec<FingerprintMatch>, MmmError> {
        let url = format!("{}/fingerprints/{CURSEFORGE_MINECRAFT_GAME_ID}", self.base_url);
        let body = serde_json::json!({ "fingerprints": fingerprints });
        debug!(%url, count = fingerprints.len(), "Matching CurseForge fingerprints");

        let fingerprint_error = |reason: String| MmmError::FingerprintApi {
            fingerprints: fingerprints.to_vec(),
            reason,
        };

        let response = self
            .transport
            .send(PLATFORM, "match fingerprints", METADATA_TIMEOUT, |c| {
                self.with_headers(c.post(&url)).json(&body)
            })
            .await
            .map_err(|e| match e {
                MmmError::Cancelled | MmmError::Timeout { .. } => e,
                other => fingerprint_error(other.to_string()),
            })?;

        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope<FingerprintData> =
                    decode_json(response, PLATFORM, "match fingerprints")
                        .await
                        .map_err(|e| fingerprint_error(e.to_string()))?;
                Ok(envelope.data.exact_matches)
            }
            StatusCode::FORBIDDEN => Err(fingerprint_error(format!(
                "unexpected status {} (check CURSEFORGE_API_KEY)",
                StatusCode::FORBIDDEN
            ))),
            status => Err(fingerprint_error(format!("unexpected status {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CurseforgeClient {
        let transport = Arc::new(HttpTransport::new(CancellationToken::new()).unwrap());
        CurseforgeClient::new(transport, server.uri(), "key")
    }

    fn file_json(id: u64, file_name: &str, date: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "modId": 238222,
            "isAvailable": true,
            "displayName": file_name,
            "fileName": file_name,
            "releaseType": 1,
            "fileStatus": 4,
            "hashes": [{"value": "md5md5", "algo": 2}, {"value": "sha1sha1", "algo": 1}],
            "fileDate": date,
            "downloadUrl": format!("https://edge.forgecdn.net/files/{file_name}"),
            "gameVersions": ["1.20.1", "Forge"],
            "sortableGameVersions": [{"gameVersionName": "1.20.1"}],
            "fileFingerprint": 12345
        })
    }

    #[test]
    fn test_loader_mapping() {
        assert_eq!(ModLoaderType::try_from(Loader::Fabric).unwrap() as u8, 4);
        assert_eq!(ModLoaderType::try_from(Loader::Neoforge).unwrap() as u8, 6);
        assert!(matches!(
            ModLoaderType::try_from(Loader::Paper),
            Err(MmmError::UnknownLoader { .. })
        ));
    }

    #[test]
    fn test_file_helpers() {
        let mut file: File =
            serde_json::from_value(file_json(1, "jei.jar", "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(file.sha1(), Some("sha1sha1"));
        assert_eq!(file.release_type(), Some(ReleaseType::Release));
        assert!(file.is_acceptable());
        assert!(file.supports_game_version("1.20.1"));
        assert!(!file.supports_game_version("1.20"));

        file.file_status = 6;
        assert!(!file.is_acceptable());
    }

    #[tokio::test]
    async fn test_project_non_numeric_id_is_not_found() {
        let server = MockServer::start().await;
        let result = client(&server).project("jei").await;
        assert!(matches!(result, Err(MmmError::ModNotFound { .. })));
    }

    #[tokio::test]
    async fn test_project_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mods/238222"))
            .and(header("x-api-key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"data": {"id": 238222, "name": "Just Enough Items"}}),
            ))
            .mount(&server)
            .await;

        let project = client(&server).project("238222").await.unwrap();
        assert_eq!(project.name, "Just Enough Items");
    }

    #[tokio::test]
    async fn test_files_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mods/238222/files"))
            .and(query_param("index", "0"))
            .and(query_param("modLoaderType", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [file_json(1, "a.jar", "2024-01-01T00:00:00Z")],
                "pagination": {"index": 0, "pageSize": 1, "resultCount": 1, "totalCount": 2}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mods/238222/files"))
            .and(query_param("index", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [file_json(2, "b.jar", "2024-02-01T00:00:00Z")],
                "pagination": {"index": 1, "pageSize": 1, "resultCount": 1, "totalCount": 2}
            })))
            .mount(&server)
            .await;

        let files = client(&server).files("238222", "1.20.1", ModLoaderType::Forge).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jar", "b.jar"]);
    }

    #[tokio::test]
    async fn test_match_fingerprints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fingerprints/432"))
            .and(body_json(serde_json::json!({"fingerprints": [12345, 999]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "exactMatches": [{
                        "id": 238222,
                        "file": file_json(1, "jei.jar", "2024-01-01T00:00:00Z"),
                        "latestFiles": []
                    }],
                    "unmatchedFingerprints": [999]
                }
            })))
            .mount(&server)
            .await;

        let matches = client(&server).match_fingerprints(&[12345, 999]).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 238222);
        assert_eq!(matches[0].file.file_fingerprint, 12345);
    }

    #[tokio::test]
    async fn test_match_fingerprints_forbidden_mentions_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fingerprints/432"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server).match_fingerprints(&[1]).await.unwrap_err();
        assert!(matches!(err, MmmError::FingerprintApi { .. }));
        assert!(err.to_string().contains("check CURSEFORGE_API_KEY"));
    }
}
