//! Minecraft version manifest lookup.
//!
//! Only used when a fresh config document is created, to seed `gameVersion` with the
//! latest release.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::constants::METADATA_TIMEOUT;
use crate::core::MmmError;
use crate::registry::transport::{HttpTransport, decode_json, unexpected_status};

const SOURCE: &str = "minecraft";

#[derive(Debug, Deserialize)]
struct VersionManifest {
    latest: LatestVersions,
}

#[derive(Debug, Deserialize)]
struct LatestVersions {
    release: String,
}

/// Source of the current Minecraft release.
#[async_trait]
pub trait GameVersionSource: Send + Sync {
    async fn latest_release(&self) -> Result<String, MmmError>;
}

/// Reads `latest.release` from the launcher version manifest.
#[derive(Debug, Clone)]
pub struct MinecraftVersions {
    transport: Arc<HttpTransport>,
    manifest_url: String,
}

impl MinecraftVersions {
    pub fn new(transport: Arc<HttpTransport>, manifest_url: impl Into<String>) -> Self {
        Self {
            transport,
            manifest_url: manifest_url.into(),
        }
    }
}

#[async_trait]
impl GameVersionSource for MinecraftVersions {
    async fn latest_release(&self) -> Result<String, MmmError> {
        let response = self
            .transport
            .send(SOURCE, "get version manifest", METADATA_TIMEOUT, |c| c.get(&self.manifest_url))
            .await?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(SOURCE, "get version manifest", response.status()));
        }

        let manifest: VersionManifest = decode_json(response, SOURCE, "get version manifest").await?;
        debug!(release = %manifest.latest.release, "Latest Minecraft release");
        Ok(manifest.latest.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn versions(server: &MockServer) -> MinecraftVersions {
        let transport = Arc::new(HttpTransport::new(CancellationToken::new()).unwrap());
        MinecraftVersions::new(transport, format!("{}/manifest.json", server.uri()))
    }

    #[tokio::test]
    async fn test_latest_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latest": {"release": "1.21.1", "snapshot": "24w33a"},
                "versions": []
            })))
            .mount(&server)
            .await;

        assert_eq!(versions(&server).latest_release().await.unwrap(), "1.21.1");
    }

    #[tokio::test]
    async fn test_missing_manifest_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let result = versions(&server).latest_release().await;
        assert!(matches!(result, Err(MmmError::TransientApi { .. })));
    }
}
