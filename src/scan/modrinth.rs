//! Modrinth exact-hash lookup.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ContentLookup, PlatformLookup, ScanCandidate, ScanMatch, ScanUnsure};
use crate::constants::SCAN_LOOKUP_CONCURRENCY;
use crate::core::MmmError;
use crate::models::Platform;
use crate::registry::ModrinthApi;
use crate::registry::modrinth::Version;

enum Outcome {
    Match(ScanMatch),
    Miss(ScanCandidate),
    Unsure(ScanUnsure),
}

/// Per-candidate `version_file` lookups, at most [`SCAN_LOOKUP_CONCURRENCY`] at a time.
pub struct ModrinthLookup {
    api: Arc<dyn ModrinthApi>,
    titles: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl ModrinthLookup {
    pub fn new(api: Arc<dyn ModrinthApi>) -> Self {
        Self {
            api,
            titles: Mutex::new(HashMap::new()),
        }
    }

    /// Project title, fetched once per project id.
    ///
    /// Candidates of the same project wait on one request; other projects are
    /// fetched concurrently. A failed fetch is retried by the next caller.
    async fn title(&self, project_id: &str) -> Result<String, MmmError> {
        let cell = {
            let mut titles = self.titles.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(titles.entry(project_id.to_string()).or_default())
        };
        let title = cell
            .get_or_try_init(|| async { Ok::<_, MmmError>(self.api.project(project_id).await?.title) })
            .await?;
        Ok(title.clone())
    }

    async fn classify(&self, candidate: &ScanCandidate, cancel: &CancellationToken) -> Result<Outcome, MmmError> {
        if cancel.is_cancelled() {
            return Err(MmmError::Cancelled);
        }

        let unsure = |error: MmmError| {
            Outcome::Unsure(ScanUnsure {
                path: candidate.path.clone(),
                error,
            })
        };

        let version = match self.api.version_from_hash(&candidate.hash).await {
            Ok(Some(version)) => version,
            Ok(None) => return Ok(Outcome::Miss(candidate.clone())),
            Err(MmmError::Cancelled) => return Err(MmmError::Cancelled),
            Err(e) => return Ok(unsure(e)),
        };

        let name = match self.title(&version.project_id).await {
            Ok(name) => name,
            Err(MmmError::Cancelled) => return Err(MmmError::Cancelled),
            Err(e) => return Ok(unsure(e)),
        };

        let download_url = matching_file_url(&version, &candidate.hash);
        if download_url.is_empty() {
            return Ok(unsure(MmmError::transient(
                Platform::Modrinth.as_str(),
                "lookup hash",
                format!("version {} has no download url", version.id),
            )));
        }

        Ok(Outcome::Match(ScanMatch {
            candidate: candidate.clone(),
            platform: Platform::Modrinth,
            project_id: version.project_id.clone(),
            name,
            release_date: version.date_published.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            download_url,
        }))
    }
}

/// URL of the file whose sha1 matches, else of the main file.
fn matching_file_url(version: &Version, sha1: &str) -> String {
    version
        .files
        .iter()
        .find(|f| f.hashes.sha1.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(sha1)))
        .or_else(|| version.main_file())
        .map(|f| f.url.clone())
        .unwrap_or_default()
}

#[async_trait]
impl ContentLookup for ModrinthLookup {
    fn platform(&self) -> Platform {
        Platform::Modrinth
    }

    async fn lookup(
        &self,
        candidates: &[ScanCandidate],
        cancel: &CancellationToken,
    ) -> Result<PlatformLookup, MmmError> {
        let lookups: Vec<_> = candidates.iter().map(|candidate| self.classify(candidate, cancel)).collect();
        let outcomes: Vec<Result<Outcome, MmmError>> =
            stream::iter(lookups).buffered(SCAN_LOOKUP_CONCURRENCY).collect().await;

        let mut result = PlatformLookup::default();
        for outcome in outcomes {
            match outcome? {
                Outcome::Match(m) => result.matches.push(m),
                Outcome::Miss(c) => result.misses.push(c),
                Outcome::Unsure(u) => result.unsure.push(u),
            }
        }

        debug!(
            matches = result.matches.len(),
            misses = result.misses.len(),
            unsure = result.unsure.len(),
            "Modrinth hash lookup finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeModrinth, modrinth_version};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    fn candidate(name: &str, hash: &str) -> ScanCandidate {
        ScanCandidate {
            path: PathBuf::from(format!("/mods/{name}")),
            file_name: name.to_string(),
            hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn test_classifies_match_miss_and_unsure() {
        let api = Arc::new(
            FakeModrinth::new()
                .with_project("abc", "Sodium")
                .with_hash(
                    "aaaa",
                    modrinth_version("abc", "0.5.3", "2024-01-01T00:00:00Z", &["1.20.1"], "aaaa", "sodium.jar"),
                )
                .with_hash_error("cccc", MmmError::transient("modrinth", "lookup hash", "500 Internal Server Error")),
        );
        let lookup = ModrinthLookup::new(api);

        let result = lookup
            .lookup(
                &[candidate("sodium.jar", "aaaa"), candidate("x.jar", "bbbb"), candidate("y.jar", "cccc")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!(m.project_id, "abc");
        assert_eq!(m.name, "Sodium");
        assert_eq!(m.release_date, "2024-01-01T00:00:00Z");
        assert_eq!(m.download_url, "https://cdn.modrinth.com/data/abc/sodium.jar");
        assert_eq!(result.misses, vec![candidate("x.jar", "bbbb")]);
        assert_eq!(result.unsure.len(), 1);
        assert!(matches!(result.unsure[0].error, MmmError::TransientApi { .. }));
    }

    #[tokio::test]
    async fn test_title_fetched_once_per_project() {
        let version = modrinth_version("abc", "1.0", "2024-01-01T00:00:00Z", &["1.20.1"], "aaaa", "a.jar");
        let mut other = version.clone();
        other.files[0].hashes.sha1 = Some("bbbb".to_string());
        let api = Arc::new(
            FakeModrinth::new().with_project("abc", "Same").with_hash("aaaa", version).with_hash("bbbb", other),
        );
        let lookup = ModrinthLookup::new(api.clone());

        let result = lookup
            .lookup(&[candidate("a.jar", "aaaa"), candidate("b.jar", "bbbb")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.matches.len(), 2);
        assert_eq!(api.project_calls.load(Ordering::SeqCst), 1);
    }

    /// Answers `project` only once two title requests are in flight at the same time.
    struct PairedTitles {
        inner: FakeModrinth,
        gate: tokio::sync::Barrier,
    }

    #[async_trait]
    impl ModrinthApi for PairedTitles {
        async fn project(&self, project_id: &str) -> Result<crate::registry::modrinth::Project, MmmError> {
            self.gate.wait().await;
            self.inner.project(project_id).await
        }

        async fn versions(
            &self,
            project_id: &str,
            game_version: &str,
            loader: crate::models::Loader,
        ) -> Result<Vec<Version>, MmmError> {
            self.inner.versions(project_id, game_version, loader).await
        }

        async fn version_from_hash(&self, sha1: &str) -> Result<Option<Version>, MmmError> {
            self.inner.version_from_hash(sha1).await
        }
    }

    #[tokio::test]
    async fn test_titles_of_different_projects_fetch_concurrently() {
        let api = Arc::new(PairedTitles {
            inner: FakeModrinth::new()
                .with_project("abc", "Sodium")
                .with_project("def", "Lithium")
                .with_hash("aaaa", modrinth_version("abc", "1.0", "2024-01-01T00:00:00Z", &["1.20.1"], "aaaa", "a.jar"))
                .with_hash("bbbb", modrinth_version("def", "1.0", "2024-01-01T00:00:00Z", &["1.20.1"], "bbbb", "b.jar")),
            gate: tokio::sync::Barrier::new(2),
        });
        let lookup = ModrinthLookup::new(api);
        let candidates = [candidate("a.jar", "aaaa"), candidate("b.jar", "bbbb")];

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            lookup.lookup(&candidates, &CancellationToken::new()),
        )
        .await
        .expect("title fetches were serialized")
        .unwrap();

        let names: Vec<_> = result.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Sodium", "Lithium"]);
    }

    #[tokio::test]
    async fn test_missing_download_url_is_unsure() {
        let mut version = modrinth_version("abc", "1.0", "2024-01-01T00:00:00Z", &["1.20.1"], "aaaa", "a.jar");
        version.files[0].url = String::new();
        let api = Arc::new(FakeModrinth::new().with_project("abc", "A").with_hash("aaaa", version));

        let result =
            ModrinthLookup::new(api).lookup(&[candidate("a.jar", "aaaa")], &CancellationToken::new()).await.unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.unsure.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_any_call() {
        let api = Arc::new(FakeModrinth::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = ModrinthLookup::new(api.clone()).lookup(&[candidate("a.jar", "aaaa")], &cancel).await;

        assert!(matches!(result, Err(MmmError::Cancelled)));
        assert_eq!(api.total_calls(), 0);
    }
}
