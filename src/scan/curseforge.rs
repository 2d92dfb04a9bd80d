//! CurseForge fingerprint lookup.
//!
//! Every candidate is fingerprinted locally, then all unique fingerprints go out in a
//! single batch request. A failed batch marks each candidate unsure with its own
//! fingerprint in the error.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ContentLookup, PlatformLookup, ScanCandidate, ScanMatch, ScanUnsure};
use crate::constants::SCAN_LOOKUP_CONCURRENCY;
use crate::core::MmmError;
use crate::models::Platform;
use crate::registry::CurseforgeApi;
use crate::registry::curseforge::FingerprintMatch;
use crate::registry::fingerprint::file_fingerprint;

pub struct CurseforgeLookup {
    api: Arc<dyn CurseforgeApi>,
    names: Mutex<HashMap<u64, Arc<OnceCell<String>>>>,
}

impl CurseforgeLookup {
    pub fn new(api: Arc<dyn CurseforgeApi>) -> Self {
        Self {
            api,
            names: Mutex::new(HashMap::new()),
        }
    }

    /// Mod name, fetched once per mod id without blocking lookups of other mods.
    async fn name(&self, mod_id: u64) -> Result<String, MmmError> {
        let cell = {
            let mut names = self.names.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(names.entry(mod_id).or_default())
        };
        let name = cell
            .get_or_try_init(|| async { Ok::<_, MmmError>(self.api.project(&mod_id.to_string()).await?.name) })
            .await?;
        Ok(name.clone())
    }

    async fn to_match(
        &self,
        candidate: &ScanCandidate,
        found: &FingerprintMatch,
        cancel: &CancellationToken,
    ) -> Result<Result<ScanMatch, MmmError>, MmmError> {
        if cancel.is_cancelled() {
            return Err(MmmError::Cancelled);
        }

        let name = match self.name(found.id).await {
            Ok(name) => name,
            Err(MmmError::Cancelled) => return Err(MmmError::Cancelled),
            Err(e) => return Ok(Err(e)),
        };

        let download_url = found.file.download_url.clone().unwrap_or_default();
        if download_url.is_empty() {
            return Ok(Err(MmmError::transient(
                Platform::Curseforge.as_str(),
                "match fingerprints",
                format!("file {} has no download url", found.file.id),
            )));
        }

        Ok(Ok(ScanMatch {
            candidate: candidate.clone(),
            platform: Platform::Curseforge,
            project_id: found.id.to_string(),
            name,
            release_date: found.file.file_date.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            download_url,
        }))
    }
}

#[async_trait]
impl ContentLookup for CurseforgeLookup {
    fn platform(&self) -> Platform {
        Platform::Curseforge
    }

    async fn lookup(
        &self,
        candidates: &[ScanCandidate],
        cancel: &CancellationToken,
    ) -> Result<PlatformLookup, MmmError> {
        let mut result = PlatformLookup::default();
        if candidates.is_empty() {
            return Ok(result);
        }

        let mut fingerprinted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if cancel.is_cancelled() {
                return Err(MmmError::Cancelled);
            }
            match file_fingerprint(&candidate.path).await {
                Ok(fp) => fingerprinted.push((candidate, fp)),
                Err(e) => result.unsure.push(ScanUnsure {
                    path: candidate.path.clone(),
                    error: e,
                }),
            }
        }

        let unique: Vec<u32> = fingerprinted.iter().map(|(_, fp)| *fp).collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            return Ok(result);
        }
        if cancel.is_cancelled() {
            return Err(MmmError::Cancelled);
        }

        let found = match self.api.match_fingerprints(&unique).await {
            Ok(found) => found,
            Err(MmmError::Cancelled) => return Err(MmmError::Cancelled),
            Err(e) => {
                let reason = match &e {
                    MmmError::FingerprintApi { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                warn!(count = unique.len(), %reason, "CurseForge fingerprint lookup failed");
                for (candidate, fp) in fingerprinted {
                    result.unsure.push(ScanUnsure {
                        path: candidate.path.clone(),
                        error: MmmError::FingerprintApi {
                            fingerprints: vec![fp],
                            reason: reason.clone(),
                        },
                    });
                }
                return Ok(result);
            }
        };

        let by_fingerprint: HashMap<u32, &FingerprintMatch> =
            found.iter().map(|m| (m.file.file_fingerprint, m)).collect();

        let lookups: Vec<_> = fingerprinted
            .iter()
            .map(|&(candidate, fp)| {
                let found = by_fingerprint.get(&fp).copied();
                async move {
                    match found {
                        Some(found) => Ok::<_, MmmError>(Some(self.to_match(candidate, found, cancel).await?)),
                        None => Ok(None),
                    }
                }
            })
            .collect();
        let outcomes: Vec<Result<Option<Result<ScanMatch, MmmError>>, MmmError>> =
            stream::iter(lookups).buffered(SCAN_LOOKUP_CONCURRENCY).collect().await;

        for (&(candidate, _), outcome) in fingerprinted.iter().zip(outcomes) {
            match outcome? {
                Some(Ok(m)) => result.matches.push(m),
                Some(Err(error)) => result.unsure.push(ScanUnsure {
                    path: candidate.path.clone(),
                    error,
                }),
                None => result.misses.push(candidate.clone()),
            }
        }

        debug!(
            fingerprints = unique.len(),
            matches = result.matches.len(),
            misses = result.misses.len(),
            unsure = result.unsure.len(),
            "CurseForge fingerprint lookup finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fingerprint::fingerprint;
    use crate::test_utils::{FakeCurseforge, curseforge_file};
    use tempfile::TempDir;

    fn write(temp: &TempDir, name: &str, content: &[u8]) -> ScanCandidate {
        let path = temp.path().join(name);
        std::fs::write(&path, content).unwrap();
        ScanCandidate {
            path,
            file_name: name.to_string(),
            hash: crate::utils::fs::sha1_bytes(content),
        }
    }

    #[tokio::test]
    async fn test_single_batch_with_unique_fingerprints() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.jar", b"same bytes");
        let b = write(&temp, "b.jar", b"same bytes");
        let c = write(&temp, "c.jar", b"other bytes");
        let fp_same = fingerprint(b"same bytes");

        let api = Arc::new(
            FakeCurseforge::new()
                .with_project("100", "Shared")
                .with_fingerprint(curseforge_file(100, "a.jar", "2024-02-03T04:05:06Z", &["1.20.1"], &a.hash, fp_same)),
        );
        let lookup = CurseforgeLookup::new(api.clone());

        let result = lookup.lookup(&[a, b, c.clone()], &CancellationToken::new()).await.unwrap();

        let batches = api.fingerprint_batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| m.name == "Shared" && m.project_id == "100"));
        assert_eq!(result.matches[0].release_date, "2024-02-03T04:05:06Z");
        assert_eq!(result.misses, vec![c]);
        assert_eq!(api.project_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_failure_is_per_candidate_unsure() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.jar", b"aaa");
        let b = write(&temp, "b.jar", b"bbb");
        let api = Arc::new(FakeCurseforge::new().with_fingerprint_error("403 Forbidden (check CURSEFORGE_API_KEY)"));

        let result = CurseforgeLookup::new(api).lookup(&[a, b], &CancellationToken::new()).await.unwrap();

        assert!(result.matches.is_empty());
        assert!(result.misses.is_empty());
        assert_eq!(result.unsure.len(), 2);
        match &result.unsure[0].error {
            MmmError::FingerprintApi { fingerprints, reason } => {
                assert_eq!(fingerprints, &vec![fingerprint(b"aaa")]);
                assert!(reason.contains("403"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(result.unsure[0].error.to_string().contains(&fingerprint(b"aaa").to_string()));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_unsure_without_request() {
        let temp = TempDir::new().unwrap();
        let missing = ScanCandidate {
            path: temp.path().join("gone.jar"),
            file_name: "gone.jar".to_string(),
            hash: "x".to_string(),
        };
        let api = Arc::new(FakeCurseforge::new());

        let result = CurseforgeLookup::new(api.clone()).lookup(&[missing], &CancellationToken::new()).await.unwrap();

        assert_eq!(result.unsure.len(), 1);
        assert_eq!(api.fingerprint_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_download_url_is_unsure() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.jar", b"aaa");
        let mut file = curseforge_file(7, "a.jar", "2024-01-01T00:00:00Z", &["1.20.1"], &a.hash, fingerprint(b"aaa"));
        file.download_url = None;
        let api = Arc::new(FakeCurseforge::new().with_project("7", "Seven").with_fingerprint(file));

        let result = CurseforgeLookup::new(api).lookup(&[a], &CancellationToken::new()).await.unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.unsure.len(), 1);
    }
}
