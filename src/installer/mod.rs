//! Download-and-verify of locked mod files
//!
//! [`Installer::ensure_locked_file`] makes the mods folder agree with one lock entry:
//!
//! 1. **Name check**: the locked file name must be a bare `.jar` name
//! 2. **Presence check**: an existing file whose sha1 matches the lock is left alone
//! 3. **Download**: otherwise the file is streamed into a temp file in the mods folder
//!    while hashing, with cancellation checked between chunks
//! 4. **Verification**: a sha1 mismatch discards the temp file with
//!    [`MmmError::HashMismatch`]
//! 5. **Atomic install**: the verified temp file is renamed over the destination
//!
//! Hashes are compared case-insensitively.

use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::constants::DOWNLOAD_TIMEOUT;
use crate::core::MmmError;
use crate::lockfile::LockedMod;
use crate::persistence::normalize_file_name;
use crate::registry::transport::{HttpTransport, unexpected_status};
use crate::utils::sha1_file;

const SOURCE: &str = "download";

/// Why the file had to be (or did not have to be) downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureReason {
    AlreadyPresent,
    Missing,
    HashMismatch,
}

impl EnsureReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyPresent => "already_present",
            Self::Missing => "missing",
            Self::HashMismatch => "hash_mismatch",
        }
    }

    #[must_use]
    pub const fn downloaded(self) -> bool {
        !matches!(self, Self::AlreadyPresent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureResult {
    pub path: PathBuf,
    pub reason: EnsureReason,
}

/// Downloads mod files through the shared registry transport.
#[derive(Debug, Clone)]
pub struct Installer {
    transport: Arc<HttpTransport>,
}

impl Installer {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self {
            transport,
        }
    }

    /// Make sure `entry`'s file is in `mods_dir` with the locked hash.
    pub async fn ensure_locked_file(
        &self,
        mods_dir: &Path,
        entry: &LockedMod,
        cancel: &CancellationToken,
    ) -> Result<EnsureResult, MmmError> {
        let file_name = normalize_file_name(&entry.file_name)?;
        let path = mods_dir.join(&file_name);

        let reason = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let actual = sha1_file(&path, cancel).await?;
                if actual.eq_ignore_ascii_case(&entry.hash) {
                    debug!(file = %file_name, "Locked file already present");
                    return Ok(EnsureResult {
                        path,
                        reason: EnsureReason::AlreadyPresent,
                    });
                }
                EnsureReason::HashMismatch
            }
            Ok(_) => EnsureReason::Missing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EnsureReason::Missing,
            Err(e) => return Err(e.into()),
        };

        info!(file = %file_name, reason = reason.as_str(), "Downloading locked file");
        tokio::fs::create_dir_all(mods_dir).await?;
        self.download_verified(&entry.download_url, mods_dir, &path, &entry.hash, cancel).await?;

        Ok(EnsureResult {
            path,
            reason,
        })
    }

    async fn download_verified(
        &self,
        url: &str,
        mods_dir: &Path,
        destination: &Path,
        expected: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MmmError> {
        let mut response = self.transport.send(SOURCE, "get file", DOWNLOAD_TIMEOUT, |c| c.get(url)).await?;
        if !response.status().is_success() {
            return Err(unexpected_status(SOURCE, "get file", response.status()));
        }

        // same directory so the final rename stays on one filesystem
        let temp = tempfile::NamedTempFile::new_in(mods_dir)?;
        let mut file = tokio::fs::File::from_std(temp.reopen()?);
        let mut hasher = Sha1::new();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(MmmError::Cancelled),
                chunk = response.chunk() => chunk.map_err(|e| MmmError::transient(SOURCE, "read body", e))?,
            };
            let Some(bytes) = chunk else {
                break;
            };
            hasher.update(&bytes);
            file.write_all(&bytes).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(MmmError::HashMismatch {
                file_name: destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                expected: expected.to_string(),
                actual,
            });
        }

        temp.persist(destination).map_err(|e| MmmError::Io(e.error))?;
        debug!(path = %destination.display(), "Installed verified file");
        Ok(())
    }
}
