//! Streaming SHA-1 of files on disk.

use futures::stream::{self, StreamExt, TryStreamExt};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::constants::HASH_CHUNK_SIZE;
use crate::core::MmmError;

/// Compute the lowercase hex SHA-1 of a file on the blocking thread pool.
pub async fn sha1_file(path: &Path, cancel: &CancellationToken) -> Result<String, MmmError> {
    let path = path.to_path_buf();
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || sha1_file_blocking(&path, &cancel)).await.map_err(join_error)?
}

/// Compute the lowercase hex SHA-1 of a file on the current thread.
///
/// Reads in [`HASH_CHUNK_SIZE`] chunks and checks `cancel` before each one.
pub fn sha1_file_blocking(path: &Path, cancel: &CancellationToken) -> Result<String, MmmError> {
    if cancel.is_cancelled() {
        return Err(MmmError::Cancelled);
    }

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        if cancel.is_cancelled() {
            return Err(MmmError::Cancelled);
        }
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash each path on its own blocking task, at most `parallelism` at a time.
///
/// Results keep the input order. The first failure fails the whole batch.
pub async fn sha1_files_parallel(
    paths: Vec<PathBuf>,
    parallelism: usize,
    cancel: &CancellationToken,
) -> Result<Vec<(PathBuf, String)>, MmmError> {
    let tasks = paths.into_iter().map(|path| {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || sha1_file_blocking(&path, &cancel).map(|hash| (path, hash)))
    });

    stream::iter(tasks)
        .buffered(parallelism.max(1))
        .map(|joined| match joined {
            Ok(hashed) => hashed,
            Err(e) => Err(join_error(e)),
        })
        .try_collect()
        .await
}

fn join_error(error: tokio::task::JoinError) -> MmmError {
    MmmError::Other {
        message: format!("hashing task failed: {error}"),
    }
}

/// SHA-1 of an in-memory buffer, lowercase hex.
#[must_use]
pub fn sha1_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_sha1_file_matches_known_digest() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let hash = sha1_file(file.path(), &CancellationToken::new()).await.unwrap();
        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(hash, sha1_bytes(b"hello world"));
    }

    #[tokio::test]
    async fn test_sha1_file_spanning_chunks() {
        let content = vec![7u8; HASH_CHUNK_SIZE * 2 + 17];
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        let hash = sha1_file(file.path(), &CancellationToken::new()).await.unwrap();
        assert_eq!(hash, sha1_bytes(&content));
    }

    #[tokio::test]
    async fn test_sha1_file_observes_cancellation() {
        let file = NamedTempFile::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sha1_file(file.path(), &cancel).await;
        assert!(matches!(result, Err(MmmError::Cancelled)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sha1_files_parallel_keeps_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths: Vec<_> = (0..8)
            .map(|i| {
                let path = dir.path().join(format!("{i}.jar"));
                std::fs::write(&path, vec![i as u8; HASH_CHUNK_SIZE + i]).unwrap();
                path
            })
            .collect();

        let hashed = sha1_files_parallel(paths.clone(), 3, &CancellationToken::new()).await.unwrap();

        assert_eq!(hashed.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(), paths);
        for (i, (_, hash)) in hashed.iter().enumerate() {
            assert_eq!(hash, &sha1_bytes(&vec![i as u8; HASH_CHUNK_SIZE + i]));
        }
    }

    #[tokio::test]
    async fn test_sha1_files_parallel_fails_on_missing_file() {
        let result = sha1_files_parallel(
            vec![PathBuf::from("/definitely/not/here.jar")],
            4,
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(MmmError::Io(_))));
    }

    #[tokio::test]
    async fn test_sha1_file_missing() {
        let result = sha1_file(Path::new("/definitely/not/here.jar"), &CancellationToken::new()).await;
        assert!(matches!(result, Err(MmmError::Io(_))));
    }
}
