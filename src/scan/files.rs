//! Finding and hashing unmanaged jars in the mods folder.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ScanCandidate;
use super::ignore::IgnoreRules;
use crate::constants::MIN_PARALLELISM;
use crate::core::MmmError;
use crate::lockfile::LockFile;
use crate::utils::fs::sha1_files_parallel;

/// Jar files in `mods_dir` that are neither ignored nor owned by a lock entry.
///
/// Sorted by path. A missing mods folder yields no files.
pub fn unmanaged_jars(mods_dir: &Path, ignore: &IgnoreRules, lock: &LockFile) -> std::io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(mods_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut jars = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let is_jar = Path::new(&file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));

        if !is_jar || ignore.is_ignored(&path) || lock.has_file_name(&file_name) {
            debug!(file = %file_name, "Skipping mods folder entry");
            continue;
        }
        jars.push(path);
    }

    jars.sort();
    Ok(jars)
}

/// Number of files hashed concurrently.
#[must_use]
pub fn hashing_parallelism() -> usize {
    std::thread::available_parallelism().map_or(MIN_PARALLELISM, |n| n.get().max(MIN_PARALLELISM))
}

/// Hash every path into a [`ScanCandidate`], preserving input order.
///
/// Each file is hashed on the blocking pool, [`hashing_parallelism`] at a time.
pub async fn hash_candidates(
    paths: Vec<PathBuf>,
    cancel: &CancellationToken,
) -> Result<Vec<ScanCandidate>, MmmError> {
    let hashed = sha1_files_parallel(paths, hashing_parallelism(), cancel).await?;
    Ok(hashed
        .into_iter()
        .map(|(path, hash)| {
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            ScanCandidate {
                path,
                file_name,
                hash,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::LockedMod;
    use crate::models::Platform;
    use crate::utils::fs::sha1_bytes;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        let mods = temp.path().join("mods");
        std::fs::create_dir_all(mods.join("nested")).unwrap();
        for name in ["b.jar", "A.JAR", "readme.txt", "old.jar.disabled", "managed.jar", "skip-me.jar"] {
            std::fs::write(mods.join(name), name.as_bytes()).unwrap();
        }
        temp
    }

    #[test]
    fn test_unmanaged_jars_filters_entries() {
        let temp = setup();
        let ignore = IgnoreRules::from_lines(temp.path(), ["mods/skip-*.jar"]);
        let lock = LockFile {
            mods: vec![LockedMod {
                platform: Platform::Modrinth,
                id: "x".to_string(),
                name: "Managed".to_string(),
                file_name: "managed.jar".to_string(),
                released_on: "2024-01-01T00:00:00Z".to_string(),
                hash: "h".to_string(),
                download_url: "https://example.com/managed.jar".to_string(),
            }],
        };

        let jars = unmanaged_jars(&temp.path().join("mods"), &ignore, &lock).unwrap();
        let names: Vec<_> = jars.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["A.JAR", "b.jar"]);
    }

    #[test]
    fn test_missing_mods_folder_is_empty() {
        let temp = TempDir::new().unwrap();
        let jars =
            unmanaged_jars(&temp.path().join("mods"), &IgnoreRules::defaults(temp.path()), &LockFile::new())
                .unwrap();
        assert!(jars.is_empty());
    }

    #[tokio::test]
    async fn test_hash_candidates_preserves_order() {
        let temp = setup();
        let paths = vec![temp.path().join("mods/b.jar"), temp.path().join("mods/A.JAR")];

        let candidates = hash_candidates(paths, &CancellationToken::new()).await.unwrap();

        assert_eq!(candidates[0].file_name, "b.jar");
        assert_eq!(candidates[0].hash, sha1_bytes(b"b.jar"));
        assert_eq!(candidates[1].file_name, "A.JAR");
    }

    #[tokio::test]
    async fn test_hash_candidates_cancelled() {
        let temp = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = hash_candidates(vec![temp.path().join("mods/b.jar")], &cancel).await;
        assert!(matches!(result, Err(MmmError::Cancelled)));
    }
}
