//! CurseForge file fingerprint
//!
//! CurseForge identifies files with a MurmurHash2 variant computed over the file
//! contents with whitespace bytes (tab, newline, carriage return, space) removed,
//! seeded with the length of that normalized content.

use std::path::Path;

use crate::core::MmmError;

const MULTIPLEX: u32 = 1_540_483_477;

const fn is_whitespace(b: u8) -> bool {
    matches!(b, 9 | 10 | 13 | 32)
}

/// Fingerprint of an in-memory buffer.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> u32 {
    let normalized_len = bytes.iter().filter(|&&b| !is_whitespace(b)).count();
    // truncation matches the registry's 32-bit length seed
    let mut hash = 1u32 ^ (normalized_len as u32);
    let mut word = 0u32;
    let mut shift = 0u32;

    for &b in bytes.iter().filter(|&&b| !is_whitespace(b)) {
        word |= u32::from(b) << shift;
        shift += 8;
        if shift == 32 {
            let k = word.wrapping_mul(MULTIPLEX);
            let k = (k ^ (k >> 24)).wrapping_mul(MULTIPLEX);
            hash = hash.wrapping_mul(MULTIPLEX) ^ k;
            word = 0;
            shift = 0;
        }
    }

    if shift > 0 {
        hash = (hash ^ word).wrapping_mul(MULTIPLEX);
    }

    let hash = (hash ^ (hash >> 13)).wrapping_mul(MULTIPLEX);
    hash ^ (hash >> 15)
}

/// Fingerprint of a file on disk, computed on the blocking pool.
pub async fn file_fingerprint(path: &Path) -> Result<u32, MmmError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || std::fs::read(&path).map(|bytes| fingerprint(&bytes)))
        .await
        .map_err(|e| MmmError::Other {
            message: format!("fingerprint task failed: {e}"),
        })?
        .map_err(MmmError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_input() {
        // seed 1 ^ 0 = 1, no tail
        let h = 1u32;
        let h = (h ^ (h >> 13)).wrapping_mul(MULTIPLEX);
        assert_eq!(fingerprint(b""), h ^ (h >> 15));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(fingerprint(b"abc def\n"), fingerprint(b"abcdef"));
        assert_eq!(fingerprint(b"\t\r\n "), fingerprint(b""));
    }

    #[test]
    fn test_content_sensitivity() {
        assert_ne!(fingerprint(b"abcdef"), fingerprint(b"abcdeg"));
        assert_ne!(fingerprint(b"abcd"), fingerprint(b"abcde"));
    }

    #[test]
    fn test_known_value() {
        // "a": seed 1^1 = 0, tail word 0x61
        let h = 0x61u32.wrapping_mul(MULTIPLEX);
        let h = (h ^ (h >> 13)).wrapping_mul(MULTIPLEX);
        assert_eq!(fingerprint(b"a"), h ^ (h >> 15));
    }

    #[tokio::test]
    async fn test_file_fingerprint_matches_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"some jar bytes\n").unwrap();
        file.flush().unwrap();

        let from_file = file_fingerprint(file.path()).await.unwrap();
        assert_eq!(from_file, fingerprint(b"some jar bytes\n"));
    }
}
