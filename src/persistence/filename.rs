//! Mod file name normalization
//!
//! Lock entries must name a bare `.jar` inside the mods folder. Anything that could
//! point elsewhere (separators, drive letters, UNC prefixes) is rejected on every
//! platform, not only where the OS would interpret it.

use crate::core::MmmError;

/// Why a file name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNameIssue {
    Empty,
    UncPath,
    DriveLetter,
    PathSeparator,
    Extension,
}

impl FileNameIssue {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::UncPath => "unc_path",
            Self::DriveLetter => "drive_letter",
            Self::PathSeparator => "path_separator",
            Self::Extension => "extension",
        }
    }
}

fn invalid(value: &str, issue: FileNameIssue) -> MmmError {
    MmmError::InvalidFileName {
        value: value.to_string(),
        reason: issue.as_str().to_string(),
    }
}

/// Trim `value` and check it is a bare `.jar` file name.
pub fn normalize_file_name(value: &str) -> Result<String, MmmError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(trimmed, FileNameIssue::Empty));
    }
    if trimmed.starts_with("\\\\") || trimmed.starts_with("//") {
        return Err(invalid(trimmed, FileNameIssue::UncPath));
    }

    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(invalid(trimmed, FileNameIssue::DriveLetter));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(invalid(trimmed, FileNameIssue::PathSeparator));
    }

    let is_jar = trimmed
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("jar"));
    if !is_jar {
        return Err(invalid(trimmed, FileNameIssue::Extension));
    }

    Ok(trimmed.to_string())
}

/// File name for messages; blank names show as `(empty)`.
#[must_use]
pub fn display_file_name(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() { "(empty)" } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(value: &str) -> String {
        match normalize_file_name(value) {
            Err(MmmError::InvalidFileName { reason, .. }) => reason,
            other => panic!("expected invalid file name, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_names_are_trimmed() {
        assert_eq!(normalize_file_name("  sodium-0.5.3.jar ").unwrap(), "sodium-0.5.3.jar");
        assert_eq!(normalize_file_name("JEI.JAR").unwrap(), "JEI.JAR");
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(reason("   "), "empty");
        assert_eq!(reason("\\\\server\\share\\a.jar"), "unc_path");
        assert_eq!(reason("//server/a.jar"), "unc_path");
        assert_eq!(reason("C:evil.jar"), "drive_letter");
        assert_eq!(reason("c:\\mods\\a.jar"), "drive_letter");
        assert_eq!(reason("../a.jar"), "path_separator");
        assert_eq!(reason("mods\\a.jar"), "path_separator");
        assert_eq!(reason("a.zip"), "extension");
        assert_eq!(reason(".jar"), "extension");
        assert_eq!(reason("jar"), "extension");
    }

    #[test]
    fn test_display_file_name() {
        assert_eq!(display_file_name(" "), "(empty)");
        assert_eq!(display_file_name(" a.jar "), "a.jar");
    }
}
