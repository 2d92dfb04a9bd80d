//! Error handling for mmm
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can branch on the failure kind
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`MmmError`] - every failure the library can report
//! - [`ErrorContext`] - wrapper that adds suggestions and details for display
//!
//! # Error Categories
//!
//! - **Resolution**: [`MmmError::UnknownPlatform`], [`MmmError::ModNotFound`],
//!   [`MmmError::NoCompatibleFile`]. These are *recoverable*: an interactive session may
//!   hand them to the disambiguation dialog.
//! - **Transport**: [`MmmError::TransientApi`], [`MmmError::FingerprintApi`],
//!   [`MmmError::Timeout`], [`MmmError::Cancelled`]
//! - **Documents**: [`MmmError::ConfigNotFound`], [`MmmError::ConfigInvalid`],
//!   [`MmmError::LockInvalid`], [`MmmError::UnknownLoader`]
//! - **Artifacts**: [`MmmError::Validation`], [`MmmError::InvalidFileName`],
//!   [`MmmError::HashMismatch`]
//! - **Flow control**: [`MmmError::Aborted`] is a user cancel and never a failure exit.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mmm_cli::core::{MmmError, user_friendly_error};
//!
//! let error = MmmError::ModNotFound {
//!     platform: "modrinth".to_string(),
//!     project_id: "sodium".to_string(),
//! };
//! assert!(error.is_recoverable());
//!
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for mmm operations
#[derive(Error, Debug)]
pub enum MmmError {
    /// The platform name is not one of the supported registries
    #[error("unknown platform: {platform}")]
    UnknownPlatform {
        /// The platform name as given by the user
        platform: String,
    },

    /// The registry reported that the project does not exist
    ///
    /// Only raised for a definitive "not found" answer (HTTP 404). Network failures
    /// are reported as [`MmmError::TransientApi`] so they are never mistaken for absence.
    #[error("mod not found on {platform}: {project_id}")]
    ModNotFound {
        /// Registry that was queried
        platform: String,
        /// Project id or slug that was looked up
        project_id: String,
    },

    /// The project exists but no file satisfies the fetch constraints
    #[error("no compatible file found on {platform} for {project_id}")]
    NoCompatibleFile {
        /// Registry that was queried
        platform: String,
        /// Project id or slug that was looked up
        project_id: String,
    },

    /// A registry call failed for a reason other than absence
    ///
    /// Covers network errors, undecodable bodies and unexpected HTTP statuses.
    #[error("{platform} api error during {operation}: {reason}")]
    TransientApi {
        /// Registry that was queried
        platform: String,
        /// Short operation name (e.g. "get project")
        operation: String,
        /// Underlying failure description
        reason: String,
    },

    /// The batched CurseForge fingerprint lookup failed
    #[error("Fingerprints for {fingerprints:?} cannot be fetched due to an api error: {reason}")]
    FingerprintApi {
        /// Fingerprints that were part of the failed batch
        fingerprints: Vec<u32>,
        /// Underlying failure description
        reason: String,
    },

    /// A request did not complete within its deadline
    #[error("request timed out: {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
    },

    /// The run was cancelled before the operation finished
    #[error("operation cancelled")]
    Cancelled,

    /// A remote artifact failed pre-persistence validation
    #[error("{reason}")]
    Validation {
        /// Which check failed (e.g. "remote mod missing hash")
        reason: String,
    },

    /// A mod file name cannot be used as a bare file in the mods folder
    #[error("invalid mod filename {value}: {reason}")]
    InvalidFileName {
        /// The offending file name
        value: String,
        /// Machine-readable reason (empty, unc_path, drive_letter, path_separator, extension)
        reason: String,
    },

    /// The config document does not exist
    #[error("config file not found: {path}")]
    ConfigNotFound {
        /// Expected location of the config document
        path: String,
    },

    /// The config document exists but cannot be parsed
    #[error("invalid config file {path}: {reason}")]
    ConfigInvalid {
        /// Location of the config document
        path: String,
        /// Parse error
        reason: String,
    },

    /// The lock document exists but cannot be parsed
    #[error("invalid lock file {path}: {reason}")]
    LockInvalid {
        /// Location of the lock document
        path: String,
        /// Parse error
        reason: String,
    },

    /// The loader has no mapping on the target registry
    #[error("unknown loader: {loader}")]
    UnknownLoader {
        /// Loader name
        loader: String,
    },

    /// A downloaded file does not match the locked hash
    #[error("downloaded file hash mismatch for {file_name}")]
    HashMismatch {
        /// File that was downloaded
        file_name: String,
        /// Hash recorded in the lock document
        expected: String,
        /// Hash of the downloaded bytes
        actual: String,
    },

    /// The user cancelled an interactive flow
    #[error("aborted")]
    Aborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that fit no other category
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl MmmError {
    /// Whether the disambiguation dialog can recover from this failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownPlatform { .. } | Self::ModNotFound { .. } | Self::NoCompatibleFile { .. }
        )
    }

    /// Stable snake_case name used in telemetry events.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::UnknownPlatform { .. } => "unknown_platform",
            Self::ModNotFound { .. } => "mod_not_found",
            Self::NoCompatibleFile { .. } => "no_compatible_file",
            Self::TransientApi { .. } => "transient_api_error",
            Self::FingerprintApi { .. } => "fingerprint_api_error",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Validation { .. } => "validation_error",
            Self::InvalidFileName { .. } => "invalid_file_name",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::ConfigInvalid { .. } => "config_invalid",
            Self::LockInvalid { .. } => "lock_invalid",
            Self::UnknownLoader { .. } => "unknown_loader",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::Aborted => "aborted",
            Self::Io(_) => "io_error",
            Self::Other { .. } => "other",
        }
    }

    /// Shorthand for a [`MmmError::TransientApi`].
    pub fn transient(
        platform: impl Into<String>,
        operation: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::TransientApi {
            platform: platform.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

impl Clone for MmmError {
    fn clone(&self) -> Self {
        match self {
            Self::UnknownPlatform { platform } => Self::UnknownPlatform {
                platform: platform.clone(),
            },
            Self::ModNotFound { platform, project_id } => Self::ModNotFound {
                platform: platform.clone(),
                project_id: project_id.clone(),
            },
            Self::NoCompatibleFile { platform, project_id } => Self::NoCompatibleFile {
                platform: platform.clone(),
                project_id: project_id.clone(),
            },
            Self::TransientApi { platform, operation, reason } => Self::TransientApi {
                platform: platform.clone(),
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::FingerprintApi { fingerprints, reason } => Self::FingerprintApi {
                fingerprints: fingerprints.clone(),
                reason: reason.clone(),
            },
            Self::Timeout { operation } => Self::Timeout {
                operation: operation.clone(),
            },
            Self::Cancelled => Self::Cancelled,
            Self::Validation { reason } => Self::Validation {
                reason: reason.clone(),
            },
            Self::InvalidFileName { value, reason } => Self::InvalidFileName {
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::ConfigNotFound { path } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::ConfigInvalid { path, reason } => Self::ConfigInvalid {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::LockInvalid { path, reason } => Self::LockInvalid {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::UnknownLoader { loader } => Self::UnknownLoader {
                loader: loader.clone(),
            },
            Self::HashMismatch { file_name, expected, actual } => Self::HashMismatch {
                file_name: file_name.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::Aborted => Self::Aborted,
            // io::Error is not Clone, keep the kind and message
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other { message } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying optional suggestion and details for CLI display
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: MmmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: MmmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`]
///
/// [`MmmError`] values anywhere in the chain get tailored suggestions. Anything else is
/// rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(mmm_error) = error.chain().find_map(|cause| cause.downcast_ref::<MmmError>()) {
        let mut context = create_error_context(mmm_error.clone());
        let outer = error.to_string();
        if context.details.is_none() && outer != mmm_error.to_string() {
            context = context.with_details(outer);
        }
        return context;
    }

    let permission_denied = error
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(MmmError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check the permissions of the config file and the mods folder");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(MmmError::Other {
        message,
    })
}

fn create_error_context(error: MmmError) -> ErrorContext {
    match &error {
        MmmError::UnknownPlatform { .. } => ErrorContext::new(error)
            .with_suggestion("Use one of the supported platforms: curseforge, modrinth"),

        MmmError::ModNotFound { platform, .. } => {
            let suggestion = format!(
                "Check the project id or slug on {platform}, or try the other platform"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        MmmError::NoCompatibleFile { .. } => ErrorContext::new(error)
            .with_suggestion("Try --allow-version-fallback, or allow more release types in the config")
            .with_details("No file matched the configured game version, loader and release types"),

        MmmError::FingerprintApi { reason, .. } if reason.contains("403") => {
            ErrorContext::new(error).with_suggestion("Set a valid CURSEFORGE_API_KEY")
        }

        MmmError::TransientApi { .. } | MmmError::Timeout { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and try again")
            .with_details("The registry could not be reached or returned an unexpected response"),

        MmmError::ConfigNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run the command without --quiet to create a new config interactively"),

        MmmError::ConfigInvalid { .. } | MmmError::LockInvalid { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the JSON syntax of the file or restore it from a backup"),

        MmmError::HashMismatch { expected, actual, .. } => {
            let details = format!("expected sha1 {expected}, got {actual}");
            ErrorContext::new(error)
                .with_suggestion("The download may have been corrupted. Try again")
                .with_details(details)
        }

        _ => ErrorContext::new(error),
    }
}
