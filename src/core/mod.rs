//! Core types shared by every mmm module
//!
//! Currently this is the error taxonomy ([`MmmError`]) and its user-facing
//! presentation ([`ErrorContext`], [`user_friendly_error`]).

pub mod error;

pub use error::{ErrorContext, MmmError, user_friendly_error};

/// Result alias for library operations that fail with [`MmmError`].
pub type Result<T, E = MmmError> = std::result::Result<T, E>;
