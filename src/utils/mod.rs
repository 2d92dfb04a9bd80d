//! Utility modules shared across mmm
//!
//! - [`fs`] atomic writes and file hashing
//! - [`terminal`] interactive session detection

pub mod fs;
pub mod terminal;

pub use fs::{atomic_write, atomic_write_json, sha1_file};
pub use terminal::is_interactive;
