//! File system helpers: atomic document writes and streaming file hashes.

pub mod atomic;
pub mod hash;

pub use atomic::{atomic_write, atomic_write_json};
pub use hash::{sha1_bytes, sha1_file, sha1_files_parallel};
