//! Test utilities shared by unit and integration tests
//!
//! - [`init_test_logging`] one-time tracing setup
//! - [`registry`] in-memory Modrinth and CurseForge implementations
//! - [`TestProject`] a temp directory with a config, lock and mods folder

pub mod registry;

pub use registry::{FakeCurseforge, FakeModrinth, curseforge_file, modrinth_version};

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::lockfile::LockFile;
use crate::manifest::{ConfigLocation, Manifest};
use crate::models::Loader;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; does nothing when neither is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// A throwaway project directory holding `modlist.json`.
pub struct TestProject {
    pub temp: TempDir,
    pub location: ConfigLocation,
}

impl TestProject {
    /// Empty directory, no config written yet.
    pub fn empty() -> Self {
        let temp = TempDir::new().unwrap();
        let location = ConfigLocation::new(temp.path().join("modlist.json"));
        Self {
            temp,
            location,
        }
    }

    /// Directory with a fabric 1.20.1 config, an empty lock and a `mods` folder.
    pub fn new() -> Self {
        let project = Self::empty();
        project.write_manifest(&Manifest::new(Loader::Fabric, "1.20.1"));
        LockFile::new().save(&project.location.lock_path()).unwrap();
        std::fs::create_dir_all(project.mods_dir()).unwrap();
        project
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.location.config_path().to_path_buf()
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.temp.path().join("mods")
    }

    pub fn write_manifest(&self, manifest: &Manifest) {
        manifest.save(self.location.config_path()).unwrap();
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::load(self.location.config_path()).unwrap()
    }

    pub fn lock(&self) -> LockFile {
        LockFile::load(&self.location.lock_path()).unwrap()
    }

    /// Write a file into the mods folder and return its path.
    pub fn add_mod_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.mods_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
