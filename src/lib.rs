//! mmm - Minecraft Mod Manager
//!
//! Resolves mods against Modrinth and CurseForge, installs their files into a mods
//! folder and records them in a config/lock document pair, similar to a package
//! manager's manifest and lockfile.
//!
//! # Architecture Overview
//!
//! - `modlist.json` is the desired state: loader, game version, release policy and the
//!   list of managed mods.
//! - `modlist-lock.json` is the installed state: the exact file, hash and download URL
//!   of every managed mod.
//! - Mods are identified by `(platform, project id)` across both documents.
//!
//! # Core Modules
//!
//! - [`resolver`] picks one file for a mod under [`models::FetchConstraints`], with
//!   optional game-version fallback
//! - [`scan`] recognizes unmanaged jars by sha1 (Modrinth) and fingerprint (CurseForge)
//! - [`disambiguation`] the interactive dialog that recovers from a failed resolve
//! - [`persistence`] idempotent, validated writes of both documents
//!
//! # Supporting Modules
//!
//! - [`cli`] clap commands `add` and `scan`
//! - [`core`] error taxonomy and user-facing error rendering
//! - [`registry`] HTTP transport and the two registry clients
//! - [`installer`] download-and-verify of locked files
//! - [`manifest`] / [`lockfile`] the two documents
//! - [`minecraft`] latest release lookup for new configs
//! - [`telemetry`] write-only event sink
//! - [`models`], [`constants`], [`utils`]
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Add a mod; a missing config is created for the latest Minecraft release
//! mmm add modrinth sodium
//!
//! # Pin an exact CurseForge file
//! mmm add curseforge 238222 --version jei-1.20.1-forge-15.2.0.27.jar
//!
//! # Identify jars that were copied into the mods folder by hand
//! mmm scan --prefer modrinth --add
//! ```

pub mod cli;
pub mod constants;
pub mod core;
pub mod disambiguation;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod minecraft;
pub mod models;
pub mod persistence;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod telemetry;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
