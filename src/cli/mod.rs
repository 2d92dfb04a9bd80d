//! Command-line interface for mmm.
//!
//! Each command lives in its own module with a clap `Args` struct and an
//! `execute(self, &CommandContext)` method. [`Cli`] parses the global flags, builds the
//! shared [`CommandContext`] and dispatches.
//!
//! # Commands
//!
//! - `add <platform> <id>` resolve, install and record a mod
//! - `install` download every configured mod that is missing from the mods folder
//! - `scan` identify jars in the mods folder that are not yet managed
//!
//! # Examples
//!
//! ```bash
//! mmm add modrinth sodium
//! mmm add curseforge 238222 --version jei-1.20.1-15.2.0.27.jar
//! mmm add modrinth lithium --allow-version-fallback
//! mmm install
//! mmm scan --prefer curseforge --add
//! mmm -c ~/servers/survival/modlist.json scan
//! ```
//!
//! # Exit status
//!
//! 0 on success or when the user aborts an interactive prompt, 1 on any other error.

pub mod add;
pub mod common;
pub mod install;
pub mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub use common::CommandContext;

use crate::constants::DEFAULT_CONFIG_FILE;

/// Minecraft Mod Manager.
#[derive(Parser, Debug)]
#[command(
    name = "mmm",
    about = "Minecraft Mod Manager - resolve, identify and lock mods from Modrinth and CurseForge",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config document. The lock file and `.mmmignore` live next to it.
    #[arg(short, long, global = true, env = "MMM_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Only print errors and never prompt.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Show debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a mod on a registry, download it and record it in the config and lock.
    Add(add::AddCommand),

    /// Download every configured mod, locking the ones that have no lock entry yet.
    Install(install::InstallCommand),

    /// Identify unmanaged jars in the mods folder by hash.
    Scan(scan::ScanCommand),
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Run the selected command. `cancel` is triggered on Ctrl-C.
    pub async fn execute(self, cancel: CancellationToken) -> Result<()> {
        let ctx = CommandContext::new(self.config.clone(), self.quiet, cancel);
        self.execute_with_context(&ctx).await
    }

    /// Run with an explicit context, for tests and embedding.
    pub async fn execute_with_context(self, ctx: &CommandContext) -> Result<()> {
        match self.command {
            Commands::Add(cmd) => cmd.execute(ctx).await,
            Commands::Install(cmd) => cmd.execute(ctx).await,
            Commands::Scan(cmd) => cmd.execute(ctx).await,
        }
    }
}
