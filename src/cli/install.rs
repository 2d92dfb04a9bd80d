//! `mmm install`: make the mods folder match the config and lock documents.
//!
//! Locked mods are checked and re-downloaded when missing or corrupt. Configured mods
//! without a lock entry are resolved, downloaded and locked. Integrity problems with a
//! single mod are reported and counted; the run continues with the next mod and fails
//! at the end.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

use super::common::CommandContext;
use crate::core::MmmError;
use crate::installer::Installer;
use crate::lockfile::{LockFile, LockedMod};
use crate::manifest::{Manifest, ModEntry};
use crate::models::FetchConstraints;
use crate::persistence::{display_file_name, locked_mod};
use crate::resolver::{ModResolver, VersionResolver};

/// Download every configured mod that is missing from the mods folder.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallCommand {}

/// What happened to one configured mod.
#[derive(Debug)]
enum ModOutcome {
    Present,
    Downloaded,
    /// Resolved and downloaded for the first time; carries the new lock entry.
    Locked(LockedMod),
    /// Not resolvable right now; reported, not counted as a failure.
    Skipped(MmmError),
    /// Integrity problem with this mod only.
    Failed(MmmError),
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let result = self.run(ctx).await;
        ctx.finish("install", result)
    }

    async fn run(&self, ctx: &CommandContext) -> Result<()> {
        let registries = ctx.connect()?;
        let persistence = ctx.persistence();
        // never creates a config: there is nothing to install without one
        let (mut manifest, mut lock) =
            persistence.ensure_config_and_lock(true, &ctx.game_versions(&registries)).await?;
        let mods_dir = ctx.location.mods_folder(&manifest);
        let installer = Installer::new(Arc::clone(&registries.transport));
        let resolver: Arc<dyn ModResolver> = Arc::new(VersionResolver::from_registries(&registries));

        let mut failed = 0usize;
        let mut config_changed = false;
        let mut lock_changed = false;

        for index in 0..manifest.mods.len() {
            let entry = manifest.mods[index].clone();
            debug!(platform = %entry.platform, id = %entry.id, version = entry.version.as_deref().unwrap_or("latest"), "Checking mod");

            let outcome =
                install_one(&manifest, &lock, &entry, &mods_dir, &installer, resolver.as_ref(), ctx).await?;
            match outcome {
                ModOutcome::Present => {}
                ModOutcome::Downloaded => {
                    ctx.say(format!("{} {} was missing, downloaded it", "↓".cyan(), entry.name.bold()));
                }
                ModOutcome::Locked(locked) => {
                    ctx.say(format!("{} {} installed from {}", "↓".cyan(), locked.name.bold(), entry.platform));
                    if manifest.mods[index].name != locked.name {
                        manifest.mods[index].name.clone_from(&locked.name);
                        config_changed = true;
                    }
                    lock.mods.push(locked);
                    lock_changed = true;
                }
                ModOutcome::Skipped(e) => {
                    ctx.say(format!("{} {}: {e}", "✗".red(), entry.name.bold()));
                }
                ModOutcome::Failed(e) => {
                    error!(platform = %entry.platform, id = %entry.id, error = %e, "Mod could not be installed");
                    ctx.say(format!("{} {}: {e}", "✗".red(), entry.name.bold()));
                    failed += 1;
                }
            }
        }

        if lock_changed {
            persistence.save_lock(&lock)?;
        }
        if config_changed {
            persistence.save_config(&manifest)?;
        }

        if failed > 0 {
            return Err(anyhow!("{failed} mod(s) could not be installed"));
        }
        ctx.say(format!("{} all mods are installed", "✓".green()));
        Ok(())
    }
}

/// Bring one configured mod into the mods folder.
///
/// Returns `Err` only for failures that should stop the whole run.
async fn install_one(
    manifest: &Manifest,
    lock: &LockFile,
    entry: &ModEntry,
    mods_dir: &Path,
    installer: &Installer,
    resolver: &dyn ModResolver,
    ctx: &CommandContext,
) -> Result<ModOutcome, MmmError> {
    if let Some(locked) = lock.find_mod(entry.platform, &entry.id) {
        return match installer.ensure_locked_file(mods_dir, locked, &ctx.cancel).await {
            Ok(ensured) if ensured.reason.downloaded() => Ok(ModOutcome::Downloaded),
            Ok(_) => Ok(ModOutcome::Present),
            Err(e) if is_integrity_error(&e) => Ok(ModOutcome::Failed(e)),
            Err(e) => Err(e),
        };
    }

    let artifact = match resolver.resolve(entry.platform, &entry.id, &constraints_for(manifest, entry)).await {
        Ok(artifact) => artifact,
        Err(e @ (MmmError::ModNotFound { .. } | MmmError::NoCompatibleFile { .. })) => {
            return Ok(ModOutcome::Skipped(e));
        }
        Err(e) => return Err(e),
    };

    let locked = match locked_mod(entry.platform, &entry.id, &artifact) {
        Ok(locked) => locked,
        Err(e) => {
            debug!(file = %display_file_name(&artifact.file_name), "Rejected resolved file");
            return Ok(ModOutcome::Failed(e));
        }
    };

    match installer.ensure_locked_file(mods_dir, &locked, &ctx.cancel).await {
        Ok(_) => Ok(ModOutcome::Locked(locked)),
        Err(e) if is_integrity_error(&e) => Ok(ModOutcome::Failed(e)),
        Err(e) => Err(e),
    }
}

fn is_integrity_error(error: &MmmError) -> bool {
    matches!(
        error,
        MmmError::HashMismatch { .. } | MmmError::InvalidFileName { .. } | MmmError::Validation { .. }
    )
}

/// Resolution policy for a configured mod.
fn constraints_for(manifest: &Manifest, entry: &ModEntry) -> FetchConstraints {
    FetchConstraints {
        allowed_release_types: manifest.release_types_for(Some(entry)),
        game_version: manifest.game_version.clone(),
        loader: manifest.loader,
        allow_fallback: entry.allow_version_fallback.unwrap_or(false),
        fixed_version: entry.version.clone().filter(|v| !v.trim().is_empty()),
    }
}
