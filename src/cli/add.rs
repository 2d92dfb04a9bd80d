//! `mmm add <platform> <id>`: resolve a mod, install its file and record it.
//!
//! A mod already present in both documents is not resolved again; its locked file is
//! only checked (and re-downloaded when missing or corrupt). A recoverable resolve
//! failure opens the disambiguation dialog when a terminal is attached.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use super::common::CommandContext;
use crate::core::MmmError;
use crate::disambiguation::{Resolution, TerminalIo, run_dialog};
use crate::installer::Installer;
use crate::manifest::Manifest;
use crate::models::{FetchConstraints, Platform};
use crate::persistence::{PersistOptions, locked_mod};
use crate::resolver::{ModResolver, VersionResolver};
use crate::telemetry::TelemetryEvent;

/// Add a mod from Modrinth or CurseForge.
#[derive(Args, Debug, Clone)]
pub struct AddCommand {
    /// Registry to resolve from: modrinth or curseforge
    pub platform: String,

    /// Project id or slug on that registry
    pub id: String,

    /// Pin an exact version number (Modrinth) or file name (CurseForge)
    #[arg(long)]
    pub version: Option<String>,

    /// Try older game versions when nothing matches the configured one
    #[arg(long)]
    pub allow_version_fallback: bool,
}

impl AddCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let result = self.run(ctx).await;
        ctx.finish("add", result)
    }

    async fn run(&self, ctx: &CommandContext) -> Result<()> {
        let registries = ctx.connect()?;
        let persistence = ctx.persistence();
        let (manifest, lock) =
            persistence.ensure_config_and_lock(ctx.quiet, &ctx.game_versions(&registries)).await?;
        let mods_dir = ctx.location.mods_folder(&manifest);
        let installer = Installer::new(Arc::clone(&registries.transport));

        let platform = self.platform.parse::<Platform>();
        if let Ok(platform) = platform {
            let locked = lock.find_mod(platform, &self.id).filter(|_| manifest.find_mod(platform, &self.id).is_some());
            if let Some(locked) = locked {
                let ensured = installer.ensure_locked_file(&mods_dir, locked, &ctx.cancel).await?;
                let status = if ensured.reason.downloaded() {
                    format!("re-downloaded ({})", ensured.reason.as_str())
                } else {
                    "already installed".to_string()
                };
                ctx.say(format!("{} {} is {}", "✓".green(), locked.name.bold(), status));
                return Ok(());
            }
        }

        let platform_hint = platform.as_ref().ok().copied();
        let constraints = self.constraints(&manifest, platform_hint);
        let resolver: Arc<dyn ModResolver> = Arc::new(VersionResolver::from_registries(&registries));

        let first = match platform {
            Ok(platform) => resolver.resolve(platform, &self.id, &constraints).await.map(|artifact| Resolution {
                artifact,
                platform,
                project_id: self.id.clone(),
            }),
            Err(e) => Err(e),
        };
        ctx.sink.record(TelemetryEvent::ResolveAttempt {
            source: "add",
            attempt: 1,
            success: first.is_ok(),
            error_kind: first.as_ref().err().map(MmmError::kind_name),
        });

        let resolution = match first {
            Ok(resolution) => resolution,
            Err(e) if e.is_recoverable() && ctx.can_prompt() => {
                ctx.say(format!("{} {e}", "!".yellow()));
                let mut io = TerminalIo::new();
                run_dialog(
                    e,
                    platform_hint,
                    &self.id,
                    Arc::clone(&resolver),
                    &constraints,
                    &mut io,
                    ctx.sink.as_ref(),
                    &ctx.cancel,
                )
                .await?
            }
            Err(e) => return Err(e.into()),
        };

        let Resolution {
            artifact,
            platform,
            project_id,
        } = resolution;

        // validated before anything touches the mods folder
        let entry = locked_mod(platform, &project_id, &artifact)?;
        let installed = installer
            .ensure_locked_file(&mods_dir, &entry, &ctx.cancel)
            .await
            .with_context(|| format!("Failed to install {}", entry.file_name))?;

        let options = PersistOptions {
            version: self.version.clone(),
            allow_version_fallback: self.allow_version_fallback,
        };
        let (_, _, outcome) =
            persistence.ensure_persisted(manifest, lock, platform, &project_id, &artifact, &options)?;

        tracing::debug!(%platform, project_id = %project_id, ?outcome, "Add finished");
        ctx.say(format!(
            "{} {} ({platform} {project_id}) -> {}",
            "Added".green().bold(),
            artifact.name,
            installed.path.display()
        ));
        Ok(())
    }

    /// Resolution policy from the config document, the existing entry and the flags.
    fn constraints(&self, manifest: &Manifest, platform: Option<Platform>) -> FetchConstraints {
        let entry = platform.and_then(|p| manifest.find_mod(p, &self.id));
        let pinned = self.version.clone().filter(|v| !v.trim().is_empty());

        FetchConstraints {
            allowed_release_types: manifest.release_types_for(entry),
            game_version: manifest.game_version.clone(),
            loader: manifest.loader,
            allow_fallback: self.allow_version_fallback
                || entry.and_then(|e| e.allow_version_fallback).unwrap_or(false),
            fixed_version: pinned.or_else(|| entry.and_then(|e| e.version.clone())),
        }
    }
}
