//! `mmm scan`: recognize unmanaged jars in the mods folder.
//!
//! Files are hashed and looked up on the preferred registry first, then misses on the
//! other one. Matches are recorded with upsert semantics, but only when every file got
//! a definite answer: a single unsure file keeps the whole batch out of the documents.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::warn;

use super::common::CommandContext;
use crate::core::MmmError;
use crate::disambiguation::{DialogIo, TerminalIo};
use crate::lockfile::LockFile;
use crate::manifest::Manifest;
use crate::models::Platform;
use crate::persistence::{PersistOptions, UpsertOutcome, display_file_name, upsert_config_and_lock};
use crate::scan::{ContentIdentifier, Identification, IgnoreRules, hash_candidates, unmanaged_jars};

/// Identify jars in the mods folder that are not in the lock file.
#[derive(Args, Debug, Clone)]
pub struct ScanCommand {
    /// Registry to ask first: modrinth or curseforge
    #[arg(short, long, default_value = "modrinth")]
    pub prefer: Platform,

    /// Record recognized files without asking
    #[arg(short, long)]
    pub add: bool,
}

impl ScanCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let result = self.run(ctx).await;
        ctx.finish("scan", result)
    }

    async fn run(&self, ctx: &CommandContext) -> Result<()> {
        let registries = ctx.connect()?;
        let persistence = ctx.persistence();
        let (manifest, lock) =
            persistence.ensure_config_and_lock(ctx.quiet, &ctx.game_versions(&registries)).await?;

        let mods_dir = ctx.location.mods_folder(&manifest);
        let ignore = IgnoreRules::load(&ctx.location.ignore_file(), ctx.location.dir())
            .context("Failed to read the ignore file")?;
        let paths = unmanaged_jars(&mods_dir, &ignore, &lock)
            .with_context(|| format!("Failed to list {}", mods_dir.display()))?;

        if paths.is_empty() {
            ctx.say(format!("{} all mods in {} are managed", "✓".green(), mods_dir.display()));
            return Ok(());
        }

        let candidates = hash_candidates(paths, &ctx.cancel).await?;
        let identification = ContentIdentifier::from_registries(&registries)
            .identify(&candidates, self.prefer, &ctx.cancel)
            .await?;
        report(ctx, &identification);

        if identification.matches.is_empty() {
            return Ok(());
        }
        if !identification.unsure.is_empty() {
            warn!(unsure = identification.unsure.len(), "Skipping persistence, some files could not be checked");
            ctx.say(format!(
                "{} nothing recorded: {} file(s) could not be checked, run the scan again",
                "!".yellow(),
                identification.unsure.len()
            ));
            return Ok(());
        }
        if !self.should_record(ctx).await? {
            return Ok(());
        }

        let (manifest, lock, outcome) = record_matches(manifest, lock, &identification);
        if outcome.config_changed() {
            persistence.save_config(&manifest)?;
        }
        if outcome.lock_changed() {
            persistence.save_lock(&lock)?;
        }

        ctx.say(format!("{} recorded {} mod(s)", "✓".green(), identification.matches.len()));
        Ok(())
    }

    /// `--add` records right away; otherwise only an interactive session is asked.
    async fn should_record(&self, ctx: &CommandContext) -> Result<bool> {
        if self.add {
            return Ok(true);
        }
        if !ctx.can_prompt() {
            return Ok(false);
        }

        let mut io = TerminalIo::new();
        let answer = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Err(MmmError::Aborted.into()),
            line = io.read_line("Record these mods? [y/N]") => line?,
        };
        Ok(matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes" | "Yes")))
    }
}

fn report(ctx: &CommandContext, identification: &Identification) {
    for found in &identification.matches {
        ctx.say(format!(
            "{} {} is {} ({} {})",
            "✓".green(),
            display_file_name(&found.candidate.file_name),
            found.name.bold(),
            found.platform,
            found.project_id
        ));
    }
    for unknown in &identification.unknown {
        ctx.say(format!("{} {} is not known to any registry", "?".cyan(), display_file_name(&unknown.file_name)));
    }
    for unsure in &identification.unsure {
        ctx.say(format!("{} {}: {}", "!".yellow(), unsure.path.display(), unsure.error));
    }
}

/// Upsert every match; a record that fails validation is logged and skipped.
fn record_matches(
    mut manifest: Manifest,
    mut lock: LockFile,
    identification: &Identification,
) -> (Manifest, LockFile, UpsertOutcome) {
    let mut outcome = UpsertOutcome::default();

    for found in &identification.matches {
        let artifact = found.artifact();
        match upsert_config_and_lock(
            manifest.clone(),
            lock.clone(),
            found.platform,
            &found.project_id,
            &artifact,
            &PersistOptions::default(),
        ) {
            Ok((next_manifest, next_lock, changed)) => {
                manifest = next_manifest;
                lock = next_lock;
                outcome.merge(changed);
            }
            Err(e) => {
                warn!(file = %found.candidate.file_name, error = %e, "Skipping scan match");
            }
        }
    }

    (manifest, lock, outcome)
}
