//! State shared by every command: document location, output mode, cancellation and
//! the telemetry sink.

use anyhow::{Context, Result};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::MmmError;
use crate::manifest::ConfigLocation;
use crate::minecraft::MinecraftVersions;
use crate::persistence::PersistenceCoordinator;
use crate::registry::{Registries, RegistrySettings};
use crate::telemetry::{SharedSink, TelemetryEvent, TracingSink};
use crate::utils::is_interactive;

/// Everything a command needs besides its own arguments.
///
/// Built once by [`Cli`](super::Cli) and passed by reference, so tests can inject
/// their own settings, sink and interactivity.
#[derive(Clone)]
pub struct CommandContext {
    pub location: ConfigLocation,
    /// Suppress normal output and never prompt.
    pub quiet: bool,
    /// Whether stdin and stdout are a terminal.
    pub interactive: bool,
    pub settings: RegistrySettings,
    pub cancel: CancellationToken,
    pub sink: SharedSink,
}

impl CommandContext {
    /// Context for a real run: environment settings and terminal detection.
    pub fn new(config_path: impl Into<PathBuf>, quiet: bool, cancel: CancellationToken) -> Self {
        Self {
            location: ConfigLocation::new(config_path),
            quiet,
            interactive: is_interactive(),
            settings: RegistrySettings::from_env(),
            cancel,
            sink: Arc::new(TracingSink),
        }
    }

    /// Prompts are only offered to an interactive, non-quiet session.
    #[must_use]
    pub const fn can_prompt(&self) -> bool {
        self.interactive && !self.quiet
    }

    pub fn connect(&self) -> Result<Registries> {
        Registries::connect(self.settings.clone(), self.cancel.clone())
            .context("Failed to set up the registry clients")
    }

    #[must_use]
    pub fn persistence(&self) -> PersistenceCoordinator {
        PersistenceCoordinator::new(self.location.clone())
    }

    #[must_use]
    pub fn game_versions(&self, registries: &Registries) -> MinecraftVersions {
        MinecraftVersions::new(
            Arc::clone(&registries.transport),
            registries.settings.minecraft_manifest_url.clone(),
        )
    }

    /// Print a line unless quiet.
    pub fn say(&self, message: impl Display) {
        if !self.quiet {
            println!("{message}");
        }
    }

    /// Turn a user abort or Ctrl-C into success and record how the command ended.
    pub fn finish(&self, name: &'static str, result: Result<()>) -> Result<()> {
        let result = match result {
            Err(e) if is_aborted(&e) => {
                self.say("Aborted");
                Ok(())
            }
            other => other,
        };

        self.sink.record(TelemetryEvent::Command {
            name,
            success: result.is_ok(),
            exit_code: i32::from(result.is_err()),
            interactive: self.interactive,
        });
        result
    }
}

fn is_aborted(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<MmmError>(), Some(MmmError::Aborted | MmmError::Cancelled))
}
