//! Runs a [`Dialog`] against line-based terminal input.
//!
//! Each resolve runs as its own task and reports back through a oneshot channel, so
//! the dialog only ever sees the outcome as a single [`DialogInput::FetchResult`].

use async_trait::async_trait;
use colored::Colorize;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Dialog, DialogEffect, DialogInput, DialogState, Resolution};
use crate::core::MmmError;
use crate::models::{FetchConstraints, Platform};
use crate::resolver::ModResolver;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Line-oriented user interaction.
#[async_trait]
pub trait DialogIo: Send {
    /// Show `prompt` and read one line. `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;

    fn say(&mut self, message: &str);
}

/// stdin/stdout implementation of [`DialogIo`].
pub struct TerminalIo {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalIo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogIo for TerminalIo {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{} ", prompt.bold());
        std::io::stdout().flush()?;
        self.lines.next_line().await
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }
}

fn platform_menu() -> String {
    Platform::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}) {p}", i + 1))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Prompt text for a waiting state, `None` for terminal states.
fn prompt_for(state: &DialogState) -> Option<String> {
    let text = match state {
        DialogState::UnknownPlatformSelect { project_id } => {
            format!("Unknown platform for {project_id}. Choose one: {}", platform_menu())
        }
        DialogState::ModNotFoundConfirm { platform, project_id } => {
            format!("{project_id} was not found on {platform}. Look it up elsewhere? [y/n]")
        }
        DialogState::ModNotFoundSelectPlatform => format!("Choose a platform: {}", platform_menu()),
        DialogState::ModNotFoundEnterProjectId { platform } => format!("Project id on {platform}:"),
        DialogState::NoFileEnterProjectId { platform, placeholder } => {
            format!("Project id on {platform} [{placeholder}]:")
        }
        DialogState::NoFileConfirm { platform, project_id } => {
            format!("No compatible file for {project_id} on {platform}. Try {}? [y/n]", platform.alternate())
        }
        DialogState::FatalError(_) | DialogState::Done(_) | DialogState::Aborted => return None,
    };
    Some(text)
}

/// Map one line of user input to a dialog input for `state`.
///
/// End of input, `q`, `quit` and `esc` cancel. `back` and `<` go back. Anything that
/// does not fit the state yields `None`.
fn parse_input(state: &DialogState, line: Option<&str>) -> Option<DialogInput> {
    let Some(line) = line else {
        return Some(DialogInput::Cancel);
    };
    let trimmed = line.trim();
    let lowered = trimmed.to_ascii_lowercase();

    match lowered.as_str() {
        "q" | "quit" | "esc" => return Some(DialogInput::Cancel),
        "back" | "<" => return Some(DialogInput::Back),
        _ => {}
    }

    match state {
        DialogState::UnknownPlatformSelect { .. } | DialogState::ModNotFoundSelectPlatform => {
            let by_number = lowered
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| Platform::ALL.get(i).copied());
            by_number.or_else(|| lowered.parse().ok()).map(DialogInput::SelectPlatform)
        }
        DialogState::ModNotFoundConfirm { .. } | DialogState::NoFileConfirm { .. } => match lowered.as_str() {
            "y" | "yes" => Some(DialogInput::Confirm(true)),
            "n" | "no" => Some(DialogInput::Confirm(false)),
            _ => None,
        },
        DialogState::ModNotFoundEnterProjectId { .. } => {
            (!trimmed.is_empty()).then(|| DialogInput::SubmitProjectId(trimmed.to_string()))
        }
        // an empty line takes the placeholder
        DialogState::NoFileEnterProjectId { .. } => Some(DialogInput::SubmitProjectId(trimmed.to_string())),
        DialogState::FatalError(_) | DialogState::Done(_) | DialogState::Aborted => None,
    }
}

/// Drive the dialog for a failed resolve until it finishes.
///
/// Returns the resolution, [`MmmError::Aborted`] on a user cancel or when `cancel`
/// fires, or the fatal error.
#[allow(clippy::too_many_arguments)]
pub async fn run_dialog(
    error: MmmError,
    platform: Option<Platform>,
    project_id: &str,
    resolver: Arc<dyn ModResolver>,
    constraints: &FetchConstraints,
    io: &mut dyn DialogIo,
    sink: &dyn TelemetrySink,
    cancel: &CancellationToken,
) -> Result<Resolution, MmmError> {
    let (mut dialog, effects) = Dialog::start(error, platform, project_id);
    let mut queued: VecDeque<DialogInput> = VecDeque::new();
    let mut attempt = 0u32;
    perform(effects, &resolver, constraints, io, sink, cancel, &mut attempt, &mut queued).await?;

    loop {
        if let Some(outcome) = dialog.outcome() {
            return outcome;
        }

        let input = match queued.pop_front() {
            Some(input) => input,
            None => {
                let Some(prompt) = prompt_for(dialog.state()) else {
                    continue;
                };
                let line = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    line = io.read_line(&prompt) => Some(line?),
                };
                let Some(line) = line else {
                    queued.push_back(DialogInput::Cancel);
                    continue;
                };
                match parse_input(dialog.state(), line.as_deref()) {
                    Some(input) => input,
                    None => {
                        io.say(&"Invalid choice, type back to go back or q to quit".yellow().to_string());
                        continue;
                    }
                }
            }
        };

        debug!(state = dialog.state().name(), ?input, "Dialog input");
        let (next, effects) = dialog.step(input);
        dialog = next;
        perform(effects, &resolver, constraints, io, sink, cancel, &mut attempt, &mut queued).await?;
    }
}

#[allow(clippy::too_many_arguments)]
async fn perform(
    effects: Vec<DialogEffect>,
    resolver: &Arc<dyn ModResolver>,
    constraints: &FetchConstraints,
    io: &mut dyn DialogIo,
    sink: &dyn TelemetrySink,
    cancel: &CancellationToken,
    attempt: &mut u32,
    queued: &mut VecDeque<DialogInput>,
) -> Result<(), MmmError> {
    for effect in effects {
        match effect {
            DialogEffect::Telemetry(event) => sink.record(event),
            DialogEffect::StartResolve {
                seq,
                platform,
                project_id,
            } => {
                io.say(&format!("Resolving {project_id} on {platform}..."));

                let (tx, rx) = oneshot::channel();
                let task_resolver = Arc::clone(resolver);
                let task_constraints = constraints.clone();
                tokio::spawn(async move {
                    let result = task_resolver.resolve(platform, &project_id, &task_constraints).await;
                    let _ = tx.send(result);
                });

                let received = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    received = rx => Some(received),
                };
                let Some(received) = received else {
                    queued.clear();
                    queued.push_back(DialogInput::Cancel);
                    return Ok(());
                };
                let result = received.map_err(|_| MmmError::Other {
                    message: "resolve task ended without a result".to_string(),
                })?;

                *attempt += 1;
                sink.record(TelemetryEvent::ResolveAttempt {
                    source: "dialog",
                    attempt: *attempt,
                    success: result.is_ok(),
                    error_kind: result.as_ref().err().map(MmmError::kind_name),
                });
                if let Err(e) = &result {
                    io.say(&e.to_string().red().to_string());
                }
                queued.push_back(DialogInput::FetchResult {
                    seq,
                    result,
                });
            }
        }
    }
    Ok(())
}
