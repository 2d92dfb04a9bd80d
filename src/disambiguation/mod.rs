//! Interactive recovery from resolve failures
//!
//! When `add` fails with a recoverable error on an interactive terminal, this dialog
//! walks the user to a working `(platform, project id)` pair or a clean abort.
//!
//! The dialog is a pure state machine: [`Dialog::step`] consumes the dialog and one
//! [`DialogInput`] and returns the next dialog plus the [`DialogEffect`]s the caller
//! must perform. Nothing here touches the terminal or the network, which keeps every
//! path testable without a TTY. [`driver`] runs it against a real terminal.
//!
//! ```text
//! UnknownPlatformSelect ──pick──▶ resolve(picked, id)
//! ModNotFoundConfirm ──yes──▶ ModNotFoundSelectPlatform ──pick──▶ ModNotFoundEnterProjectId ──id──▶ resolve
//! NoFileConfirm ──yes──▶ NoFileEnterProjectId (alternate platform) ──id──▶ resolve
//!
//! resolve ok ─▶ Done     recoverable failure ─▶ matching state     other ─▶ FatalError
//! cancel ─▶ Aborted      back ─▶ previous state, or Aborted when there is none
//! ```
//!
//! Only one resolve is tracked at a time. Starting another while one is pending marks
//! the old one stale; its result is dropped when it arrives.

pub mod driver;

pub use driver::{DialogIo, TerminalIo, run_dialog};

use crate::core::MmmError;
use crate::models::{Platform, RemoteArtifact};
use crate::telemetry::TelemetryEvent;

/// A successful dialog outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub artifact: RemoteArtifact,
    pub platform: Platform,
    pub project_id: String,
}

#[derive(Debug, Clone)]
pub enum DialogState {
    UnknownPlatformSelect {
        project_id: String,
    },
    ModNotFoundConfirm {
        platform: Platform,
        project_id: String,
    },
    ModNotFoundSelectPlatform,
    ModNotFoundEnterProjectId {
        platform: Platform,
    },
    NoFileConfirm {
        platform: Platform,
        project_id: String,
    },
    /// `placeholder` is the project id that had no file; an empty answer reuses it.
    NoFileEnterProjectId {
        platform: Platform,
        placeholder: String,
    },
    FatalError(MmmError),
    Done(Resolution),
    Aborted,
}

impl DialogState {
    /// Stable snake_case name used in telemetry.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UnknownPlatformSelect { .. } => "unknown_platform_select",
            Self::ModNotFoundConfirm { .. } => "mod_not_found_confirm",
            Self::ModNotFoundSelectPlatform => "mod_not_found_select_platform",
            Self::ModNotFoundEnterProjectId { .. } => "mod_not_found_enter_project_id",
            Self::NoFileConfirm { .. } => "no_file_confirm",
            Self::NoFileEnterProjectId { .. } => "no_file_enter_project_id",
            Self::FatalError(_) => "fatal_error",
            Self::Done(_) => "done",
            Self::Aborted => "aborted",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::FatalError(_) | Self::Done(_) | Self::Aborted)
    }

    /// State the dialog enters after a recoverable failure for `(platform, project_id)`.
    fn for_failure(error: MmmError, platform: Option<Platform>, project_id: &str) -> Self {
        let project_id = project_id.to_string();
        match (error, platform) {
            (MmmError::UnknownPlatform { .. }, _)
            | (MmmError::ModNotFound { .. } | MmmError::NoCompatibleFile { .. }, None) => {
                Self::UnknownPlatformSelect {
                    project_id,
                }
            }
            (MmmError::ModNotFound { .. }, Some(platform)) => Self::ModNotFoundConfirm {
                platform,
                project_id,
            },
            (MmmError::NoCompatibleFile { .. }, Some(platform)) => Self::NoFileConfirm {
                platform,
                project_id,
            },
            (other, _) => Self::FatalError(other),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DialogInput {
    SelectPlatform(Platform),
    Confirm(bool),
    SubmitProjectId(String),
    Back,
    Cancel,
    /// Result of the resolve started with the same `seq`.
    FetchResult {
        seq: u64,
        result: Result<RemoteArtifact, MmmError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEffect {
    /// Resolve `(platform, project_id)` and feed the outcome back as
    /// [`DialogInput::FetchResult`] with this `seq`.
    StartResolve {
        seq: u64,
        platform: Platform,
        project_id: String,
    },
    Telemetry(TelemetryEvent),
}

/// The resolve the dialog is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub seq: u64,
    pub platform: Platform,
    pub project_id: String,
}

/// Dialog state, back history and the outstanding resolve.
#[derive(Debug, Clone)]
pub struct Dialog {
    state: DialogState,
    history: Vec<DialogState>,
    pending: Option<PendingFetch>,
    next_seq: u64,
}

impl Dialog {
    /// Enter the dialog for a failed resolve of `(platform, project_id)`.
    ///
    /// `platform` is `None` when the user's platform name did not parse. Errors that
    /// are not recoverable go straight to [`DialogState::FatalError`].
    #[must_use]
    pub fn start(error: MmmError, platform: Option<Platform>, project_id: &str) -> (Self, Vec<DialogEffect>) {
        let state = if error.is_recoverable() {
            DialogState::for_failure(error, platform, project_id)
        } else {
            DialogState::FatalError(error)
        };
        let effects = vec![transition_event(&state)];

        (
            Self {
                state,
                history: Vec::new(),
                pending: None,
                next_seq: 1,
            },
            effects,
        )
    }

    #[must_use]
    pub const fn state(&self) -> &DialogState {
        &self.state
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingFetch> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Terminal outcome, `None` while the dialog is still running.
    ///
    /// `Aborted` becomes [`MmmError::Aborted`], which callers treat as a clean exit.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<Resolution, MmmError>> {
        match &self.state {
            DialogState::Done(resolution) => Some(Ok(resolution.clone())),
            DialogState::Aborted => Some(Err(MmmError::Aborted)),
            DialogState::FatalError(e) => Some(Err(e.clone())),
            _ => None,
        }
    }

    /// Apply one input.
    #[must_use]
    pub fn step(mut self, input: DialogInput) -> (Self, Vec<DialogEffect>) {
        if self.state.is_terminal() {
            return (self, Vec::new());
        }

        let mut effects = Vec::new();
        let current = self.state.clone();
        let next = match (input, current) {
            (DialogInput::Cancel, _) => {
                self.pending = None;
                Some(DialogState::Aborted)
            }
            (DialogInput::Back, _) => {
                self.pending = None;
                Some(self.history.pop().unwrap_or(DialogState::Aborted))
            }

            (DialogInput::FetchResult { seq, result }, _) => match self.pending.take() {
                Some(pending) if pending.seq == seq => Some(self.finish_fetch(pending, result)),
                other => {
                    // stale result, keep waiting on the current one
                    self.pending = other;
                    None
                }
            },

            (DialogInput::SelectPlatform(platform), DialogState::UnknownPlatformSelect { project_id }) => {
                effects.extend(self.begin_fetch(platform, project_id));
                None
            }
            (DialogInput::SelectPlatform(platform), DialogState::ModNotFoundSelectPlatform) => {
                self.advance(DialogState::ModNotFoundEnterProjectId {
                    platform,
                })
            }

            (DialogInput::Confirm(false), DialogState::ModNotFoundConfirm { .. } | DialogState::NoFileConfirm { .. }) => {
                Some(DialogState::Aborted)
            }
            (DialogInput::Confirm(true), DialogState::ModNotFoundConfirm { .. }) => {
                self.advance(DialogState::ModNotFoundSelectPlatform)
            }
            (DialogInput::Confirm(true), DialogState::NoFileConfirm { platform, project_id }) => {
                let alternate = platform.alternate();
                self.advance(DialogState::NoFileEnterProjectId {
                    platform: alternate,
                    placeholder: project_id,
                })
            }

            (DialogInput::SubmitProjectId(project_id), DialogState::ModNotFoundEnterProjectId { platform }) => {
                let project_id = project_id.trim().to_string();
                if !project_id.is_empty() {
                    effects.extend(self.begin_fetch(platform, project_id));
                }
                None
            }
            (
                DialogInput::SubmitProjectId(project_id),
                DialogState::NoFileEnterProjectId {
                    platform,
                    placeholder,
                },
            ) => {
                let project_id = match project_id.trim() {
                    "" => placeholder.trim().to_string(),
                    id => id.to_string(),
                };
                if !project_id.is_empty() {
                    effects.extend(self.begin_fetch(platform, project_id));
                }
                None
            }

            // input that does not apply to the current state
            _ => None,
        };

        if let Some(state) = next {
            effects.push(transition_event(&state));
            self.state = state;
        }
        (self, effects)
    }

    /// Push the current state onto the history and return `next`.
    fn advance(&mut self, next: DialogState) -> Option<DialogState> {
        self.history.push(self.state.clone());
        Some(next)
    }

    fn begin_fetch(&mut self, platform: Platform, project_id: String) -> Vec<DialogEffect> {
        let mut effects = Vec::new();
        if let Some(stale) = self.pending.take() {
            effects.push(DialogEffect::Telemetry(TelemetryEvent::OverlappingFetch {
                stale_seq: stale.seq,
            }));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(PendingFetch {
            seq,
            platform,
            project_id: project_id.clone(),
        });
        effects.push(DialogEffect::StartResolve {
            seq,
            platform,
            project_id,
        });
        effects
    }

    fn finish_fetch(&mut self, pending: PendingFetch, result: Result<RemoteArtifact, MmmError>) -> DialogState {
        match result {
            Ok(artifact) => DialogState::Done(Resolution {
                artifact,
                platform: pending.platform,
                project_id: pending.project_id,
            }),
            Err(error) if error.is_recoverable() => {
                self.history.push(self.state.clone());
                DialogState::for_failure(error, Some(pending.platform), &pending.project_id)
            }
            Err(error) => DialogState::FatalError(error),
        }
    }
}

fn transition_event(state: &DialogState) -> DialogEffect {
    DialogEffect::Telemetry(TelemetryEvent::DialogTransition {
        state: state.name(),
    })
}
