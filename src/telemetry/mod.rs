//! Write-only telemetry sink
//!
//! Core components report structured events through [`TelemetrySink`] and never read
//! them back. The default [`TracingSink`] forwards events to `tracing` under the
//! `mmm::telemetry` target, so `RUST_LOG=mmm::telemetry=info` shows them.

use std::sync::{Arc, Mutex};
use tracing::info;

/// One structured observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// One call to the version resolver.
    ResolveAttempt {
        /// `add` or `dialog`
        source: &'static str,
        attempt: u32,
        success: bool,
        error_kind: Option<&'static str>,
    },
    /// The disambiguation dialog entered a new state.
    DialogTransition {
        state: &'static str,
    },
    /// A resolve was started while another was still outstanding.
    OverlappingFetch {
        stale_seq: u64,
    },
    /// A command finished.
    Command {
        name: &'static str,
        success: bool,
        exit_code: i32,
        interactive: bool,
    },
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Shared handle passed to components.
pub type SharedSink = Arc<dyn TelemetrySink>;

/// Emits every event as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::ResolveAttempt {
                source,
                attempt,
                success,
                error_kind,
            } => info!(
                target: "mmm::telemetry",
                event = "resolve_attempt",
                source,
                attempt,
                success,
                error_kind = error_kind.unwrap_or("")
            ),
            TelemetryEvent::DialogTransition {
                state,
            } => info!(target: "mmm::telemetry", event = "dialog_transition", state),
            TelemetryEvent::OverlappingFetch {
                stale_seq,
            } => info!(target: "mmm::telemetry", event = "overlapping_fetch", stale_seq),
            TelemetryEvent::Command {
                name,
                success,
                exit_code,
                interactive,
            } => info!(
                target: "mmm::telemetry",
                event = "command",
                name,
                success,
                exit_code,
                interactive
            ),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
