//! Poll driver: one tick of the pipeline, plus between-tick reconfiguration.
//!
//! A tick runs runner, interpreter, projector and reconciler in sequence,
//! exactly once, and always yields a complete new [`SensorState`] — a tick
//! can never fail out of the polling loop. Ticks for one sensor are
//! strictly sequential (the caller loops over `poll_once`), so no overlap
//! is possible.

use crate::sensor::config::PollConfiguration;
use crate::sensor::interpret::interpret;
use crate::sensor::project::project;
use crate::sensor::runner::{RawOutcome, run};
use crate::sensor::state::{SensorState, reconcile};
use chrono::Utc;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// Execute one poll tick and produce the next state.
///
/// Infallible by contract: process failures, template failures and even
/// panics inside the pipeline all degrade into diagnostic state rather than
/// propagating to the caller.
pub fn poll_once(config: &PollConfiguration, previous: &SensorState) -> SensorState {
    match catch_unwind(AssertUnwindSafe(|| tick(config, previous))) {
        Ok(state) => state,
        Err(panic) => {
            let message = panic_message(panic);
            error!(sensor = %config.id, "unexpected error during poll tick: {}", message);
            let outcome = RawOutcome::SpawnFailure {
                error: format!("unexpected error during poll tick: {}", message),
            };
            reconcile(previous, &outcome, None, config.keep_last_value, Utc::now())
        }
    }
}

fn tick(config: &PollConfiguration, previous: &SensorState) -> SensorState {
    let outcome = run(&config.command, config.timeout);
    let now = Utc::now();

    match &outcome {
        RawOutcome::Success { stdout, .. } => {
            let variables = interpret(stdout);
            let projection = project(
                &variables,
                config.value_template.as_deref(),
                &config.attribute_templates,
            );
            debug!(sensor = %config.id, value = ?projection.value, "poll tick succeeded");
            reconcile(
                previous,
                &outcome,
                Some(&projection),
                config.keep_last_value,
                now,
            )
        }
        _ => reconcile(previous, &outcome, None, config.keep_last_value, now),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Single-slot mailbox for pending reconfiguration.
///
/// Reconfiguration never mutates a live [`PollConfiguration`]: the new
/// configuration is stored here and the polling loop swaps it in between
/// ticks, never while a tick is running. Storing twice before a tick keeps
/// only the newest configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSlot {
    pending: Arc<Mutex<Option<Arc<PollConfiguration>>>>,
}

impl ConfigSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a new configuration, replacing any undelivered one.
    pub fn store(&self, config: PollConfiguration) {
        let mut slot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(config));
    }

    /// Take the pending configuration, if any. Called by the polling loop
    /// between ticks.
    pub fn take(&self) -> Option<Arc<PollConfiguration>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
