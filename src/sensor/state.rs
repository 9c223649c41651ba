//! Sensor state and the per-tick reconciler.
//!
//! [`SensorState`] is the only mutable data that survives across poll ticks,
//! and it is only ever replaced as a unit at the end of a tick: a reader can
//! never observe output from tick N mixed with attributes from tick N-1.
//!
//! Diagnostics (`last_error`, `template_error`, `template_result`) are
//! explicit optional fields rebuilt from scratch every tick rather than keys
//! accumulated in a map, so "present only when the condition is current" is
//! a construction-time decision.

use crate::sensor::project::Projection;
use crate::sensor::runner::RawOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Rendered template values that are suppressed under the retention policy
/// instead of being published, compared case-insensitively. Raw output
/// published without a value template is never subject to suppression.
pub const SENTINEL_RESULTS: [&str; 4] = ["false", "none", "unknown", "unavailable"];

/// Published state of one sensor after a poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorState {
    /// The published value. `None` renders as null to the host.
    pub value: Option<String>,

    /// Rendered attributes from the most recent tick whose projection ran.
    /// A per-attribute template failure is a `None` value.
    pub attributes: BTreeMap<String, Option<String>>,

    /// Timestamp of the most recent tick, set exactly once per tick.
    pub last_update: Option<DateTime<Utc>>,

    /// Process-level failure message from the current tick, if any.
    pub last_error: Option<String>,

    /// Value-template failure message from the current tick, if any.
    pub template_error: Option<String>,

    /// The sentinel string whose publication was suppressed this tick, if
    /// any (retention policy only).
    pub template_result: Option<String>,
}

impl SensorState {
    /// Initial state at sensor construction: null value, no attributes, no
    /// diagnostics.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Whether a rendered value is one of the suppression sentinels.
fn is_sentinel(rendered: &str) -> bool {
    let lowered = rendered.to_lowercase();
    SENTINEL_RESULTS.iter().any(|s| *s == lowered)
}

/// Merge one tick's outcome into the previous state.
///
/// `projection` must be provided when (and only when) the outcome is
/// [`RawOutcome::Success`]; on any process-level failure the templates never
/// ran, so process failure takes precedence by construction. The returned
/// state is complete: callers replace the previous state with it wholesale.
pub fn reconcile(
    previous: &SensorState,
    outcome: &RawOutcome,
    projection: Option<&Projection>,
    keep_last_value: bool,
    now: DateTime<Utc>,
) -> SensorState {
    let message = match outcome {
        RawOutcome::Success { .. } => {
            let projection = projection.cloned().unwrap_or_default();
            return reconcile_success(previous, projection, keep_last_value, now);
        }
        RawOutcome::SpawnFailure { error } => error.clone(),
        RawOutcome::Timeout { elapsed } => {
            format!("command timed out after {} seconds", elapsed.as_secs())
        }
        RawOutcome::NonZeroExit {
            stderr, exit_code, ..
        } => exit_failure_message(stderr, *exit_code),
    };
    reconcile_failure(previous, message, keep_last_value, now)
}

/// A tick whose process ran to a zero exit: classify the projection.
fn reconcile_success(
    previous: &SensorState,
    projection: Projection,
    keep_last_value: bool,
    now: DateTime<Utc>,
) -> SensorState {
    // The projection ran, so the attribute map is replaced wholesale; a
    // failed attribute is already null in it.
    let attributes = projection.attributes;

    if let Some(err) = projection.value_error {
        return SensorState {
            value: retained_value(previous, keep_last_value),
            attributes,
            last_update: Some(now),
            last_error: None,
            template_error: Some(err),
            template_result: None,
        };
    }

    let from_template = projection.value_from_template;
    let rendered = projection.value.unwrap_or_default();

    // Only a templated value can hit the sentinel set: without a value
    // template the raw output is published exactly as produced.
    if keep_last_value && from_template && is_sentinel(&rendered) {
        return SensorState {
            value: previous.value.clone(),
            attributes,
            last_update: Some(now),
            last_error: None,
            template_error: None,
            template_result: Some(rendered),
        };
    }

    SensorState {
        value: Some(rendered),
        attributes,
        last_update: Some(now),
        last_error: None,
        template_error: None,
        template_result: None,
    }
}

/// A tick that failed before any template ran: the previous attribute map is
/// kept (there is nothing to replace it with) and only `last_error` is set.
fn reconcile_failure(
    previous: &SensorState,
    message: String,
    keep_last_value: bool,
    now: DateTime<Utc>,
) -> SensorState {
    SensorState {
        value: retained_value(previous, keep_last_value),
        attributes: previous.attributes.clone(),
        last_update: Some(now),
        last_error: Some(message),
        template_error: None,
        template_result: None,
    }
}

fn retained_value(previous: &SensorState, keep_last_value: bool) -> Option<String> {
    if keep_last_value {
        previous.value.clone()
    } else {
        None
    }
}

/// Diagnostic for a non-zero exit: trimmed stderr when the command said
/// anything, the exit code otherwise.
fn exit_failure_message(stderr: &[u8], exit_code: i32) -> String {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if stderr.is_empty() {
        format!("command exited with code {}", exit_code)
    } else {
        stderr
    }
}
