//! Poll configuration for a single sensor.
//!
//! A [`PollConfiguration`] is immutable for the duration of a
//! reconfiguration epoch: it is built from a validated registry entry,
//! handed to the poll driver, and replaced wholesale when the operator
//! reconfigures the sensor. It is never mutated field-by-field while a poll
//! is in flight.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default execution timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Maximum allowed execution timeout in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Default poll interval in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECONDS: u64 = 30;

/// Immutable per-epoch configuration for one sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfiguration {
    /// Stable identifier, used for the state file name.
    pub id: String,

    /// Stable unique id exposed to the publishing host (`cmdsense_<id>`).
    pub unique_id: String,

    /// Display name exposed to the publishing host.
    pub name: String,

    /// Command template. Rendered against an empty variable set before
    /// execution, then run as a single shell command.
    pub command: String,

    /// Optional template deriving the published value from the output.
    pub value_template: Option<String>,

    /// Attribute name -> template. Each renders independently per tick.
    pub attribute_templates: BTreeMap<String, String>,

    /// Execution timeout for the child process.
    pub timeout: Duration,

    /// Interval between poll ticks.
    pub scan_interval: Duration,

    /// Optional unit label. Empty strings are normalized to absent.
    pub unit_of_measurement: Option<String>,

    /// Retention policy: keep the previously published value on transient
    /// failure (and suppress sentinel renders) instead of publishing null.
    pub keep_last_value: bool,
}

impl PollConfiguration {
    /// Build a configuration with defaults for everything but id, name and
    /// command. Mostly useful for tests and the `check` command.
    pub fn new(id: &str, name: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            unique_id: unique_id_for(id),
            name: name.to_string(),
            command: command.to_string(),
            value_template: None,
            attribute_templates: BTreeMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECONDS),
            unit_of_measurement: None,
            keep_last_value: false,
        }
    }

    /// Timeout in whole seconds, as configured.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout.as_secs()
    }
}

/// The unique id exposed for a sensor id.
pub fn unique_id_for(id: &str) -> String {
    format!("cmdsense_{}", id)
}
