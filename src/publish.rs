//! Publishing: expose sensor state to the monitoring host.
//!
//! The host-facing surface is a JSON state file per sensor, replaced
//! atomically every tick so a reader never observes a torn update. The
//! payload carries the published value (null when absent), the attribute
//! map (including `last_update` and any current diagnostics), and the
//! sensor's static metadata.

use crate::error::Result;
use crate::fs::atomic_write_file;
use crate::sensor::config::PollConfiguration;
use crate::sensor::state::SensorState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The host-facing snapshot of one sensor after a tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedPayload {
    /// Stable unique id (`cmdsense_<id>`).
    pub unique_id: String,

    /// Display name.
    pub name: String,

    /// Unit label, omitted when not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    /// The published value; null when the sensor has no value.
    pub state: Option<String>,

    /// Attribute map: rendered attributes (nulls preserved), `last_update`,
    /// and `last_error`/`template_error`/`template_result` only while the
    /// condition they describe is current.
    pub attributes: BTreeMap<String, Value>,
}

impl PublishedPayload {
    /// Build the payload for one sensor from its configuration and state.
    pub fn build(config: &PollConfiguration, state: &SensorState) -> Self {
        let mut attributes: BTreeMap<String, Value> = state
            .attributes
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Some(text) => Value::String(text.clone()),
                    None => Value::Null,
                };
                (name.clone(), rendered)
            })
            .collect();

        if let Some(last_update) = state.last_update {
            attributes.insert(
                "last_update".to_string(),
                Value::String(last_update.to_rfc3339()),
            );
        }
        if let Some(err) = &state.last_error {
            attributes.insert("last_error".to_string(), Value::String(err.clone()));
        }
        if let Some(err) = &state.template_error {
            attributes.insert("template_error".to_string(), Value::String(err.clone()));
        }
        if let Some(result) = &state.template_result {
            attributes.insert("template_result".to_string(), Value::String(result.clone()));
        }

        Self {
            unique_id: config.unique_id.clone(),
            name: config.name.clone(),
            unit_of_measurement: config.unit_of_measurement.clone(),
            state: state.value.clone(),
            attributes,
        }
    }

    /// Pretty JSON form, as written to state files and printed by `check`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::CmdsenseError::UserError(format!(
                "failed to serialize payload for '{}': {}",
                self.unique_id, e
            ))
        })
    }
}

/// The state file path for a sensor id.
pub fn state_file_path(state_dir: &Path, id: &str) -> PathBuf {
    state_dir.join(format!("{}.json", id))
}

/// Atomically write a sensor's published state.
pub fn write_state(
    state_dir: &Path,
    config: &PollConfiguration,
    state: &SensorState,
) -> Result<PathBuf> {
    let payload = PublishedPayload::build(config, state);
    let path = state_file_path(state_dir, &config.id);
    atomic_write_file(&path, &payload.to_json()?)?;
    Ok(path)
}
