//! Sensor registry: the `sensors.yaml` configuration file.
//!
//! # File Format
//!
//! ```yaml
//! sensors:
//!   disk_usage:
//!     name: "Disk Usage"
//!     command: "df --output=pcent / | tail -1"
//!     timeout_seconds: 10
//!     scan_interval_seconds: 60
//!     value_template: "{value}"
//!     attribute_templates:
//!       raw: "{value}"
//!     unit_of_measurement: "%"
//!     keep_last_value: true
//!
//! defaults:
//!   timeout_seconds: 60
//!   scan_interval_seconds: 30
//! ```
//!
//! Sensor ids are slugs (`[a-z0-9_]`). Display names are de-duplicated on
//! registration (`Name`, `Name 2`, `Name 3`, ...). Attribute templates
//! entered on the command line arrive as a JSON object payload and are
//! validated by [`parse_attribute_payload`].

use crate::error::{CmdsenseError, Result};
use crate::fs::atomic_write_file;
use crate::sensor::config::{
    DEFAULT_SCAN_INTERVAL_SECONDS, DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS, PollConfiguration,
    unique_id_for,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The sensor registry, loaded from `sensors.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorRegistry {
    /// Sensor configurations keyed by id.
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorConfig>,

    /// Default settings applied where a sensor leaves a field unset.
    #[serde(default)]
    pub defaults: RegistryDefaults,
}

/// Default settings for sensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryDefaults {
    /// Default execution timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Default poll interval in seconds.
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            scan_interval_seconds: default_scan_interval_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_scan_interval_seconds() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECONDS
}

/// Configuration for a single sensor as written by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Display name exposed to the publishing host.
    #[serde(default)]
    pub name: String,

    /// Command template to execute each tick.
    pub command: String,

    /// Execution timeout in seconds (overrides the default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Poll interval in seconds (overrides the default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval_seconds: Option<u64>,

    /// Optional template deriving the published value from the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,

    /// Attribute name -> template.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_templates: BTreeMap<String, String>,

    /// Optional unit label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    /// Keep the previously published value on transient failure.
    #[serde(default)]
    pub keep_last_value: bool,
}

impl SensorRegistry {
    /// Load the registry from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    /// Returns `Err` if the file exists but cannot be parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CmdsenseError::UserError(format!(
                "failed to read sensor registry '{}': {}",
                path.display(),
                e
            ))
        })?;

        let registry = Self::from_yaml(&content)?;
        Ok(Some(registry))
    }

    /// Parse a registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let registry: SensorRegistry = serde_yaml::from_str(yaml)
            .map_err(|e| CmdsenseError::ConfigError(format!("failed to parse sensors.yaml: {}", e)))?;

        registry.validate()?;
        Ok(registry)
    }

    /// Serialize the registry to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            CmdsenseError::UserError(format!("failed to serialize sensor registry: {}", e))
        })
    }

    /// Atomically write the registry to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        atomic_write_file(path, &self.to_yaml()?)
    }

    /// Validate the registry.
    ///
    /// Validation rules:
    /// - Sensor ids must be non-empty slugs (`[a-z0-9_]`)
    /// - Commands must not be empty
    /// - Timeouts must be within 1..=600 seconds (sensors and defaults)
    /// - Poll intervals must be at least 1 second (sensors and defaults)
    pub fn validate(&self) -> Result<()> {
        validate_timeout("defaults", self.defaults.timeout_seconds)?;
        validate_interval("defaults", self.defaults.scan_interval_seconds)?;

        for (id, sensor) in &self.sensors {
            if !is_valid_id(id) {
                return Err(CmdsenseError::ConfigError(format!(
                    "sensor id '{}' is invalid: ids are lowercase alphanumeric and '_'",
                    id
                )));
            }

            if sensor.command.is_empty() {
                return Err(CmdsenseError::ConfigError(format!(
                    "sensor '{}' has an empty command",
                    id
                )));
            }

            if let Some(timeout) = sensor.timeout_seconds {
                validate_timeout(id, timeout)?;
            }
            if let Some(interval) = sensor.scan_interval_seconds {
                validate_interval(id, interval)?;
            }
        }

        Ok(())
    }

    /// De-duplicate a display name against the registered sensors.
    ///
    /// Returns the name unchanged when it is free, otherwise appends the
    /// first free counter: `Name`, `Name 2`, `Name 3`, ... `exclude_id`
    /// skips one sensor's own name during reconfiguration.
    pub fn dedup_display_name(&self, base: &str, exclude_id: Option<&str>) -> String {
        let taken: Vec<&str> = self
            .sensors
            .iter()
            .filter(|(id, _)| exclude_id != Some(id.as_str()))
            .map(|(_, sensor)| sensor.name.as_str())
            .collect();

        let mut candidate = base.to_string();
        let mut counter = 2;
        while taken.contains(&candidate.as_str()) {
            candidate = format!("{} {}", base, counter);
            counter += 1;
        }
        candidate
    }

    /// Build the immutable poll configuration for a registered sensor,
    /// applying defaults and normalizing an empty unit label to absent.
    pub fn poll_configuration(&self, id: &str) -> Result<PollConfiguration> {
        let sensor = self.sensors.get(id).ok_or_else(|| {
            CmdsenseError::UserError(format!("no sensor named '{}' in the registry", id))
        })?;

        let timeout = sensor
            .timeout_seconds
            .unwrap_or(self.defaults.timeout_seconds);
        let scan_interval = sensor
            .scan_interval_seconds
            .unwrap_or(self.defaults.scan_interval_seconds);

        Ok(PollConfiguration {
            id: id.to_string(),
            unique_id: unique_id_for(id),
            name: sensor.name.clone(),
            command: sensor.command.clone(),
            value_template: normalize_optional(&sensor.value_template),
            attribute_templates: sensor.attribute_templates.clone(),
            timeout: Duration::from_secs(timeout),
            scan_interval: Duration::from_secs(scan_interval),
            unit_of_measurement: normalize_optional(&sensor.unit_of_measurement),
            keep_last_value: sensor.keep_last_value,
        })
    }

    /// Poll configurations for every registered sensor, in id order.
    pub fn poll_configurations(&self) -> Result<Vec<PollConfiguration>> {
        self.sensors
            .keys()
            .map(|id| self.poll_configuration(id))
            .collect()
    }
}

/// Empty strings configured for optional fields count as absent.
fn normalize_optional(field: &Option<String>) -> Option<String> {
    field.as_deref().filter(|s| !s.is_empty()).map(String::from)
}

fn validate_timeout(id: &str, timeout: u64) -> Result<()> {
    if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
        return Err(CmdsenseError::ConfigError(format!(
            "sensor '{}' timeout must be between 1 and {} seconds, got {}",
            id, MAX_TIMEOUT_SECONDS, timeout
        )));
    }
    Ok(())
}

fn validate_interval(id: &str, interval: u64) -> Result<()> {
    if interval == 0 {
        return Err(CmdsenseError::ConfigError(format!(
            "sensor '{}' scan interval must be at least 1 second",
            id
        )));
    }
    Ok(())
}

/// Whether a sensor id is a valid slug.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Derive a sensor id from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_underscore = true; // suppress leading underscores
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_underscore = false;
        } else if !last_was_underscore {
            slug.push('_');
            last_was_underscore = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Validate an attribute-template payload entered as JSON text.
///
/// An empty payload is an empty template set. Otherwise the text must parse
/// as a JSON object whose keys and values are all strings.
pub fn parse_attribute_payload(payload: &str) -> Result<BTreeMap<String, String>> {
    if payload.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let parsed: Value = serde_json::from_str(payload)
        .map_err(|e| CmdsenseError::ConfigError(format!("invalid JSON syntax: {}", e)))?;

    let Value::Object(object) = parsed else {
        return Err(CmdsenseError::ConfigError(
            "attribute template set must be a JSON object".to_string(),
        ));
    };

    let mut templates = BTreeMap::new();
    for (key, value) in object {
        let Value::String(template) = value else {
            return Err(CmdsenseError::ConfigError(
                "attribute names and values must be strings".to_string(),
            ));
        };
        templates.insert(key, template);
    }

    Ok(templates)
}
