//! Implementation of the `cmdsense add` command.
//!
//! Registers a sensor: derives or validates the id, de-duplicates the
//! display name against existing sensors, validates the attribute-template
//! payload and the numeric bounds, and writes the registry atomically.

use crate::cli::AddArgs;
use crate::error::{CmdsenseError, Result};
use crate::registry::{SensorConfig, SensorRegistry, is_valid_id, parse_attribute_payload, slugify};
use std::path::Path;

pub fn cmd_add(registry_path: &Path, args: AddArgs) -> Result<()> {
    let mut registry = SensorRegistry::load(registry_path)?.unwrap_or_default();

    let id = match &args.id {
        Some(id) => {
            if !is_valid_id(id) {
                return Err(CmdsenseError::UserError(format!(
                    "sensor id '{}' is invalid: ids are lowercase alphanumeric and '_'",
                    id
                )));
            }
            id.clone()
        }
        None => {
            let slug = slugify(&args.name);
            if slug.is_empty() {
                return Err(CmdsenseError::UserError(format!(
                    "cannot derive a sensor id from '{}'; pass --id explicitly",
                    args.name
                )));
            }
            slug
        }
    };

    if registry.sensors.contains_key(&id) {
        return Err(CmdsenseError::UserError(format!(
            "a sensor with id '{}' already exists\n\n\
             Remove it first or pass a different --id.",
            id
        )));
    }

    let attribute_templates = match &args.attribute_templates {
        Some(payload) => parse_attribute_payload(payload)?,
        None => Default::default(),
    };

    let name = registry.dedup_display_name(&args.name, None);
    if name != args.name {
        eprintln!(
            "Note: display name '{}' is taken; using '{}'",
            args.name, name
        );
    }

    registry.sensors.insert(
        id.clone(),
        SensorConfig {
            name: name.clone(),
            command: args.command,
            timeout_seconds: args.timeout,
            scan_interval_seconds: args.interval,
            value_template: args.value_template,
            attribute_templates,
            unit_of_measurement: args.unit,
            keep_last_value: args.keep_last_value,
        },
    );

    registry.validate()?;
    registry.save(registry_path)?;

    println!("Registered sensor '{}' ({})", id, name);
    Ok(())
}
