//! Implementation of the `cmdsense list` command.

use crate::error::Result;
use std::path::Path;

pub fn cmd_list(registry_path: &Path) -> Result<()> {
    let registry = super::require_registry(registry_path)?;

    if registry.sensors.is_empty() {
        println!("No sensors registered.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:>9} {:>9}  COMMAND", "ID", "NAME", "TIMEOUT", "INTERVAL");
    for (id, sensor) in &registry.sensors {
        let timeout = sensor
            .timeout_seconds
            .unwrap_or(registry.defaults.timeout_seconds);
        let interval = sensor
            .scan_interval_seconds
            .unwrap_or(registry.defaults.scan_interval_seconds);
        println!(
            "{:<20} {:<24} {:>8}s {:>8}s  {}",
            id,
            sensor.name,
            timeout,
            interval,
            truncate(&sensor.command, 48)
        );
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
