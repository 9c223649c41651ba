//! Implementation of the `cmdsense show` command.

use crate::cli::ShowArgs;
use crate::error::Result;
use std::path::Path;

pub fn cmd_show(registry_path: &Path, args: ShowArgs) -> Result<()> {
    let registry = super::require_registry(registry_path)?;
    let config = registry.poll_configuration(&args.id)?;

    println!("Sensor:         {}", config.id);
    println!("Unique id:      {}", config.unique_id);
    println!("Name:           {}", config.name);
    println!("Command:        {}", config.command);
    println!("Timeout:        {}s", config.timeout_seconds());
    println!("Scan interval:  {}s", config.scan_interval.as_secs());
    println!(
        "Value template: {}",
        config.value_template.as_deref().unwrap_or("(raw output)")
    );
    if config.attribute_templates.is_empty() {
        println!("Attributes:     (none)");
    } else {
        println!("Attributes:");
        for (name, template) in &config.attribute_templates {
            println!("  {} = {}", name, template);
        }
    }
    if let Some(unit) = &config.unit_of_measurement {
        println!("Unit:           {}", unit);
    }
    println!("Keep last:      {}", config.keep_last_value);

    Ok(())
}
