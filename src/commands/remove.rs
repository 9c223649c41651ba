//! Implementation of the `cmdsense remove` command.

use crate::cli::RemoveArgs;
use crate::error::{CmdsenseError, Result};
use std::path::Path;

pub fn cmd_remove(registry_path: &Path, args: RemoveArgs) -> Result<()> {
    let mut registry = super::require_registry(registry_path)?;

    let removed = registry.sensors.remove(&args.id).ok_or_else(|| {
        CmdsenseError::UserError(format!("no sensor named '{}' in the registry", args.id))
    })?;

    registry.save(registry_path)?;

    println!("Removed sensor '{}' ({})", args.id, removed.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SensorRegistry;
    use tempfile::TempDir;

    fn seed_registry(path: &Path) {
        SensorRegistry::from_yaml(
            "sensors:\n  up:\n    name: Up\n    command: uptime\n  disk:\n    name: Disk\n    command: df /\n",
        )
        .unwrap()
        .save(path)
        .unwrap();
    }

    #[test]
    fn test_remove_deletes_sensor() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sensors.yaml");
        seed_registry(&path);

        cmd_remove(
            &path,
            RemoveArgs {
                id: "up".to_string(),
            },
        )
        .unwrap();

        let registry = SensorRegistry::load(&path).unwrap().unwrap();
        assert!(!registry.sensors.contains_key("up"));
        assert!(registry.sensors.contains_key("disk"));
    }

    #[test]
    fn test_remove_unknown_sensor() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sensors.yaml");
        seed_registry(&path);

        let err = cmd_remove(
            &path,
            RemoveArgs {
                id: "nope".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("no sensor named 'nope'"));
    }
}
