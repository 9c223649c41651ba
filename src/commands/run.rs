//! Implementation of the `cmdsense run` command.
//!
//! Spawns one polling thread per sensor. Each thread ticks on its own
//! scan interval and writes the sensor's state file after every tick. The
//! main thread watches the registry file and delivers updated
//! configurations through each sensor's [`ConfigSlot`], so changes take
//! effect between ticks, never in the middle of one.

use crate::cli::RunArgs;
use crate::error::{CmdsenseError, Result};
use crate::publish::write_state;
use crate::registry::SensorRegistry;
use crate::sensor::config::PollConfiguration;
use crate::sensor::poll::{ConfigSlot, poll_once};
use crate::sensor::state::SensorState;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{info, warn};

const RELOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub fn cmd_run(registry_path: &Path, args: RunArgs) -> Result<()> {
    let registry = super::require_registry(registry_path)?;
    let configs = select_configs(&registry, args.sensor.as_deref())?;

    if configs.is_empty() {
        return Err(CmdsenseError::UserError(format!(
            "sensor registry '{}' has no sensors",
            registry_path.display()
        )));
    }

    eprintln!(
        "Polling {} sensor(s); state directory: {}",
        configs.len(),
        args.state_dir.display()
    );

    if args.once {
        run_once(&configs, &args.state_dir)
    } else {
        run_forever(registry_path, configs, &args.state_dir)
    }
}

/// One tick per sensor, sequentially, then exit.
fn run_once(configs: &[PollConfiguration], state_dir: &Path) -> Result<()> {
    for config in configs {
        let state = poll_once(config, &SensorState::new());
        let path = write_state(state_dir, config, &state)?;
        eprintln!("{}: {} ({})", config.id, describe(&state), path.display());
    }
    Ok(())
}

/// Poll every sensor on its own thread and watch the registry for changes.
fn run_forever(
    registry_path: &Path,
    configs: Vec<PollConfiguration>,
    state_dir: &Path,
) -> Result<()> {
    let mut slots: BTreeMap<String, ConfigSlot> = BTreeMap::new();

    for config in configs {
        let slot = ConfigSlot::new();
        slots.insert(config.id.clone(), slot.clone());

        let state_dir = state_dir.to_path_buf();
        thread::spawn(move || sensor_loop(config, slot, state_dir));
    }

    let mut last_modified = modified_at(registry_path);
    loop {
        thread::sleep(RELOAD_POLL_INTERVAL);

        let current = modified_at(registry_path);
        if current != last_modified {
            last_modified = current;
            info!("registry changed, reloading");
            reload_registry(registry_path, &slots);
        }
    }
}

/// The per-sensor polling loop: apply any pending configuration, tick,
/// publish, sleep.
fn sensor_loop(initial: PollConfiguration, slot: ConfigSlot, state_dir: PathBuf) {
    let mut config = Arc::new(initial);
    let mut state = SensorState::new();

    loop {
        let tick_started = Instant::now();

        if let Some(next) = slot.take() {
            info!(sensor = %next.id, "applying updated configuration");
            config = next;
        }

        state = poll_once(&config, &state);
        match write_state(&state_dir, &config, &state) {
            Ok(_) => eprintln!("{}: {}", config.id, describe(&state)),
            Err(e) => eprintln!("{}: failed to publish state: {}", config.id, e),
        }

        thread::sleep(remaining_interval(
            config.scan_interval,
            tick_started.elapsed(),
        ));
    }
}

/// Time left in the poll period after a tick. The scan interval is a
/// cadence: a slow command eats into its own sleep instead of pushing every
/// later tick out.
fn remaining_interval(scan_interval: Duration, tick_elapsed: Duration) -> Duration {
    scan_interval.saturating_sub(tick_elapsed)
}

/// Re-read the registry and deliver fresh configurations to running
/// sensors. A broken registry file never disturbs the running loop; the
/// previous configurations stay in effect until the file parses again.
fn reload_registry(registry_path: &Path, slots: &BTreeMap<String, ConfigSlot>) {
    let registry = match SensorRegistry::load(registry_path) {
        Ok(Some(registry)) => registry,
        Ok(None) => {
            warn!("registry file is gone; keeping current configuration");
            return;
        }
        Err(e) => {
            warn!("registry reload failed, keeping current configuration: {}", e);
            return;
        }
    };

    for (id, slot) in slots {
        match registry.poll_configuration(id) {
            Ok(config) => slot.store(config),
            Err(_) => {
                warn!(sensor = %id, "sensor removed from registry; restart to drop it");
            }
        }
    }

    for id in registry.sensors.keys() {
        if !slots.contains_key(id) {
            warn!(sensor = %id, "new sensor in registry; restart to pick it up");
        }
    }
}

fn select_configs(
    registry: &SensorRegistry,
    sensor: Option<&str>,
) -> Result<Vec<PollConfiguration>> {
    match sensor {
        Some(id) => Ok(vec![registry.poll_configuration(id)?]),
        None => registry.poll_configurations(),
    }
}

fn describe(state: &SensorState) -> String {
    match (&state.value, &state.last_error) {
        (_, Some(err)) => format!("error: {}", err),
        (Some(value), None) => format!("state={}", value),
        (None, None) => "state=null".to_string(),
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
