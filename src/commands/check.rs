//! Implementation of the `cmdsense check` command.
//!
//! Runs a single poll tick for one sensor, starting from empty state, and
//! prints the payload that `run` would publish. Nothing is written to the
//! state directory.

use crate::cli::CheckArgs;
use crate::error::Result;
use crate::publish::PublishedPayload;
use crate::sensor::poll::poll_once;
use crate::sensor::state::SensorState;
use std::path::Path;

pub fn cmd_check(registry_path: &Path, args: CheckArgs) -> Result<()> {
    let registry = super::require_registry(registry_path)?;
    let config = registry.poll_configuration(&args.id)?;

    eprintln!("Polling '{}': {}", config.id, config.command);
    let state = poll_once(&config, &SensorState::new());

    let payload = PublishedPayload::build(&config, &state);
    println!("{}", payload.to_json()?);

    Ok(())
}
