//! Command implementations for cmdsense.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus small helpers shared by the commands.

mod add;
mod check;
mod list;
mod remove;
mod run;
mod show;

use crate::cli::{Cli, Command};
use crate::error::{CmdsenseError, Result};
use crate::registry::SensorRegistry;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let registry_path = cli.registry;
    match cli.command {
        Command::Add(args) => add::cmd_add(&registry_path, args),
        Command::List => list::cmd_list(&registry_path),
        Command::Show(args) => show::cmd_show(&registry_path, args),
        Command::Remove(args) => remove::cmd_remove(&registry_path, args),
        Command::Check(args) => check::cmd_check(&registry_path, args),
        Command::Run(args) => run::cmd_run(&registry_path, args),
    }
}

/// Load the registry, failing with a hint when the file does not exist.
pub(crate) fn require_registry(path: &Path) -> Result<SensorRegistry> {
    SensorRegistry::load(path)?.ok_or_else(|| {
        CmdsenseError::UserError(format!(
            "sensor registry '{}' not found\n\n\
             Register a sensor first: cmdsense add <name> --command <command>",
            path.display()
        ))
    })
}
