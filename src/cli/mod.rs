//! CLI argument parsing for cmdsense.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cmdsense: poll shell commands and publish their output as sensor state.
///
/// Sensors are registered in a YAML file; each one runs a shell command on
/// its own interval, interprets the output (text plus best-effort JSON),
/// renders a value and named attributes through templates, and publishes
/// the result as a JSON state file.
#[derive(Parser, Debug)]
#[command(name = "cmdsense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the sensor registry file.
    #[arg(long, global = true, default_value = "sensors.yaml")]
    pub registry: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for cmdsense.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new sensor.
    ///
    /// Validates the configuration, de-duplicates the display name against
    /// existing sensors, and writes the registry atomically.
    Add(AddArgs),

    /// List registered sensors.
    List,

    /// Show the full configuration of one sensor.
    Show(ShowArgs),

    /// Remove a sensor from the registry.
    Remove(RemoveArgs),

    /// Run a single poll tick for one sensor and print the payload.
    ///
    /// Executes the command, renders templates, and prints the published
    /// payload as pretty JSON without touching the state directory.
    Check(CheckArgs),

    /// Run the polling loop for all registered sensors.
    ///
    /// Each sensor polls on its own interval and writes its state file
    /// after every tick. Registry changes are picked up between ticks.
    Run(RunArgs),
}

/// Arguments for the `add` command.
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Display name for the new sensor.
    pub name: String,

    /// Shell command to execute each poll tick.
    #[arg(long)]
    pub command: String,

    /// Sensor id (defaults to a slug derived from the name).
    #[arg(long)]
    pub id: Option<String>,

    /// Execution timeout in seconds (1..=600).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Poll interval in seconds (>= 1).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Template deriving the published value from the command output.
    #[arg(long)]
    pub value_template: Option<String>,

    /// Attribute templates as a JSON object of name -> template.
    #[arg(long)]
    pub attribute_templates: Option<String>,

    /// Unit of measurement label.
    #[arg(long)]
    pub unit: Option<String>,

    /// Keep the previously published value on transient failure.
    #[arg(long)]
    pub keep_last_value: bool,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Sensor id to show.
    pub id: String,
}

/// Arguments for the `remove` command.
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Sensor id to remove.
    pub id: String,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Sensor id to poll once.
    pub id: String,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory for published state files.
    #[arg(long, default_value = "state")]
    pub state_dir: PathBuf,

    /// Poll only the named sensor.
    #[arg(long)]
    pub sensor: Option<String>,

    /// Run exactly one tick per sensor, then exit.
    #[arg(long)]
    pub once: bool,
}
