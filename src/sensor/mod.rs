//! The command-poll execution engine.
//!
//! One poll tick runs the pipeline: render and execute the command
//! ([`runner`]), interpret the captured output ([`interpret`]), render the
//! value and attribute templates ([`project`]), and reconcile the result
//! against the previous state ([`state`]). The [`poll`] module drives the
//! pipeline exactly once per tick and owns the between-tick reconfiguration
//! slot.

pub mod config;
pub mod interpret;
pub mod poll;
pub mod project;
pub mod runner;
pub mod state;

pub use config::PollConfiguration;
pub use interpret::interpret;
pub use poll::{ConfigSlot, poll_once};
pub use project::{Projection, project};
pub use runner::{RawOutcome, run};
pub use state::{SensorState, reconcile};
