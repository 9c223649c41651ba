//! cmdsense: a shell-command-to-metric adapter.
//!
//! Each configured *sensor* periodically runs a shell command, interprets
//! its output (raw text plus best-effort JSON), renders a value and named
//! attributes through templates, reconciles the result against the previous
//! state, and publishes the outcome as an atomically written JSON state
//! file.
//!
//! The [`sensor`] module is the poll engine; [`registry`] holds operator
//! configuration; [`publish`] is the host-facing surface; [`cli`] and
//! [`commands`] make up the `cmdsense` binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod publish;
pub mod registry;
pub mod sensor;
pub mod template;
