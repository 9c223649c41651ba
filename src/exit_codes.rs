//! Exit code constants for the cmdsense CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unknown sensor, invalid state)
//! - 2: Configuration error (malformed registry or attribute payload)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unknown sensor, or invalid state.
pub const USER_ERROR: i32 = 1;

/// Configuration error: malformed registry file or attribute-template payload.
pub const CONFIG_FAILURE: i32 = 2;
