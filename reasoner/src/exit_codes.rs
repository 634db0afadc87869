//! Stable exit codes for reasoner CLI commands.

/// Command succeeded and the session reached a final answer.
pub const OK: i32 = 0;
/// Command failed due to invalid arguments, config, or I/O errors.
pub const INVALID: i32 = 1;
/// The session finished, but at least one call failed or it was interrupted.
pub const ERRORED: i32 = 2;
