//! Stable exit codes for the run-folia CLI.
//!
//! `run` exits with the server's own exit code; these cover everything else.

/// Command succeeded.
pub const OK: i32 = 0;
/// Configuration, resolution, download or launch failed before the server ran.
pub const FAILED: i32 = 1;
/// Added to the signal number when the server was killed by a signal.
pub const SIGNAL_BASE: i32 = 128;
