//! Stable exit codes for the runner launcher.

/// The runner was handed off to a station.
pub const OK: i32 = 0;
/// Invalid configuration or an irrecoverable handoff failure.
pub const FATAL: i32 = 1;
/// Unknown flag or malformed argument (reported by clap).
pub const USAGE: i32 = 2;
