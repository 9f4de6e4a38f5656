//! Migration executor: hands the runner to its next station.
//!
//! The runner's state is shipped with `jump_count + 1` and an entry point.
//! Once the destination accepts, the discovery session is released and the
//! local call site must treat the runner as gone.

use thiserror::Error;
use tracing::{error, warn};

use crate::core::command::{EntryPoint, MigrationCommand};
use crate::core::state::Runner;
use crate::core::station::{LiveStation, StationError};
use crate::io::directory::DiscoverySession;

/// Why a handoff did not happen.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The destination could not be reached or answered outside the contract.
    /// The runner should rediscover from scratch.
    #[error("destination {destination} unavailable: {reason}")]
    Unavailable { destination: String, reason: String },

    /// The destination could not resolve the entry point. Fatal for this runner.
    #[error("destination {destination} rejected entry point {entry_point}: {reason}")]
    Rejected {
        destination: String,
        entry_point: &'static str,
        reason: String,
    },
}

impl MigrationError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MigrationError::Unavailable { .. })
    }
}

/// Hand `runner` to `destination` and ask it to run `entry_point` there.
///
/// On success the jump counter is committed and `session` is released. On
/// failure the runner is left exactly as it was.
pub fn migrate(
    destination: &LiveStation,
    runner: &mut Runner,
    entry_point: EntryPoint,
    session: &mut DiscoverySession,
) -> Result<(), MigrationError> {
    runner.trace(&format!("jumping to {}", destination.id));
    let command = MigrationCommand::new(runner.handoff_state(), entry_point);

    match destination.station.accept(&command) {
        Ok(()) => {
            runner.record_jump();
            runner.detach_station();
            session.release();
            Ok(())
        }
        Err(StationError::EntryPointRejected(reason)) => {
            error!(
                runner = %runner.id(),
                destination = %destination.id,
                entry_point = entry_point.name(),
                %reason,
                "handoff rejected by destination"
            );
            Err(MigrationError::Rejected {
                destination: destination.id.clone(),
                entry_point: entry_point.name(),
                reason,
            })
        }
        Err(err) => {
            warn!(
                runner = %runner.id(),
                destination = %destination.id,
                error = %err,
                "handoff failed; abandoning destination"
            );
            Err(MigrationError::Unavailable {
                destination: destination.id.clone(),
                reason: err.to_string(),
            })
        }
    }
}
