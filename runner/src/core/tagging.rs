//! Tag resolution on arrival.
//!
//! An IT runner walks the roster of the station it just entered and tries to
//! pass the mark on, stopping at the first occupant the station reports as
//! successfully tagged.

use crate::core::state::Runner;

/// Result of one tag resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// The runner was not IT; nothing was attempted.
    NotIt,
    /// The runner has no reachable current station (e.g. at launch).
    NoStation,
    /// The mark was passed to `occupant`; the runner is no longer IT.
    Tagged { occupant: String },
    /// No occupant could be tagged; the runner stays IT.
    NoneTagged { attempts: usize },
}

/// Try to pass the IT mark to a co-located runner.
///
/// Failed remote calls count as failed attempts. The runner's own flag is
/// cleared only after the station confirms a tag.
pub fn resolve_tag(runner: &Runner) -> TagOutcome {
    if !runner.is_it() {
        return TagOutcome::NotIt;
    }
    let Some(station) = runner.current_station() else {
        return TagOutcome::NoStation;
    };
    runner.trace("trying to tag a player");

    let roster = match station.occupant_ids() {
        Ok(ids) => ids,
        Err(err) => {
            runner.trace(&format!("roster unavailable: {err}"));
            return TagOutcome::NoneTagged { attempts: 0 };
        }
    };

    let mut attempts = 0;
    for occupant in roster.iter().filter(|id| id.as_str() != runner.id()) {
        attempts += 1;
        if let Ok(true) = station.attempt_tag(occupant) {
            runner.clear_it();
            runner.trace(&format!("tagged {occupant}"));
            return TagOutcome::Tagged {
                occupant: occupant.clone(),
            };
        }
    }
    TagOutcome::NoneTagged { attempts }
}
