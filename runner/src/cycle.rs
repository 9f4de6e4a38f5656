//! The arrival cycle and the entry-point table stations dispatch through.
//!
//! A runner's whole life is the same cycle repeated at every station:
//! restraint pause, tag resolution, discovery, liveness probe, placement,
//! migration. The cycle only returns once a destination has accepted the
//! runner, or when a handoff fails in a way retrying cannot fix.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rand::RngCore;
use tracing::info;

use crate::core::command::EntryPoint;
use crate::core::placement::{Mode, choose_hunting, choose_seeking};
use crate::core::state::Runner;
use crate::core::tagging::{TagOutcome, resolve_tag};
use crate::io::directory::{Directory, discover_stations};
use crate::io::prober::probe;
use crate::io::sleeper::Sleeper;
use crate::migrate::migrate;

/// Collaborators supplied by whoever is hosting the runner.
pub struct CycleEnv<'a> {
    pub directory: &'a dyn Directory,
    pub sleeper: &'a dyn Sleeper,
    pub rng: &'a mut dyn RngCore,
}

/// Accepted handoff. The runner now lives at `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub destination: String,
    pub jump_count: u32,
    pub mode: Mode,
}

/// Behavior a station can run on an arriving runner.
pub type Behavior = fn(&mut Runner, &mut CycleEnv<'_>) -> Result<Handoff>;

/// Entry-point lookup table.
pub fn behavior_for(entry_point: EntryPoint) -> Behavior {
    match entry_point {
        EntryPoint::TopLevel => top_level,
    }
}

/// One arrival cycle.
pub fn top_level(runner: &mut Runner, env: &mut CycleEnv<'_>) -> Result<Handoff> {
    let mut session = env
        .directory
        .open_session()
        .context("open discovery session")?;

    runner.trace("sleeping");
    env.sleeper.sleep(runner.settings().restraint_for(runner.is_it()));

    match resolve_tag(runner) {
        TagOutcome::Tagged { occupant } => {
            info!(runner = %runner.id(), tagged = %occupant, "passed the IT mark");
        }
        TagOutcome::NoneTagged { attempts } => {
            runner.trace(&format!("nobody tagged after {attempts} attempt(s)"));
        }
        TagOutcome::NotIt | TagOutcome::NoStation => {}
    }

    // Destinations that failed a handoff during this cycle.
    let mut abandoned: HashSet<String> = HashSet::new();
    loop {
        let candidates = discover_stations(&session, runner, env.sleeper);
        let mut live = probe(candidates);
        if live.is_empty() {
            runner.trace("no live stations, sleeping");
            env.sleeper.sleep(runner.settings().retry_delay());
            continue;
        }
        if live.iter().all(|station| abandoned.contains(&station.id)) {
            abandoned.clear();
        } else {
            live.retain(|station| !abandoned.contains(&station.id));
        }

        let mode = Mode::for_runner(runner.is_it());
        let destination = match mode {
            Mode::Seeking => choose_seeking(&live, &mut *env.rng),
            Mode::Hunting => {
                let current = runner.current_station_id();
                choose_hunting(&live, current.as_deref())
            }
        };
        let Some(destination) = destination else {
            runner.trace("no usable destination, sleeping");
            env.sleeper.sleep(runner.settings().retry_delay());
            continue;
        };

        match migrate(destination, runner, EntryPoint::TopLevel, &mut session) {
            Ok(()) => {
                return Ok(Handoff {
                    destination: destination.id.clone(),
                    jump_count: runner.jump_count(),
                    mode,
                });
            }
            Err(err) if err.is_recoverable() => {
                abandoned.insert(destination.id.clone());
                env.sleeper.sleep(runner.settings().retry_delay());
            }
            Err(err) => return Err(err.into()),
        }
    }
}
