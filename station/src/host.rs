//! In-process station: admits migrating runners and runs their behavior.
//!
//! Every admitted runner gets its own blocking worker. The worker executes the
//! requested entry point against the shared discovery directory and removes
//! the runner from the roster once the behavior returns, whether it handed
//! off or terminated.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tracing::{error, info};

use tag_runner::core::command::MigrationCommand;
use tag_runner::core::state::Runner;
use tag_runner::core::station::{ID_PROPERTY, Station, StationError, StationRef};
use tag_runner::cycle::{Behavior, CycleEnv, behavior_for};
use tag_runner::io::directory::Directory;
use tag_runner::io::sleeper::Sleeper;

use crate::roster::{ArrivalToken, Roster};

/// Identity and advertised properties of a host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub id: String,
    pub endpoint: String,
    pub properties: Vec<(String, String)>,
}

pub struct StationHost {
    id: String,
    endpoint: String,
    properties: BTreeMap<String, String>,
    roster: Mutex<Roster>,
    directory: Arc<dyn Directory>,
    sleeper: Arc<dyn Sleeper>,
    runtime: Handle,
    this: Weak<StationHost>,
}

impl StationHost {
    pub fn new(
        config: HostConfig,
        directory: Arc<dyn Directory>,
        sleeper: Arc<dyn Sleeper>,
        runtime: Handle,
    ) -> Arc<Self> {
        let mut properties: BTreeMap<String, String> = config
            .properties
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        properties.insert(ID_PROPERTY.to_string(), config.id.clone());

        Arc::new_cyclic(|this| Self {
            id: config.id,
            endpoint: config.endpoint,
            properties,
            roster: Mutex::new(Roster::default()),
            directory,
            sleeper,
            runtime,
            this: this.clone(),
        })
    }

    /// Admit a runner and start its entry point on a worker thread.
    pub fn admit(&self, command: MigrationCommand) -> Result<ArrivalToken, StationError> {
        command
            .check_args()
            .map_err(StationError::EntryPointRejected)?;
        let host = self.this.upgrade().ok_or_else(|| {
            StationError::Unreachable(format!("{} is shutting down", self.endpoint))
        })?;

        let MigrationCommand {
            payload,
            entry_point,
            ..
        } = command;
        let behavior = behavior_for(entry_point);
        let mut runner = Runner::from_state(payload);
        let station: StationRef = host.clone();
        runner.attach_station(&station);

        let token = self.roster().arrive(runner.id(), runner.tag_flag());
        info!(
            station = %self.id,
            runner = %runner.id(),
            jump = runner.jump_count(),
            it = runner.is_it(),
            entry_point = entry_point.name(),
            "runner arrived"
        );

        self.runtime
            .spawn_blocking(move || host.run_hosted(runner, behavior, token));
        Ok(token)
    }

    fn run_hosted(&self, mut runner: Runner, behavior: Behavior, token: ArrivalToken) {
        let mut rng = rand::thread_rng();
        let mut env = CycleEnv {
            directory: self.directory.as_ref(),
            sleeper: self.sleeper.as_ref(),
            rng: &mut rng,
        };
        match behavior(&mut runner, &mut env) {
            Ok(handoff) => info!(
                station = %self.id,
                runner = %runner.id(),
                destination = %handoff.destination,
                jump = handoff.jump_count,
                "runner departed"
            ),
            Err(err) => error!(
                station = %self.id,
                runner = %runner.id(),
                "runner terminated: {err:#}"
            ),
        }
        self.roster().depart(token);
    }

    fn roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Station for StationHost {
    fn ping(&self) -> Result<(), StationError> {
        Ok(())
    }

    fn property(&self, key: &str) -> Result<Option<String>, StationError> {
        Ok(self.properties.get(&key.to_ascii_lowercase()).cloned())
    }

    fn accept(&self, command: &MigrationCommand) -> Result<(), StationError> {
        self.admit(command.clone()).map(|_| ())
    }

    fn attempt_tag(&self, occupant_id: &str) -> Result<bool, StationError> {
        Ok(self.roster().attempt_tag(occupant_id))
    }

    fn is_occupant_it(&self, occupant_id: &str) -> Result<bool, StationError> {
        Ok(self.roster().is_it(occupant_id))
    }

    fn occupant_ids(&self) -> Result<Vec<String>, StationError> {
        Ok(self.roster().ids())
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
