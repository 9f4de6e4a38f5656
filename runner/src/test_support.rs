//! In-memory doubles for stations, the registry, and sleeping.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::command::MigrationCommand;
use crate::core::state::TagFlag;
use crate::core::station::{
    ID_PROPERTY, LiveStation, ServiceTemplate, Station, StationError, StationRef,
};
use crate::io::directory::{Directory, DiscoverySession, Registry};
use crate::io::sleeper::Sleeper;

#[derive(Debug, Clone, Copy)]
enum AcceptFailure {
    Unreachable,
    Rejected,
}

#[derive(Default)]
struct FakeRoster {
    occupants: Vec<(String, TagFlag)>,
    tag_attempts: Vec<String>,
    accepted: Vec<MigrationCommand>,
}

/// Scriptable in-memory station.
pub struct FakeStation {
    id: Option<String>,
    reachable: bool,
    roster_fails: bool,
    refuse_tags: bool,
    accept_failure: Option<AcceptFailure>,
    roster: Mutex<FakeRoster>,
}

impl FakeStation {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            reachable: true,
            roster_fails: false,
            refuse_tags: false,
            accept_failure: None,
            roster: Mutex::new(FakeRoster::default()),
        }
    }

    /// A station that answers `ping` but has no `id` property.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            ..Self::new("anonymous")
        }
    }

    pub fn with_occupant(self, id: &str, it: bool) -> Self {
        self.bind_occupant(id, TagFlag::new(it));
        self
    }

    pub fn with_occupants(self, ids: &[&str]) -> Self {
        for id in ids {
            self.bind_occupant(id, TagFlag::new(false));
        }
        self
    }

    /// Every call fails as if the host were down.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// `occupant_ids` fails; everything else works.
    pub fn failing_roster(mut self) -> Self {
        self.roster_fails = true;
        self
    }

    /// `attempt_tag` always reports failure.
    pub fn refusing_tags(mut self) -> Self {
        self.refuse_tags = true;
        self
    }

    /// `accept` fails with a transport error.
    pub fn failing_accept(mut self) -> Self {
        self.accept_failure = Some(AcceptFailure::Unreachable);
        self
    }

    /// `accept` rejects every entry point.
    pub fn rejecting_entry_points(mut self) -> Self {
        self.accept_failure = Some(AcceptFailure::Rejected);
        self
    }

    pub fn into_ref(self) -> StationRef {
        Arc::new(self)
    }

    /// Insert an occupant, or rebind an existing one to `flag`.
    pub fn bind_occupant(&self, id: &str, flag: TagFlag) {
        let mut roster = self.lock();
        match roster.occupants.iter_mut().find(|(name, _)| name == id) {
            Some(entry) => entry.1 = flag,
            None => roster.occupants.push((id.to_string(), flag)),
        }
    }

    pub fn occupant_is_it(&self, id: &str) -> bool {
        self.lock()
            .occupants
            .iter()
            .any(|(name, flag)| name == id && flag.is_set())
    }

    /// Occupant ids passed to `attempt_tag`, in call order.
    pub fn tag_attempts(&self) -> Vec<String> {
        self.lock().tag_attempts.clone()
    }

    /// Commands received through `accept`.
    pub fn accepted(&self) -> Vec<MigrationCommand> {
        self.lock().accepted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeRoster> {
        self.roster.lock().expect("fake station lock")
    }

    fn reach(&self) -> Result<(), StationError> {
        if self.reachable {
            Ok(())
        } else {
            Err(StationError::Unreachable(format!("{} is down", self.endpoint())))
        }
    }
}

impl Station for FakeStation {
    fn ping(&self) -> Result<(), StationError> {
        self.reach()
    }

    fn property(&self, key: &str) -> Result<Option<String>, StationError> {
        self.reach()?;
        if key.eq_ignore_ascii_case(ID_PROPERTY) {
            return Ok(self.id.clone());
        }
        Ok(None)
    }

    fn accept(&self, command: &MigrationCommand) -> Result<(), StationError> {
        self.reach()?;
        match self.accept_failure {
            Some(AcceptFailure::Unreachable) => {
                Err(StationError::Unreachable("connection reset".to_string()))
            }
            Some(AcceptFailure::Rejected) => Err(StationError::EntryPointRejected(format!(
                "no behavior named {}",
                command.entry_point.name()
            ))),
            None => {
                self.lock().accepted.push(command.clone());
                Ok(())
            }
        }
    }

    fn attempt_tag(&self, occupant_id: &str) -> Result<bool, StationError> {
        self.reach()?;
        let mut roster = self.lock();
        roster.tag_attempts.push(occupant_id.to_string());
        if self.refuse_tags {
            return Ok(false);
        }
        Ok(roster
            .occupants
            .iter()
            .find(|(name, _)| name == occupant_id)
            .is_some_and(|(_, flag)| flag.try_tag()))
    }

    fn is_occupant_it(&self, occupant_id: &str) -> Result<bool, StationError> {
        self.reach()?;
        Ok(self.occupant_is_it(occupant_id))
    }

    fn occupant_ids(&self) -> Result<Vec<String>, StationError> {
        self.reach()?;
        if self.roster_fails {
            return Err(StationError::Protocol("roster unavailable".to_string()));
        }
        Ok(self
            .lock()
            .occupants
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn endpoint(&self) -> String {
        format!("fake://{}", self.id.as_deref().unwrap_or("anonymous"))
    }
}

/// Wrap a fake station as a probed live station.
pub fn live(station: FakeStation) -> LiveStation {
    let id = station.id.clone().expect("live station needs an id");
    LiveStation::new(id, station.into_ref())
}

struct Script {
    responses: Vec<Result<Vec<StationRef>, String>>,
    lookups: usize,
    max_results_seen: Vec<usize>,
}

/// Registry that replays scripted lookup results; the last entry repeats.
#[derive(Clone)]
pub struct ScriptedRegistry {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRegistry {
    pub fn new(responses: Vec<Result<Vec<StationRef>, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                responses,
                lookups: 0,
                max_results_seen: Vec::new(),
            })),
        }
    }

    pub fn lookups(&self) -> usize {
        self.script.lock().expect("script lock").lookups
    }

    pub fn max_results_seen(&self) -> Vec<usize> {
        self.script.lock().expect("script lock").max_results_seen.clone()
    }
}

impl Registry for ScriptedRegistry {
    fn lookup(&self, _template: &ServiceTemplate, max_results: usize) -> Result<Vec<StationRef>> {
        let mut script = self.script.lock().expect("script lock");
        let index = script.lookups.min(script.responses.len().saturating_sub(1));
        script.lookups += 1;
        script.max_results_seen.push(max_results);
        match script.responses.get(index) {
            Some(Ok(stations)) => Ok(stations.clone()),
            Some(Err(reason)) => Err(anyhow!(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

impl Directory for ScriptedRegistry {
    fn open_session(&self) -> Result<DiscoverySession> {
        Ok(DiscoverySession::new(Box::new(self.clone())))
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().expect("sleeper lock").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().expect("sleeper lock").push(duration);
    }
}
