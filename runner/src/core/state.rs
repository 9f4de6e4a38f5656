//! Runner state carried across every jump.
//!
//! [`RunnerState`] is the plain serializable value shipped inside a
//! migration command. [`Runner`] is the live record reconstructed at each
//! station: it adds the shared IT cell that the hosting station's roster can
//! flip, and a weak back-reference to the station currently occupied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::station::{ID_PROPERTY, ServiceTemplate, Station, StationRef};

/// Tunable parameters of a runner. Setters clamp negative inputs to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    restraint_ms: u64,
    retry_ms: u64,
    max_results: usize,
    debug: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            restraint_ms: 5_000,
            retry_ms: 20_000,
            max_results: 8,
            debug: false,
        }
    }
}

impl RunnerSettings {
    pub fn set_restraint_ms(&mut self, ms: i64) {
        self.restraint_ms = clamp_non_negative(ms);
    }

    pub fn set_retry_ms(&mut self, ms: i64) {
        self.retry_ms = clamp_non_negative(ms);
    }

    pub fn set_max_results(&mut self, n: i64) {
        self.max_results = usize::try_from(n).unwrap_or(0);
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn restraint(&self) -> Duration {
        Duration::from_millis(self.restraint_ms)
    }

    /// Pause taken at the start of each arrival cycle. Runners that are not
    /// IT move slightly faster than the one chasing them.
    pub fn restraint_for(&self, is_it: bool) -> Duration {
        if is_it {
            self.restraint()
        } else {
            Duration::from_millis(self.restraint_ms.saturating_mul(4) / 5)
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

fn clamp_non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Shared IT cell.
///
/// The runner and the roster of the station hosting it hold clones of the
/// same cell, so a remote tag flips the runner's own flag.
#[derive(Debug, Clone, Default)]
pub struct TagFlag(Arc<AtomicBool>);

impl TagFlag {
    pub fn new(it: bool) -> Self {
        Self(Arc::new(AtomicBool::new(it)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Flip `false -> true`. Only the call that performs the flip sees `true`.
    pub fn try_tag(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Serializable value state of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerState {
    pub id: String,
    pub is_it: bool,
    pub jump_count: u32,
    pub settings: RunnerSettings,
    #[serde(default)]
    pub template: ServiceTemplate,
}

/// Live runner record.
#[derive(Debug)]
pub struct Runner {
    id: String,
    it: TagFlag,
    jump_count: u32,
    settings: RunnerSettings,
    template: ServiceTemplate,
    current_station: Option<Weak<dyn Station>>,
}

impl Runner {
    /// New untagged runner with a random UUID identity.
    pub fn new(settings: RunnerSettings) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), settings)
    }

    pub fn with_id(id: impl Into<String>, settings: RunnerSettings) -> Self {
        Self {
            id: id.into(),
            it: TagFlag::new(false),
            jump_count: 0,
            settings,
            template: ServiceTemplate::default(),
            current_station: None,
        }
    }

    /// Rebuild a runner from a received snapshot. The station reference is
    /// never part of the snapshot and must be attached by the host.
    pub fn from_state(state: RunnerState) -> Self {
        Self {
            id: state.id,
            it: TagFlag::new(state.is_it),
            jump_count: state.jump_count,
            settings: state.settings,
            template: state.template,
            current_station: None,
        }
    }

    pub fn snapshot(&self) -> RunnerState {
        RunnerState {
            id: self.id.clone(),
            is_it: self.is_it(),
            jump_count: self.jump_count,
            settings: self.settings.clone(),
            template: self.template.clone(),
        }
    }

    /// Snapshot as it should arrive at the destination of the next jump.
    pub fn handoff_state(&self) -> RunnerState {
        RunnerState {
            jump_count: self.jump_count.saturating_add(1),
            ..self.snapshot()
        }
    }

    /// Commit the jump counter once a handoff was accepted.
    pub fn record_jump(&mut self) {
        self.jump_count = self.jump_count.saturating_add(1);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_it(&self) -> bool {
        self.it.is_set()
    }

    /// Mark this runner as IT.
    pub fn mark_it(&self) {
        self.it.set();
        self.trace("I am IT now");
    }

    pub fn clear_it(&self) {
        self.it.clear();
    }

    /// Clone of the shared IT cell, for the hosting station's roster.
    pub fn tag_flag(&self) -> TagFlag {
        self.it.clone()
    }

    pub fn jump_count(&self) -> u32 {
        self.jump_count
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RunnerSettings {
        &mut self.settings
    }

    pub fn template(&self) -> &ServiceTemplate {
        &self.template
    }

    pub fn attach_station(&mut self, station: &StationRef) {
        self.current_station = Some(Arc::downgrade(station));
    }

    pub fn detach_station(&mut self) {
        self.current_station = None;
    }

    /// The station currently occupied, if it is still alive.
    pub fn current_station(&self) -> Option<StationRef> {
        self.current_station.as_ref().and_then(Weak::upgrade)
    }

    /// Identity of the current station, if known and reachable.
    pub fn current_station_id(&self) -> Option<String> {
        let station = self.current_station()?;
        station.property(ID_PROPERTY).ok().flatten()
    }

    /// Emit a diagnostic line for this runner. Visible at `info` when the
    /// runner's debug flag is set, otherwise only at `debug`.
    pub fn trace(&self, message: &str) {
        if self.settings.debug {
            info!(runner = %self.id, jump = self.jump_count, "{message}");
        } else {
            debug!(runner = %self.id, jump = self.jump_count, "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeStation;

    #[test]
    fn setters_clamp_negative_values() {
        let mut settings = RunnerSettings::default();
        settings.set_restraint_ms(-10);
        settings.set_retry_ms(-1);
        settings.set_max_results(-3);
        assert_eq!(settings.restraint(), Duration::ZERO);
        assert_eq!(settings.retry_delay(), Duration::ZERO);
        assert_eq!(settings.max_results(), 0);
    }

    #[test]
    fn restraint_is_shorter_when_not_it() {
        let settings = RunnerSettings::default();
        assert_eq!(settings.restraint_for(true), Duration::from_millis(5_000));
        assert_eq!(settings.restraint_for(false), Duration::from_millis(4_000));
    }

    #[test]
    fn try_tag_succeeds_once() {
        let flag = TagFlag::new(false);
        let other = flag.clone();
        assert!(flag.try_tag());
        assert!(!other.try_tag());
        assert!(other.is_set());
    }

    #[test]
    fn handoff_state_reconstructs_with_incremented_jump_count() {
        let runner = Runner::with_id("wanderer", RunnerSettings::default());
        runner.mark_it();

        let encoded = serde_json::to_string(&runner.handoff_state()).expect("serialize");
        let decoded: RunnerState = serde_json::from_str(&encoded).expect("deserialize");
        let arrived = Runner::from_state(decoded);

        assert_eq!(arrived.id(), "wanderer");
        assert!(arrived.is_it());
        assert_eq!(arrived.jump_count(), runner.jump_count() + 1);
        assert!(arrived.current_station().is_none());
    }

    #[test]
    fn current_station_is_a_weak_reference() {
        let mut runner = Runner::with_id("r1", RunnerSettings::default());
        let station: StationRef = FakeStation::new("s1").into_ref();
        runner.attach_station(&station);
        assert_eq!(runner.current_station_id().as_deref(), Some("s1"));

        drop(station);
        assert!(runner.current_station().is_none());
    }
}
