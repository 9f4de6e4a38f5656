//! Migration command: the tagged value a destination station dispatches.
//!
//! Instead of resolving a behavior by name at run time, a runner ships its
//! state together with an [`EntryPoint`] variant. Destinations deserialize
//! the variant and look the behavior up in a fixed table, so an unknown name
//! fails at decode time and never reaches the runner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::state::RunnerState;

/// Behaviors a station may invoke on an arriving runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// The arrival cycle: resolve tag, discover, choose, migrate.
    TopLevel,
}

impl EntryPoint {
    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::TopLevel => "top_level",
        }
    }

    /// Number of positional arguments the behavior takes.
    pub fn arity(self) -> usize {
        match self {
            EntryPoint::TopLevel => 0,
        }
    }
}

/// Complete handoff payload sent to `acceptMobileUnit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationCommand {
    pub payload: RunnerState,
    pub entry_point: EntryPoint,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl MigrationCommand {
    pub fn new(payload: RunnerState, entry_point: EntryPoint) -> Self {
        Self {
            payload,
            entry_point,
            args: Vec::new(),
        }
    }

    /// Check the argument list against the entry point's signature.
    pub fn check_args(&self) -> Result<(), String> {
        let expected = self.entry_point.arity();
        if self.args.len() != expected {
            return Err(format!(
                "{} takes {} argument(s), got {}",
                self.entry_point.name(),
                expected,
                self.args.len()
            ));
        }
        Ok(())
    }
}
