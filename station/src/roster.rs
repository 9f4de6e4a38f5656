//! Runners currently hosted by this station, in arrival order.
//!
//! Each occupant shares its `TagFlag` with the runner executing on a worker
//! thread, so a tag applied here is observed by that runner on its next read.

use tag_runner::core::state::TagFlag;

/// Identifies one arrival. A runner that migrates back to this same station
/// gets a fresh token, so the departing cycle only removes its own entry.
pub type ArrivalToken = u64;

#[derive(Debug, Clone)]
struct Occupant {
    id: String,
    token: ArrivalToken,
    flag: TagFlag,
}

#[derive(Debug, Default)]
pub struct Roster {
    next_token: ArrivalToken,
    occupants: Vec<Occupant>,
}

impl Roster {
    pub fn arrive(&mut self, id: &str, flag: TagFlag) -> ArrivalToken {
        let token = self.next_token;
        self.next_token += 1;
        self.occupants.push(Occupant {
            id: id.to_string(),
            token,
            flag,
        });
        token
    }

    /// Returns `false` when the token was already gone.
    pub fn depart(&mut self, token: ArrivalToken) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|occupant| occupant.token != token);
        self.occupants.len() != before
    }

    pub fn ids(&self) -> Vec<String> {
        self.occupants
            .iter()
            .map(|occupant| occupant.id.clone())
            .collect()
    }

    /// Flip the first untagged flag held under `id`. Unknown ids are never tagged.
    pub fn attempt_tag(&self, id: &str) -> bool {
        self.occupants
            .iter()
            .filter(|occupant| occupant.id == id)
            .any(|occupant| occupant.flag.try_tag())
    }

    pub fn is_it(&self, id: &str) -> bool {
        self.occupants
            .iter()
            .any(|occupant| occupant.id == id && occupant.flag.is_set())
    }
}
