//! Destination choice for the next jump.
//!
//! Two modes, driven by the runner's tag status:
//!
//! - **Seeking** (not IT): uniform random walk over the live set, rejecting
//!   any station where an occupant reports IT. There is no bound on the
//!   number of resamples; if every live station holds an IT occupant the
//!   walk keeps sampling until some roster changes.
//! - **Hunting** (IT): the station with the most occupants, not counting
//!   the runner itself at its current station. Ties go to the first station
//!   in enumeration order.
//!
//! Both read rosters through the station contract; a roster that cannot be
//! read disqualifies the station for that sample.

use rand::Rng;
use tracing::warn;

use crate::core::station::LiveStation;

/// Placement mode for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Seeking,
    Hunting,
}

impl Mode {
    pub fn for_runner(is_it: bool) -> Self {
        if is_it { Mode::Hunting } else { Mode::Seeking }
    }
}

/// Random-walk choice for a runner that is not IT.
///
/// Returns `None` only for an empty live set.
pub fn choose_seeking<'a, R: Rng + ?Sized>(
    live: &'a [LiveStation],
    rng: &mut R,
) -> Option<&'a LiveStation> {
    if live.is_empty() {
        return None;
    }
    let mut rejected = 0usize;
    loop {
        let candidate = &live[rng.gen_range(0..live.len())];
        if is_free_of_it(candidate) {
            return Some(candidate);
        }
        rejected += 1;
        if rejected % live.len() == 0 {
            warn!(
                rejected,
                live = live.len(),
                "every sampled station holds an IT occupant; resampling"
            );
        }
    }
}

/// Most-populated choice for a runner that is IT.
///
/// `current_id` is the identity of the station the runner occupies; the
/// runner's own presence there is not counted.
pub fn choose_hunting<'a>(
    live: &'a [LiveStation],
    current_id: Option<&str>,
) -> Option<&'a LiveStation> {
    let mut best: Option<(&LiveStation, usize)> = None;
    for candidate in live {
        let Ok(ids) = candidate.station.occupant_ids() else {
            continue;
        };
        let mut count = ids.len();
        if current_id == Some(candidate.id.as_str()) {
            count = count.saturating_sub(1);
        }
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((candidate, count));
        }
    }
    best.map(|(station, _)| station)
}

fn is_free_of_it(candidate: &LiveStation) -> bool {
    let Ok(ids) = candidate.station.occupant_ids() else {
        return false;
    };
    for id in &ids {
        match candidate.station.is_occupant_it(id) {
            Ok(false) => {}
            Ok(true) | Err(_) => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeStation, live};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mode_follows_tag_status() {
        assert_eq!(Mode::for_runner(true), Mode::Hunting);
        assert_eq!(Mode::for_runner(false), Mode::Seeking);
    }

    #[test]
    fn seeking_never_returns_station_with_it_occupant() {
        let stations = vec![
            live(FakeStation::new("a").with_occupant("x", true)),
            live(FakeStation::new("b").with_occupant("y", false)),
            live(FakeStation::new("c").with_occupant("z", true)),
            live(FakeStation::new("d")),
        ];
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = choose_seeking(&stations, &mut rng).expect("choice");
            assert!(chosen.id == "b" || chosen.id == "d", "chose {}", chosen.id);
        }
    }

    #[test]
    fn seeking_rejects_station_with_unreadable_roster() {
        let stations = vec![
            live(FakeStation::new("broken").failing_roster()),
            live(FakeStation::new("ok")),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            assert_eq!(choose_seeking(&stations, &mut rng).expect("choice").id, "ok");
        }
    }

    #[test]
    fn seeking_on_empty_live_set_returns_none() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(choose_seeking(&[], &mut rng).is_none());
    }

    #[test]
    fn hunting_discounts_self_at_current_station() {
        let stations = vec![
            live(
                FakeStation::new("here")
                    .with_occupant("me", true)
                    .with_occupant("a", false)
                    .with_occupant("b", false),
            ),
            live(
                FakeStation::new("there")
                    .with_occupant("c", false)
                    .with_occupant("d", false),
            ),
        ];
        // 3 - 1 == 2 ties with "there"; first in enumeration order wins.
        let chosen = choose_hunting(&stations, Some("here")).expect("choice");
        assert_eq!(chosen.id, "here");

        let chosen = choose_hunting(&stations, Some("there")).expect("choice");
        assert_eq!(chosen.id, "here");
    }

    #[test]
    fn hunting_is_deterministic_on_identical_inputs() {
        let stations = vec![
            live(FakeStation::new("s1").with_occupants(&["a", "b"])),
            live(FakeStation::new("s2").with_occupants(&["c", "d", "e"])),
            live(FakeStation::new("s3").with_occupants(&["f", "g", "h"])),
        ];
        let first = choose_hunting(&stations, None).expect("choice").id.clone();
        let second = choose_hunting(&stations, None).expect("choice").id.clone();
        assert_eq!(first, second);
        assert_eq!(first, "s2");
    }

    #[test]
    fn hunting_skips_unreadable_rosters() {
        let stations = vec![
            live(FakeStation::new("broken").failing_roster()),
            live(FakeStation::new("empty")),
        ];
        assert_eq!(choose_hunting(&stations, None).expect("choice").id, "empty");
        assert!(choose_hunting(&stations[..1], None).is_none());
    }
}
