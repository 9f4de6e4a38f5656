//! Mobile runners for a distributed game of tag.
//!
//! A runner hops between independently owned station processes. At each
//! station it tries to pass the IT mark to a co-located runner, discovers
//! which stations are reachable, picks the next one, and hands its whole
//! state over. There is no central coordinator.
//!
//! - **[`core`]**: Game logic (runner state, placement, tag resolution) and
//!   the station contract. No I/O of its own.
//! - **[`io`]**: HTTP clients for stations and the discovery registry,
//!   liveness probing, sleeping, and launch configuration.
//!
//! [`migrate`] performs the handoff and [`cycle`] drives the arrival cycle
//! that every station runs on an arriving runner.

pub mod core;
pub mod cycle;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod migrate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
