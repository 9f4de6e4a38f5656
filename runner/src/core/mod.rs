//! Deterministic game logic shared by every runner.
//!
//! Core modules perform no I/O of their own. Remote state is read only
//! through the [`station::Station`] contract, which tests replace with
//! in-memory stations.

pub mod command;
pub mod placement;
pub mod state;
pub mod station;
pub mod tagging;
