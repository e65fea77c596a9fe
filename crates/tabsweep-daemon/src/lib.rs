//! tabsweep-daemon: the sweep engine.
//! Applies tab lifecycle events and timer ticks to the age ledger, gates
//! closing on workspace activation, and publishes the active-in-workspace
//! flag with versioned change tracking for clients.

pub mod engine;

pub use engine::{ApplyResult, ChangeReason, FlagChange, FlagVersion, SweepEngine, TickOutcome};
