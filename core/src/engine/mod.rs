//! Timeline interpretation engine
//!
//! This module provides:
//! - **FightContext**: the per-encounter state machine
//! - **ListenerIndex**: (event kind, subject id) → armed mechanics
//! - **RuleEngine**: the single-consumer sequencer feeding the machine
//! - **expr**: the standalone expression condition evaluator

pub mod expr;

mod fight;
mod listener;
mod recorder;
mod rule_engine;
mod snapshot;

#[cfg(test)]
mod fight_tests;

pub use fight::{FightContext, Lifecycle};
pub use listener::ListenerIndex;
pub use recorder::{DEFAULT_EVENT_HISTORY, EventLogEntry, EventRecorder};
pub use rule_engine::{DutyProvider, RecordSink, RuleEngine};
pub use snapshot::{CheckpointState, FightSnapshot};
