//! Read-only fight progress snapshot
//!
//! Published by replacement after every state-changing operation; safe to
//! hold across subsequent `process_event` calls.

use hashbrown::HashMap;

use crate::duty::VarValue;

/// Progress view for a presentation layer: current phase/subphase, the
/// active phase's checkpoint list with completion flags, and all variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FightSnapshot {
    pub phase: String,

    /// Empty until the first checkpoint of the phase is reached
    pub subphase: String,

    pub checkpoints: Vec<CheckpointState>,

    pub variables: HashMap<String, VarValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointState {
    pub name: String,
    pub completed: bool,
}

impl FightSnapshot {
    pub fn completed_count(&self) -> usize {
        self.checkpoints.iter().filter(|c| c.completed).count()
    }
}
