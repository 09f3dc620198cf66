//! Listener index
//!
//! Precomputed lookup from an event's (kind, subject id) to the mechanics
//! armed for the active phase. The index widens: a logical trigger registers
//! every sub-trigger under its own key, so a hit only nominates the mechanic
//! for full trigger re-evaluation at dispatch time. It must never produce a
//! false negative; false positives are filtered by `Trigger::matches`.

use hashbrown::{HashMap, HashSet};

use crate::duty::{Condition, DutyDescriptor, Phase, Trigger};
use crate::events::{EventKind, GameEvent};

#[derive(Debug, Default)]
pub struct ListenerIndex {
    listeners: HashMap<(EventKind, u32), Vec<usize>>,
}

impl ListenerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Rebuild the index for a phase. Relevant mechanics are the phase's
    /// checkpoints plus every mechanic named by a transition condition;
    /// rebuilding from scratch on each phase entry keeps stale listeners
    /// impossible.
    pub fn rebuild(&mut self, descriptor: &DutyDescriptor, phase: &Phase) {
        self.listeners.clear();

        let mut relevant: HashSet<&str> =
            phase.checkpoints.iter().map(String::as_str).collect();
        for transition in &phase.transitions {
            for condition in &transition.conditions {
                if let Condition::MechanicTriggered { mechanic_name } = condition {
                    relevant.insert(mechanic_name.as_str());
                }
            }
        }

        for (idx, mechanic) in descriptor.mechanics.iter().enumerate() {
            if relevant.contains(mechanic.name.as_str()) {
                self.register(idx, &mechanic.trigger);
            }
        }
    }

    fn register(&mut self, mechanic_idx: usize, trigger: &Trigger) {
        if let Trigger::Logical { conditions, .. } = trigger {
            for sub in conditions {
                self.register(mechanic_idx, sub);
            }
            return;
        }

        let Some(kind) = trigger.kind() else {
            return;
        };
        let entry = self
            .listeners
            .entry((kind, trigger.subject_id()))
            .or_default();
        if !entry.contains(&mechanic_idx) {
            entry.push(mechanic_idx);
        }
    }

    /// Mechanics nominated for this event, as indices into the descriptor's
    /// mechanic list. Empty for events outside the key space.
    pub fn lookup(&self, event: &GameEvent) -> &[usize] {
        let Some(kind) = event.kind() else {
            return &[];
        };
        self.listeners
            .get(&(kind, event.subject_id()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
