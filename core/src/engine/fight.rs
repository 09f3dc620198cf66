//! Fight state machine
//!
//! Owns all mutable per-encounter state and interprets the duty timeline:
//! lifecycle signals, listener dispatch, mechanic emission, variable
//! actions, and phase transitions. Every state change flows through
//! `process_event`; progress is exposed only through the replaced-on-write
//! snapshot and the finalized record returned on duty end.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::api::{FightProgress, FightRecord, PlayerRecord};
use crate::duty::{Action, Condition, DutyDescriptor, VarValue};
use crate::events::{EncounterSummary, GameEvent};

use super::expr;
use super::listener::ListenerIndex;
use super::snapshot::{CheckpointState, FightSnapshot};

/// Enemy HP at or below this ratio counts as a kill when no explicit
/// wipe/complete signal was observed.
const CLEAR_HP_EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Ready,
    InProgress,
    Completed,
}

pub struct FightContext {
    descriptor: Arc<DutyDescriptor>,

    lifecycle: Lifecycle,

    /// Always within the timeline's phase list
    phase_index: usize,

    /// -1 until the first checkpoint of the phase is reached; monotonically
    /// non-decreasing within a phase
    subphase_index: i32,

    /// Unset until a wipe/complete signal arrives; finalize falls back to
    /// the enemy-HP inference when still unset
    is_clear: Option<bool>,

    /// NPC id of the enemy tracked for the active phase
    enemy_id: u32,

    variables: HashMap<String, VarValue>,

    completed_checkpoints: HashSet<String>,

    listeners: ListenerIndex,

    snapshot: Arc<FightSnapshot>,
}

impl FightContext {
    /// Build a fight for a validated descriptor and enter its first phase.
    pub fn new(descriptor: Arc<DutyDescriptor>) -> Self {
        let mut context = Self {
            descriptor,
            lifecycle: Lifecycle::Ready,
            phase_index: 0,
            subphase_index: -1,
            is_clear: None,
            enemy_id: 0,
            variables: HashMap::new(),
            completed_checkpoints: HashSet::new(),
            listeners: ListenerIndex::new(),
            snapshot: Arc::new(FightSnapshot::default()),
        };
        context.reset();
        context
    }

    pub fn descriptor(&self) -> &DutyDescriptor {
        &self.descriptor
    }

    pub fn zone_id(&self) -> u32 {
        self.descriptor.zone_id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn tracked_enemy(&self) -> u32 {
        self.enemy_id
    }

    /// Index of the active phase in the timeline.
    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    /// Index of the last reached checkpoint in the active phase, or -1.
    pub fn subphase_index(&self) -> i32 {
        self.subphase_index
    }

    /// Latest published snapshot. The Arc is replaced wholesale on every
    /// state change, so holders read a consistent view.
    pub fn snapshot(&self) -> Arc<FightSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Re-seed all runtime state from the descriptor and enter phase 0.
    /// Idempotent.
    pub fn reset(&mut self) {
        let descriptor = Arc::clone(&self.descriptor);

        self.lifecycle = Lifecycle::Ready;
        self.is_clear = None;
        self.phase_index = 0;
        self.subphase_index = -1;
        self.enemy_id = 0;

        self.completed_checkpoints.clear();
        self.listeners.clear();

        self.variables.clear();
        for variable in &descriptor.variables {
            self.variables
                .insert(variable.name.clone(), variable.initial.clone());
        }

        self.enter_phase(0);
    }

    /// Single entry point for all runtime events. Returns the finalized
    /// record when the event ends the duty.
    pub fn process_event(&mut self, event: &GameEvent) -> Option<FightRecord> {
        let record = self.lifecycle_event(event);
        if record.is_some() {
            return record;
        }

        if self.lifecycle != Lifecycle::InProgress {
            return None;
        }

        // Candidates are captured before dispatch: a mechanic that changes
        // phase mid-loop does not retract the remaining nominations for
        // this event.
        let candidates = self.listeners.lookup(event).to_vec();
        for mechanic_idx in candidates {
            if self.descriptor.mechanics[mechanic_idx]
                .trigger
                .matches(event)
            {
                self.emit_mechanic(mechanic_idx);
            }
        }

        None
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    fn lifecycle_event(&mut self, event: &GameEvent) -> Option<FightRecord> {
        match event {
            GameEvent::DutyStarted => {
                // re-entrant starts while already in progress are ignored
                if matches!(self.lifecycle, Lifecycle::Ready | Lifecycle::Completed) {
                    tracing::info!(
                        zone_id = self.descriptor.zone_id,
                        "duty started, initializing fight state"
                    );
                    self.reset();
                    self.lifecycle = Lifecycle::InProgress;
                }
                None
            }
            GameEvent::DutyWiped => {
                tracing::info!(zone_id = self.descriptor.zone_id, "duty wiped");
                self.is_clear = Some(false);
                None
            }
            GameEvent::DutyCompleted => {
                tracing::info!(zone_id = self.descriptor.zone_id, "duty completed");
                self.is_clear = Some(true);
                None
            }
            GameEvent::DutyEnded { encounter } => {
                tracing::info!(
                    zone_id = self.descriptor.zone_id,
                    "duty ended, finalizing fight record"
                );
                self.lifecycle = Lifecycle::Completed;
                Some(self.finalize(encounter))
            }
            _ => None,
        }
    }

    // ─── Mechanic Emission ───────────────────────────────────────────────────

    fn emit_mechanic(&mut self, mechanic_idx: usize) {
        let descriptor = Arc::clone(&self.descriptor);
        let mechanic = &descriptor.mechanics[mechanic_idx];
        let phase = &descriptor.timeline.phases[self.phase_index];

        tracing::debug!(mechanic = %mechanic.name, phase = %phase.name, "mechanic fired");

        // Checkpoint bookkeeping only applies to mechanics in the phase's
        // checkpoint list; transition-only mechanics skip it. A re-fired
        // earlier checkpoint never regresses the subphase cursor.
        if let Some(position) = phase.checkpoints.iter().position(|c| c == &mechanic.name) {
            self.completed_checkpoints.insert(mechanic.name.clone());
            if position as i32 >= self.subphase_index {
                self.subphase_index = position as i32;
            }
        }

        for action in &mechanic.actions {
            self.apply_action(action);
        }

        // Runs against whatever phase is active now; an action above may
        // already have moved the cursor.
        self.check_mechanic_transitions(&mechanic.name);

        self.publish_snapshot();
    }

    fn apply_action(&mut self, action: &Action) {
        match action {
            Action::IncrementVariable { name } => {
                if let Some(VarValue::Number(value)) = self.variables.get_mut(name) {
                    *value += 1.0;
                }
            }
            Action::SetVariable { name, value } => {
                self.variables.insert(name.clone(), value.clone());
            }
        }

        self.check_expression_transitions(action.variable_name());
        self.publish_snapshot();
    }

    // ─── Transitions ─────────────────────────────────────────────────────────

    /// First declared transition with a matching mechanic condition wins.
    fn check_mechanic_transitions(&mut self, mechanic_name: &str) {
        let descriptor = Arc::clone(&self.descriptor);
        let phase = &descriptor.timeline.phases[self.phase_index];

        for transition in &phase.transitions {
            let hit = transition.conditions.iter().any(|condition| {
                matches!(
                    condition,
                    Condition::MechanicTriggered { mechanic_name: name } if name == mechanic_name
                )
            });
            if hit {
                if let Some(target) = descriptor.phase_index(&transition.target_phase) {
                    self.enter_phase(target);
                }
                return;
            }
        }
    }

    /// First declared transition with an expression condition naming the
    /// just-mutated variable that evaluates true wins.
    fn check_expression_transitions(&mut self, variable_name: &str) {
        let descriptor = Arc::clone(&self.descriptor);
        let phase = &descriptor.timeline.phases[self.phase_index];

        for transition in &phase.transitions {
            let hit = transition.conditions.iter().any(|condition| match condition {
                Condition::Expression { expression } => {
                    expression.contains(variable_name)
                        && expr::evaluate(expression, &self.variables)
                }
                Condition::MechanicTriggered { .. } => false,
            });
            if hit {
                if let Some(target) = descriptor.phase_index(&transition.target_phase) {
                    self.enter_phase(target);
                }
                return;
            }
        }
    }

    /// Enter a phase, resetting subphase progress and rebuilding listeners.
    /// Re-entering the active phase is a full reset of its checkpoints.
    fn enter_phase(&mut self, phase_index: usize) {
        let descriptor = Arc::clone(&self.descriptor);
        let phase = &descriptor.timeline.phases[phase_index];

        self.phase_index = phase_index;
        self.subphase_index = -1;
        self.enemy_id = phase.target_id;
        self.completed_checkpoints.clear();
        self.listeners.rebuild(&descriptor, phase);

        tracing::debug!(phase = %phase.name, enemy_id = phase.target_id, "entered phase");

        self.publish_snapshot();
    }

    // ─── Finalization ────────────────────────────────────────────────────────

    fn finalize(&self, encounter: &EncounterSummary) -> FightRecord {
        let duration = (encounter.end_time - encounter.start_time)
            .num_nanoseconds()
            .unwrap_or(i64::MAX)
            .max(1);

        let enemy_hp = encounter.enemy_hp_ratio(self.enemy_id).unwrap_or(1.0);
        let clear = self.is_clear.unwrap_or(enemy_hp <= CLEAR_HP_EPSILON);

        FightRecord {
            start_time: encounter.start_time,
            duration,
            zone_id: self.descriptor.zone_id,
            players: encounter
                .players
                .iter()
                .map(|p| PlayerRecord {
                    name: p.name.clone(),
                    server: p.server.clone(),
                    job_id: p.job_id,
                    level: p.level,
                    death_count: p.death_count,
                })
                .collect(),
            clear,
            progress: FightProgress {
                phase: self.phase_index as u32,
                subphase: self.subphase_index.max(0) as u32,
                enemy_id: self.enemy_id,
                enemy_hp,
            },
        }
    }

    // ─── Snapshot ────────────────────────────────────────────────────────────

    fn publish_snapshot(&mut self) {
        let phase = &self.descriptor.timeline.phases[self.phase_index];

        let subphase = usize::try_from(self.subphase_index)
            .ok()
            .and_then(|i| phase.checkpoints.get(i))
            .cloned()
            .unwrap_or_default();

        let checkpoints = phase
            .checkpoints
            .iter()
            .map(|name| CheckpointState {
                name: name.clone(),
                completed: self.completed_checkpoints.contains(name),
            })
            .collect();

        self.snapshot = Arc::new(FightSnapshot {
            phase: phase.name.clone(),
            subphase,
            checkpoints,
            variables: self.variables.clone(),
        });
    }
}
