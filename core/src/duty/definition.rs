//! Duty timeline definition types
//!
//! Definitions are fetched as JSON from the record service and describe a
//! duty's variables, mechanics, and phase timeline.

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, GameEvent};

use super::ConfigError;

// ═══════════════════════════════════════════════════════════════════════════
// Root Descriptor
// ═══════════════════════════════════════════════════════════════════════════

/// Complete description of one duty: variables, mechanics, and the phase
/// timeline the engine interprets. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyDescriptor {
    /// Territory/zone identifier the duty is keyed on
    pub zone_id: u32,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// English display name
    #[serde(default)]
    pub name_en: String,

    /// Short code (e.g. "m4s")
    #[serde(default)]
    pub code: String,

    /// Expected party size
    #[serde(default)]
    pub party_size: u32,

    /// Fight-scoped variables, seeded at every fight reset
    #[serde(default)]
    pub variables: Vec<Variable>,

    /// Mechanics that can be armed by the active phase
    #[serde(default)]
    pub mechanics: Vec<Mechanic>,

    /// The phase timeline
    pub timeline: Timeline,
}

/// A named fight-scoped variable with its initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub initial: VarValue,
}

/// Variable value: numeric or text. Conversion to a number happens in one
/// place so expression evaluation and action execution agree on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Number(f64),
    Text(String),
}

impl VarValue {
    /// Numeric view of the value. Text values that parse as a real number
    /// count as numeric here; `is_number` does not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl std::fmt::Display for VarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Mechanics
// ═══════════════════════════════════════════════════════════════════════════

/// A named boss ability or event of interest: a trigger plus the actions to
/// run when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mechanic {
    pub name: String,

    #[serde(default)]
    pub name_en: String,

    pub trigger: Trigger,

    #[serde(default)]
    pub actions: Vec<Action>,
}

/// State mutation attached to a mechanic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Add 1 to a numeric variable; non-numeric or absent variables are
    /// left untouched.
    #[serde(rename = "INCREMENT_VARIABLE")]
    IncrementVariable { name: String },

    /// Overwrite a variable, creating it if absent.
    #[serde(rename = "SET_VARIABLE")]
    SetVariable { name: String, value: VarValue },
}

impl Action {
    /// The variable this action names.
    pub fn variable_name(&self) -> &str {
        match self {
            Self::IncrementVariable { name } | Self::SetVariable { name, .. } => name,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Triggers
// ═══════════════════════════════════════════════════════════════════════════

/// What arms a mechanic: an event kind + subject id + status label, or a
/// logical combination of sub-triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    /// An ability cast starting or resolving.
    #[serde(rename = "ACTION_EVENT")]
    Action {
        status: ActionStatus,
        #[serde(default)]
        action_id: Option<u32>,
    },

    /// A combatant lifecycle change.
    #[serde(rename = "COMBATANT_EVENT")]
    Combatant {
        status: CombatantStatus,
        #[serde(default)]
        npc_id: Option<u32>,
    },

    /// A status effect gained or lost.
    #[serde(rename = "STATUS_EVENT")]
    Status {
        status: StatusChange,
        #[serde(default)]
        status_id: Option<u32>,
    },

    /// All sub-triggers must match the same event.
    #[serde(rename = "LOGICAL_OPERATOR")]
    Logical {
        operator: LogicalOperator,
        #[serde(default)]
        conditions: Vec<Trigger>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "COMPLETE")]
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantStatus {
    #[serde(rename = "SPAWN")]
    Spawn,
    #[serde(rename = "DESTROY")]
    Destroy,
    #[serde(rename = "TARGETABLE")]
    Targetable,
    #[serde(rename = "UNTARGETABLE")]
    Untargetable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusChange {
    #[serde(rename = "APPLIED")]
    Applied,
    #[serde(rename = "REMOVED")]
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
}

impl Trigger {
    /// Event kind this trigger listens for (`None` for logical triggers,
    /// which are flattened into their sub-triggers at registration).
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Action { .. } => Some(EventKind::Action),
            Self::Combatant { .. } => Some(EventKind::Combatant),
            Self::Status { .. } => Some(EventKind::Status),
            Self::Logical { .. } => None,
        }
    }

    /// Subject id used as the listener index key; 0 when absent.
    pub fn subject_id(&self) -> u32 {
        match self {
            Self::Action { action_id, .. } => action_id.unwrap_or(0),
            Self::Combatant { npc_id, .. } => npc_id.unwrap_or(0),
            Self::Status { status_id, .. } => status_id.unwrap_or(0),
            Self::Logical { .. } => 0,
        }
    }

    /// Full trigger evaluation against one event. This is the authoritative
    /// filter behind the listener index, which may over-match: a trigger
    /// with an absent subject id never matches, and a logical AND requires
    /// every sub-trigger to match the same event.
    pub fn matches(&self, event: &GameEvent) -> bool {
        match (self, event) {
            (
                Self::Action { status, action_id },
                GameEvent::ActionStarted { action_id: id, .. },
            ) => *status == ActionStatus::Start && *action_id == Some(*id),
            (
                Self::Action { status, action_id },
                GameEvent::ActionCompleted { action_id: id, .. },
            ) => *status == ActionStatus::Complete && *action_id == Some(*id),

            (Self::Combatant { status, npc_id }, GameEvent::CombatantSpawned { npc_id: id }) => {
                *status == CombatantStatus::Spawn && *npc_id == Some(*id)
            }
            (Self::Combatant { status, npc_id }, GameEvent::CombatantDestroyed { npc_id: id }) => {
                *status == CombatantStatus::Destroy && *npc_id == Some(*id)
            }
            (Self::Combatant { status, npc_id }, GameEvent::CombatantTargetable { npc_id: id }) => {
                *status == CombatantStatus::Targetable && *npc_id == Some(*id)
            }
            (
                Self::Combatant { status, npc_id },
                GameEvent::CombatantUntargetable { npc_id: id },
            ) => *status == CombatantStatus::Untargetable && *npc_id == Some(*id),

            (Self::Status { status, status_id }, GameEvent::StatusApplied { status_id: id, .. }) => {
                *status == StatusChange::Applied && *status_id == Some(*id)
            }
            (Self::Status { status, status_id }, GameEvent::StatusRemoved { status_id: id, .. }) => {
                *status == StatusChange::Removed && *status_id == Some(*id)
            }

            (
                Self::Logical {
                    operator: LogicalOperator::And,
                    conditions,
                },
                _,
            ) => !conditions.is_empty() && conditions.iter().all(|c| c.matches(event)),

            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Timeline
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered phase list for a duty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Wire field; the engine always enters the first phase on reset
    #[serde(default)]
    pub start_phase: String,

    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// A stage of the encounter with its own tracked enemy, checkpoint order,
/// and exit transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,

    /// NPC id of the enemy whose HP is tracked during this phase
    #[serde(default)]
    pub target_id: u32,

    /// Mechanic names expected in this phase, in subphase order
    #[serde(default)]
    pub checkpoints: Vec<String>,

    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Rule moving the fight to another phase when any condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub target_phase: String,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    /// Holds when the named mechanic just fired.
    #[serde(rename = "MECHANIC_TRIGGERED")]
    MechanicTriggered { mechanic_name: String },

    /// Holds when a `variables.<name> <op> <literal>` expression naming the
    /// just-mutated variable evaluates true.
    #[serde(rename = "EXPRESSION")]
    Expression { expression: String },
}

// ═══════════════════════════════════════════════════════════════════════════
// Impl Blocks
// ═══════════════════════════════════════════════════════════════════════════

impl DutyDescriptor {
    /// Position of a phase by name.
    pub fn phase_index(&self, name: &str) -> Option<usize> {
        self.timeline.phases.iter().position(|p| p.name == name)
    }

    /// Position of a mechanic by name.
    pub fn mechanic_index(&self, name: &str) -> Option<usize> {
        self.mechanics.iter().position(|m| m.name == name)
    }

    pub fn mechanic_by_name(&self, name: &str) -> Option<&Mechanic> {
        self.mechanics.iter().find(|m| m.name == name)
    }

    /// Validate cross-references once at load time so the interpreter can
    /// index phases and mechanics by position afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeline.phases.is_empty() {
            return Err(ConfigError::EmptyTimeline {
                zone_id: self.zone_id,
            });
        }

        for phase in &self.timeline.phases {
            for checkpoint in &phase.checkpoints {
                if self.mechanic_index(checkpoint).is_none() {
                    return Err(ConfigError::UnknownCheckpoint {
                        phase: phase.name.clone(),
                        checkpoint: checkpoint.clone(),
                    });
                }
            }

            for transition in &phase.transitions {
                if self.phase_index(&transition.target_phase).is_none() {
                    return Err(ConfigError::UnknownTargetPhase {
                        phase: phase.name.clone(),
                        target: transition.target_phase.clone(),
                    });
                }

                for condition in &transition.conditions {
                    if let Condition::MechanicTriggered { mechanic_name } = condition
                        && self.mechanic_index(mechanic_name).is_none()
                    {
                        return Err(ConfigError::UnknownMechanic {
                            phase: phase.name.clone(),
                            mechanic: mechanic_name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
