//! Typed inbound event stream
//!
//! The engine consumes discrete, already-decoded events; raw log-line
//! parsing lives upstream. Each event is a closed tagged union carrying the
//! subject id the listener index keys on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listener index key space: which trigger family an event can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Action,
    Combatant,
    Status,
}

/// A decoded combat-log or duty-state event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Player moved to a new zone; may swap the active timeline
    TerritoryChanged { zone_id: u32 },

    DutyStarted,
    DutyWiped,
    DutyCompleted,
    /// Duty instance ended; carries the encounter summary for finalization
    DutyEnded { encounter: EncounterSummary },

    ActionStarted { subject_id: u32, action_id: u32 },
    ActionCompleted { subject_id: u32, action_id: u32 },

    CombatantSpawned { npc_id: u32 },
    CombatantDestroyed { npc_id: u32 },
    CombatantTargetable { npc_id: u32 },
    CombatantUntargetable { npc_id: u32 },

    StatusApplied { entity_id: u32, status_id: u32 },
    StatusRemoved { entity_id: u32, status_id: u32 },

    PlayerDied { entity_id: u32 },

    CombatOptIn,
    CombatOptOut,
}

impl GameEvent {
    /// Trigger family this event can feed, if any.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::ActionStarted { .. } | Self::ActionCompleted { .. } => Some(EventKind::Action),
            Self::CombatantSpawned { .. }
            | Self::CombatantDestroyed { .. }
            | Self::CombatantTargetable { .. }
            | Self::CombatantUntargetable { .. } => Some(EventKind::Combatant),
            Self::StatusApplied { .. } | Self::StatusRemoved { .. } => Some(EventKind::Status),
            _ => None,
        }
    }

    /// Subject id used for listener lookup, derived the same way triggers
    /// derive their registration key. 0 for events outside the key space.
    pub fn subject_id(&self) -> u32 {
        match self {
            Self::ActionStarted { action_id, .. } | Self::ActionCompleted { action_id, .. } => {
                *action_id
            }
            Self::CombatantSpawned { npc_id }
            | Self::CombatantDestroyed { npc_id }
            | Self::CombatantTargetable { npc_id }
            | Self::CombatantUntargetable { npc_id } => *npc_id,
            Self::StatusApplied { status_id, .. } | Self::StatusRemoved { status_id, .. } => {
                *status_id
            }
            _ => 0,
        }
    }

    /// Stable category label for the event history recorder.
    pub fn category(&self) -> &'static str {
        match self {
            Self::TerritoryChanged { .. } => "TerritoryChanged",
            Self::DutyStarted => "DutyStarted",
            Self::DutyWiped => "DutyWiped",
            Self::DutyCompleted => "DutyCompleted",
            Self::DutyEnded { .. } => "DutyEnded",
            Self::ActionStarted { .. } => "ActionStarted",
            Self::ActionCompleted { .. } => "ActionCompleted",
            Self::CombatantSpawned { .. } => "CombatantSpawned",
            Self::CombatantDestroyed { .. } => "CombatantDestroyed",
            Self::CombatantTargetable { .. } => "CombatantTargetable",
            Self::CombatantUntargetable { .. } => "CombatantUntargetable",
            Self::StatusApplied { .. } => "StatusApplied",
            Self::StatusRemoved { .. } => "StatusRemoved",
            Self::PlayerDied { .. } => "PlayerDied",
            Self::CombatOptIn => "CombatOptIn",
            Self::CombatOptOut => "CombatOptOut",
        }
    }

    /// Short human-readable payload for the event history recorder.
    pub fn describe(&self) -> String {
        match self {
            Self::TerritoryChanged { zone_id } => zone_id.to_string(),
            Self::ActionStarted {
                subject_id,
                action_id,
            }
            | Self::ActionCompleted {
                subject_id,
                action_id,
            } => format!("{subject_id} - {action_id}"),
            Self::CombatantSpawned { npc_id }
            | Self::CombatantDestroyed { npc_id }
            | Self::CombatantTargetable { npc_id }
            | Self::CombatantUntargetable { npc_id } => npc_id.to_string(),
            Self::StatusApplied {
                entity_id,
                status_id,
            }
            | Self::StatusRemoved {
                entity_id,
                status_id,
            } => format!("{entity_id} - {status_id}"),
            Self::PlayerDied { entity_id } => entity_id.to_string(),
            other => other.category().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Duty-end payload
// ═══════════════════════════════════════════════════════════════════════════

/// Encounter summary delivered with [`GameEvent::DutyEnded`]. Arrives
/// already enriched: player identities and death counts are resolved
/// upstream, combatant HP data is whatever the log source last knew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    #[serde(default)]
    pub players: Vec<PlayerState>,

    #[serde(default)]
    pub combatants: Vec<CombatantHp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub server: String,
    pub job_id: u32,
    pub level: u32,
    pub death_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantHp {
    /// NPC data id, matched against the phase's tracked enemy
    pub npc_id: u32,
    pub current_hp: i64,
    pub max_hp: i64,
}

impl EncounterSummary {
    /// Remaining-HP ratio of the tracked enemy, `None` when no combatant
    /// matches the id (multi-add fights may never report the tracked id).
    pub fn enemy_hp_ratio(&self, enemy_id: u32) -> Option<f64> {
        self.combatants
            .iter()
            .find(|c| c.npc_id == enemy_id && c.max_hp > 0)
            .map(|c| (c.current_hp as f64 / c.max_hp as f64).clamp(0.0, 1.0))
    }
}
