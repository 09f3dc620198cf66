//! Fight record wire format
//!
//! JSON payload uploaded to the record service when a duty ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Finalized record of one duty attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightRecord {
    pub start_time: DateTime<Utc>,

    /// Encounter length in nanoseconds, never 0
    pub duration: i64,

    pub zone_id: u32,

    pub players: Vec<PlayerRecord>,

    pub clear: bool,

    pub progress: FightProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub server: String,
    pub job_id: u32,
    pub level: u32,
    pub death_count: u32,
}

/// How far the party got, reported even on a clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightProgress {
    pub phase: u32,
    pub subphase: u32,
    pub enemy_id: u32,
    /// Remaining-HP ratio of the tracked enemy, 0.0–1.0
    pub enemy_hp: f64,
}
