//! Error types for duty descriptor operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors during descriptor loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timeline for zone {zone_id} has no phases")]
    EmptyTimeline { zone_id: u32 },

    #[error("phase '{phase}' transition targets unknown phase '{target}'")]
    UnknownTargetPhase { phase: String, target: String },

    #[error("phase '{phase}' condition references unknown mechanic '{mechanic}'")]
    UnknownMechanic { phase: String, mechanic: String },

    #[error("phase '{phase}' checkpoint references unknown mechanic '{checkpoint}'")]
    UnknownCheckpoint { phase: String, checkpoint: String },

    #[error("failed to read descriptor file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse descriptor JSON in {path}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
