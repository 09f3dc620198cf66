pub mod api;
pub mod config;
pub mod duty;
pub mod engine;
pub mod events;

// Re-exports for convenience
pub use api::{ApiClient, ApiError, FightProgress, FightRecord, PlayerRecord};
pub use config::{ApiConfig, EngineConfig};
pub use duty::{
    Action, Condition, ConfigError, DutyDescriptor, Mechanic, Phase, Timeline, Transition,
    Trigger, VarValue, Variable, load_descriptor_from_file,
};
pub use engine::{
    CheckpointState, DutyProvider, EventRecorder, FightContext, FightSnapshot, Lifecycle,
    ListenerIndex, RecordSink, RuleEngine,
};
pub use events::{CombatantHp, EncounterSummary, EventKind, GameEvent, PlayerState};
