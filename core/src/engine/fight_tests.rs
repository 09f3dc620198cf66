//! Scenario tests for the fight state machine
//!
//! Drives `FightContext` with synthetic descriptors and event sequences and
//! checks the progress invariants: monotonic subphase, checkpoint subset,
//! transition tie-break order, reset idempotence, and finalization.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::duty::{
    Action, ActionStatus, Condition, DutyDescriptor, Mechanic, Phase, Timeline, Transition,
    Trigger, VarValue, Variable,
};
use crate::events::{CombatantHp, EncounterSummary, GameEvent, PlayerState};

use super::fight::{FightContext, Lifecycle};

// ─── Builders ────────────────────────────────────────────────────────────────

fn action_trigger(action_id: u32) -> Trigger {
    Trigger::Action {
        status: ActionStatus::Start,
        action_id: Some(action_id),
    }
}

fn mechanic(name: &str, trigger: Trigger, actions: Vec<Action>) -> Mechanic {
    Mechanic {
        name: name.to_string(),
        name_en: String::new(),
        trigger,
        actions,
    }
}

fn phase(name: &str, target_id: u32, checkpoints: &[&str], transitions: Vec<Transition>) -> Phase {
    Phase {
        name: name.to_string(),
        target_id,
        checkpoints: checkpoints.iter().map(|c| c.to_string()).collect(),
        transitions,
    }
}

fn on_mechanic(target: &str, mechanic_name: &str) -> Transition {
    Transition {
        target_phase: target.to_string(),
        conditions: vec![Condition::MechanicTriggered {
            mechanic_name: mechanic_name.to_string(),
        }],
    }
}

fn on_expression(target: &str, expression: &str) -> Transition {
    Transition {
        target_phase: target.to_string(),
        conditions: vec![Condition::Expression {
            expression: expression.to_string(),
        }],
    }
}

fn descriptor(
    variables: Vec<Variable>,
    mechanics: Vec<Mechanic>,
    phases: Vec<Phase>,
) -> Arc<DutyDescriptor> {
    let descriptor = DutyDescriptor {
        zone_id: 1122,
        name: String::new(),
        name_en: String::new(),
        code: String::new(),
        party_size: 8,
        variables,
        mechanics,
        timeline: Timeline {
            start_phase: String::new(),
            phases,
        },
    };
    descriptor.validate().expect("test descriptor must be valid");
    Arc::new(descriptor)
}

fn number_var(name: &str, initial: f64) -> Variable {
    Variable {
        name: name.to_string(),
        initial: VarValue::Number(initial),
    }
}

fn cast(action_id: u32) -> GameEvent {
    GameEvent::ActionStarted {
        subject_id: 0x4000_0000,
        action_id,
    }
}

fn summary(combatants: Vec<CombatantHp>) -> EncounterSummary {
    EncounterSummary {
        start_time: Utc.with_ymd_and_hms(2025, 3, 14, 13, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2025, 3, 14, 13, 6, 52).unwrap(),
        players: vec![PlayerState {
            name: "A'zhara Khol".to_string(),
            server: "Shinryu".to_string(),
            job_id: 33,
            level: 100,
            death_count: 1,
        }],
        combatants,
    }
}

fn started(context: &mut FightContext) {
    context.process_event(&GameEvent::DutyStarted);
    assert_eq!(context.lifecycle(), Lifecycle::InProgress);
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn linear_phase_chain() {
    let duty = descriptor(
        Vec::new(),
        vec![
            mechanic("A", action_trigger(100), Vec::new()),
            mechanic("B", action_trigger(200), Vec::new()),
        ],
        vec![
            phase("p0", 1, &["A"], vec![on_mechanic("p1", "A")]),
            phase("p1", 2, &["B"], Vec::new()),
        ],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);

    context.process_event(&cast(100));
    context.process_event(&cast(200));

    assert_eq!(context.phase_index(), 1);
    assert_eq!(context.subphase_index(), 0);
    assert_eq!(context.tracked_enemy(), 2);

    let snapshot = context.snapshot();
    assert_eq!(snapshot.phase, "p1");
    assert_eq!(snapshot.subphase, "B");
    assert_eq!(snapshot.completed_count(), 1);
    assert!(snapshot.checkpoints[0].completed);
}

#[test]
fn variable_gated_transition_fires_on_third_stack() {
    let duty = descriptor(
        vec![number_var("stacks", 0.0)],
        vec![mechanic(
            "stack up",
            action_trigger(100),
            vec![Action::IncrementVariable {
                name: "stacks".to_string(),
            }],
        )],
        vec![
            phase(
                "p0",
                1,
                &["stack up"],
                vec![on_expression("p1", "variables.stacks >= 3")],
            ),
            phase("p1", 2, &[], Vec::new()),
        ],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);

    context.process_event(&cast(100));
    assert_eq!(context.phase_index(), 0);
    context.process_event(&cast(100));
    assert_eq!(context.phase_index(), 0);
    context.process_event(&cast(100));
    assert_eq!(context.phase_index(), 1);

    assert_eq!(
        context.snapshot().variables.get("stacks"),
        Some(&VarValue::Number(3.0))
    );
}

#[test]
fn subphase_never_regresses_within_a_phase() {
    let duty = descriptor(
        Vec::new(),
        vec![
            mechanic("first", action_trigger(100), Vec::new()),
            mechanic("second", action_trigger(200), Vec::new()),
        ],
        vec![phase("p0", 1, &["first", "second"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);

    context.process_event(&cast(200));
    assert_eq!(context.subphase_index(), 1);

    // an earlier checkpoint re-firing must not move progress backwards
    context.process_event(&cast(100));
    assert_eq!(context.subphase_index(), 1);
    assert_eq!(context.snapshot().subphase, "second");
    assert_eq!(context.snapshot().completed_count(), 2);
}

#[test]
fn reset_is_idempotent() {
    let duty = descriptor(
        vec![number_var("stacks", 2.0)],
        vec![mechanic(
            "stack up",
            action_trigger(100),
            vec![Action::IncrementVariable {
                name: "stacks".to_string(),
            }],
        )],
        vec![phase("p0", 1, &["stack up"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));
    assert_eq!(
        context.snapshot().variables.get("stacks"),
        Some(&VarValue::Number(3.0))
    );

    context.reset();
    let once = context.snapshot();
    context.reset();
    let twice = context.snapshot();

    assert_eq!(*once, *twice);
    assert_eq!(once.variables.get("stacks"), Some(&VarValue::Number(2.0)));
    assert_eq!(once.completed_count(), 0);
    assert_eq!(once.subphase, "");
    assert_eq!(context.lifecycle(), Lifecycle::Ready);
}

#[test]
fn first_declared_transition_wins() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![
            phase(
                "p0",
                1,
                &["A"],
                vec![on_mechanic("winner", "A"), on_mechanic("loser", "A")],
            ),
            phase("winner", 2, &[], Vec::new()),
            phase("loser", 3, &[], Vec::new()),
        ],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));

    assert_eq!(context.snapshot().phase, "winner");
}

#[test]
fn duty_end_before_any_mechanic_uses_hp_fallback() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![phase("p0", 13050, &["A"], Vec::new())],
    );

    // enemy still near full health: not a clear
    let mut context = FightContext::new(Arc::clone(&duty));
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: summary(vec![CombatantHp {
                npc_id: 13050,
                current_hp: 900_000,
                max_hp: 1_000_000,
            }]),
        })
        .expect("duty end must finalize a record");

    assert_eq!(record.progress.phase, 0);
    assert_eq!(record.progress.subphase, 0);
    assert_eq!(record.progress.enemy_id, 13050);
    assert!(!record.clear);
    assert!((record.progress.enemy_hp - 0.9).abs() < f64::EPSILON);
    assert_eq!(context.lifecycle(), Lifecycle::Completed);

    // enemy at zero: inferred kill
    let mut context = FightContext::new(Arc::clone(&duty));
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: summary(vec![CombatantHp {
                npc_id: 13050,
                current_hp: 0,
                max_hp: 1_000_000,
            }]),
        })
        .unwrap();
    assert!(record.clear);

    // tracked enemy never reported: full health assumed, not a clear
    let mut context = FightContext::new(duty);
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: summary(Vec::new()),
        })
        .unwrap();
    assert!(!record.clear);
    assert!((record.progress.enemy_hp - 1.0).abs() < f64::EPSILON);
}

#[test]
fn explicit_signals_override_hp_fallback() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![phase("p0", 13050, &["A"], Vec::new())],
    );

    // wipe recorded, enemy data says dead: wipe wins
    let mut context = FightContext::new(Arc::clone(&duty));
    started(&mut context);
    context.process_event(&GameEvent::DutyWiped);
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: summary(vec![CombatantHp {
                npc_id: 13050,
                current_hp: 0,
                max_hp: 1_000_000,
            }]),
        })
        .unwrap();
    assert!(!record.clear);

    // completion recorded, enemy data says alive: completion wins
    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&GameEvent::DutyCompleted);
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: summary(vec![CombatantHp {
                npc_id: 13050,
                current_hp: 500_000,
                max_hp: 1_000_000,
            }]),
        })
        .unwrap();
    assert!(record.clear);
}

#[test]
fn duration_is_floored_to_one_nanosecond() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![phase("p0", 1, &["A"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    let instant = Utc.with_ymd_and_hms(2025, 3, 14, 13, 0, 0).unwrap();
    let record = context
        .process_event(&GameEvent::DutyEnded {
            encounter: EncounterSummary {
                start_time: instant,
                end_time: instant,
                players: Vec::new(),
                combatants: Vec::new(),
            },
        })
        .unwrap();

    assert_eq!(record.duration, 1);
}

#[test]
fn reentrant_duty_start_is_a_noop() {
    let duty = descriptor(
        vec![number_var("stacks", 0.0)],
        vec![mechanic(
            "stack up",
            action_trigger(100),
            vec![Action::IncrementVariable {
                name: "stacks".to_string(),
            }],
        )],
        vec![phase("p0", 1, &["stack up"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));
    let before = context.snapshot();

    context.process_event(&GameEvent::DutyStarted);

    assert_eq!(context.lifecycle(), Lifecycle::InProgress);
    assert_eq!(*before, *context.snapshot());
}

#[test]
fn duty_start_after_completion_resets() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![phase("p0", 1, &["A"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));
    context.process_event(&GameEvent::DutyEnded {
        encounter: summary(Vec::new()),
    });
    assert_eq!(context.lifecycle(), Lifecycle::Completed);

    context.process_event(&GameEvent::DutyStarted);
    assert_eq!(context.lifecycle(), Lifecycle::InProgress);
    assert_eq!(context.snapshot().completed_count(), 0);
}

#[test]
fn events_are_dropped_unless_in_progress() {
    let duty = descriptor(
        Vec::new(),
        vec![mechanic("A", action_trigger(100), Vec::new())],
        vec![phase("p0", 1, &["A"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    assert_eq!(context.lifecycle(), Lifecycle::Ready);

    context.process_event(&cast(100));
    assert_eq!(context.snapshot().completed_count(), 0);
    assert_eq!(context.subphase_index(), -1);
}

#[test]
fn checkpoints_clear_on_every_phase_entry() {
    // self-transition: re-entering the same phase resets its checkpoints
    let duty = descriptor(
        Vec::new(),
        vec![
            mechanic("A", action_trigger(100), Vec::new()),
            mechanic("loop", action_trigger(200), Vec::new()),
        ],
        vec![phase(
            "p0",
            1,
            &["A"],
            vec![on_mechanic("p0", "loop")],
        )],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);

    context.process_event(&cast(100));
    assert_eq!(context.snapshot().completed_count(), 1);
    assert_eq!(context.subphase_index(), 0);

    context.process_event(&cast(200));
    assert_eq!(context.snapshot().phase, "p0");
    assert_eq!(context.snapshot().completed_count(), 0);
    assert_eq!(context.subphase_index(), -1);
}

#[test]
fn transition_only_mechanic_stays_out_of_checkpoints() {
    let duty = descriptor(
        Vec::new(),
        vec![
            mechanic("A", action_trigger(100), Vec::new()),
            mechanic("gate", action_trigger(200), Vec::new()),
        ],
        vec![
            phase("p0", 1, &["A"], vec![on_mechanic("p1", "gate")]),
            phase("p1", 2, &[], Vec::new()),
        ],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);

    context.process_event(&cast(200));
    assert_eq!(context.snapshot().phase, "p1");
    // gate fired but was never a checkpoint of p0, and p1 has none
    assert!(context.snapshot().checkpoints.is_empty());
    assert_eq!(context.subphase_index(), -1);
}

#[test]
fn set_variable_creates_and_overwrites() {
    let duty = descriptor(
        vec![number_var("stacks", 0.0)],
        vec![mechanic(
            "brand",
            action_trigger(100),
            vec![
                Action::SetVariable {
                    name: "side".to_string(),
                    value: VarValue::Text("south".to_string()),
                },
                Action::SetVariable {
                    name: "stacks".to_string(),
                    value: VarValue::Number(5.0),
                },
            ],
        )],
        vec![phase("p0", 1, &["brand"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));

    let snapshot = context.snapshot();
    assert_eq!(
        snapshot.variables.get("side"),
        Some(&VarValue::Text("south".to_string()))
    );
    assert_eq!(snapshot.variables.get("stacks"), Some(&VarValue::Number(5.0)));
}

#[test]
fn increment_leaves_non_numeric_and_absent_variables_alone() {
    let duty = descriptor(
        vec![Variable {
            name: "side".to_string(),
            initial: VarValue::Text("north".to_string()),
        }],
        vec![mechanic(
            "tick",
            action_trigger(100),
            vec![
                Action::IncrementVariable {
                    name: "side".to_string(),
                },
                Action::IncrementVariable {
                    name: "missing".to_string(),
                },
            ],
        )],
        vec![phase("p0", 1, &["tick"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));

    let snapshot = context.snapshot();
    assert_eq!(
        snapshot.variables.get("side"),
        Some(&VarValue::Text("north".to_string()))
    );
    assert!(!snapshot.variables.contains_key("missing"));
}

#[test]
fn refired_mechanic_runs_its_actions_again() {
    // double emission is tolerated; only the subphase cursor is clamped
    let duty = descriptor(
        vec![number_var("stacks", 0.0)],
        vec![mechanic(
            "stack up",
            action_trigger(100),
            vec![Action::IncrementVariable {
                name: "stacks".to_string(),
            }],
        )],
        vec![phase("p0", 1, &["stack up"], Vec::new())],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));
    context.process_event(&cast(100));

    assert_eq!(
        context.snapshot().variables.get("stacks"),
        Some(&VarValue::Number(2.0))
    );
    assert_eq!(context.subphase_index(), 0);
}

#[test]
fn variables_persist_across_phase_transitions() {
    let duty = descriptor(
        vec![number_var("stacks", 0.0)],
        vec![
            mechanic(
                "stack up",
                action_trigger(100),
                vec![Action::IncrementVariable {
                    name: "stacks".to_string(),
                }],
            ),
            mechanic("gate", action_trigger(200), Vec::new()),
        ],
        vec![
            phase("p0", 1, &["stack up"], vec![on_mechanic("p1", "gate")]),
            phase("p1", 2, &[], Vec::new()),
        ],
    );

    let mut context = FightContext::new(duty);
    started(&mut context);
    context.process_event(&cast(100));
    context.process_event(&cast(200));

    assert_eq!(context.snapshot().phase, "p1");
    assert_eq!(
        context.snapshot().variables.get("stacks"),
        Some(&VarValue::Number(1.0))
    );
}
