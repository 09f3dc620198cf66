//! Expression condition evaluator
//!
//! Evaluates `variables.<name> <op> <literal>` against a variable snapshot.
//! Every malformed input resolves to "condition not satisfied" rather than
//! an error; transition evaluation must never abort event processing.

use hashbrown::HashMap;

use crate::duty::VarValue;

const VARIABLE_PREFIX: &str = "variables.";

/// Equality tolerance absorbing integer/float drift between descriptor
/// literals and runtime values.
const EQ_TOLERANCE: f64 = 0.05;

/// Evaluate one comparison expression against the variable snapshot.
pub fn evaluate(expression: &str, variables: &HashMap<String, VarValue>) -> bool {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 3 {
        return false;
    }

    let Some(name) = parts[0].strip_prefix(VARIABLE_PREFIX) else {
        return false;
    };
    let Some(current) = variables.get(name).and_then(VarValue::as_number) else {
        return false;
    };
    let Ok(target) = parts[2].parse::<f64>() else {
        return false;
    };

    match parts[1] {
        "==" => (current - target).abs() < EQ_TOLERANCE,
        "!=" => (current - target).abs() > EQ_TOLERANCE,
        ">" => current > target,
        ">=" => current >= target,
        "<" => current < target,
        "<=" => current <= target,
        _ => false,
    }
}
