//! Conditional-branch evaluation: parsed guard expressions evaluated
//! against an explicit binding environment.
//!
//! The evaluator never partially evaluates. A missing binding or a type
//! mismatch is an error, not a silent default.

pub mod ast;
pub mod parser;

use std::collections::BTreeMap;

use thiserror::Error;

pub use ast::{Expression, Value};
pub use parser::parse;

use crate::parse::types::ConditionCase;

/// Named parameter/result bindings a condition is evaluated against.
pub type BindingEnv = BTreeMap<String, Value>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    #[error("failed to parse expression '{expression}': {reason}")]
    Parse { expression: String, reason: String },

    #[error("expression references unknown binding '{name}'")]
    MissingBinding { name: String },

    #[error("type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("expression evaluated to {actual}, expected a boolean")]
    NotBoolean { actual: String },
}

/// Build a binding environment from a node's serialized parameters.
/// Nested arrays/objects are not addressable from guard expressions.
pub fn bindings_from_params(params: &serde_json::Map<String, serde_json::Value>) -> BindingEnv {
    let mut env = BindingEnv::new();
    for (name, value) in params {
        let bound = match value {
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => continue,
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Null => Value::Null,
            _ => continue,
        };
        env.insert(name.clone(), bound);
    }
    env
}

/// Evaluate an expression to a value.
pub fn evaluate(expr: &Expression, env: &BindingEnv) -> Result<Value, ExprError> {
    match expr {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Binding(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::MissingBinding { name: name.clone() }),
        Expression::Not(inner) => match evaluate(inner, env)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(ExprError::NotBoolean {
                actual: other.to_string(),
            }),
        },
        Expression::And(l, r) => {
            let lv = expect_bool(evaluate(l, env)?)?;
            if !lv {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(evaluate(r, env)?)?))
        }
        Expression::Or(l, r) => {
            let lv = expect_bool(evaluate(l, env)?)?;
            if lv {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(evaluate(r, env)?)?))
        }
        Expression::Equal(l, r) => {
            let (lv, rv) = (evaluate(l, env)?, evaluate(r, env)?);
            Ok(Value::Bool(lv.loosely_equals(&rv)))
        }
        Expression::NotEqual(l, r) => {
            let (lv, rv) = (evaluate(l, env)?, evaluate(r, env)?);
            Ok(Value::Bool(!lv.loosely_equals(&rv)))
        }
        Expression::GreaterThan(l, r) => numeric_cmp(l, r, env, ">", |a, b| a > b),
        Expression::GreaterThanOrEqual(l, r) => numeric_cmp(l, r, env, ">=", |a, b| a >= b),
        Expression::LessThan(l, r) => numeric_cmp(l, r, env, "<", |a, b| a < b),
        Expression::LessThanOrEqual(l, r) => numeric_cmp(l, r, env, "<=", |a, b| a <= b),
    }
}

fn numeric_cmp(
    l: &Expression,
    r: &Expression,
    env: &BindingEnv,
    op: &'static str,
    f: impl Fn(f64, f64) -> bool,
) -> Result<Value, ExprError> {
    let (lv, rv) = (evaluate(l, env)?, evaluate(r, env)?);
    match (&lv, &rv) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(*a, *b))),
        _ => Err(ExprError::TypeMismatch {
            op,
            lhs: lv.to_string(),
            rhs: rv.to_string(),
        }),
    }
}

fn expect_bool(v: Value) -> Result<bool, ExprError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::NotBoolean {
            actual: other.to_string(),
        }),
    }
}

/// Evaluate a boolean condition: `true` routes to the edge tagged "true",
/// `false` to "false".
pub fn evaluate_boolean(expression: &str, env: &BindingEnv) -> Result<bool, ExprError> {
    let expr = parse(expression)?;
    expect_bool(evaluate(&expr, env)?)
}

/// Outcome of matching a switch expression against its ordered case list.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    Matched { case_id: String },
    Default { case_id: String },
    /// No case matched and no default exists; the caller must treat this
    /// as a fatal branch-resolution error.
    NoMatch { value: Value },
}

/// Evaluate a switch expression and match against the ordered case list by
/// loose equality; first match wins.
pub fn evaluate_switch(
    expression: &str,
    cases: &[ConditionCase],
    env: &BindingEnv,
) -> Result<SwitchOutcome, ExprError> {
    let expr = parse(expression)?;
    let value = evaluate(&expr, env)?;

    for case in cases {
        if case.is_default {
            continue;
        }
        let Some(match_value) = &case.match_value else {
            continue;
        };
        if value.loosely_equals(&Value::Text(match_value.clone())) {
            return Ok(SwitchOutcome::Matched {
                case_id: case.case_id.clone(),
            });
        }
    }

    if let Some(default) = cases.iter().find(|c| c.is_default) {
        return Ok(SwitchOutcome::Default {
            case_id: default.case_id.clone(),
        });
    }

    Ok(SwitchOutcome::NoMatch { value })
}
