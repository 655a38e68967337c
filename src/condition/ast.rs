//! Expression AST for edge-condition guards.

use std::fmt;

/// Runtime value types a condition can produce or bind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
        }
    }
}

impl Value {
    /// Loose equality used for switch-case matching: numbers compare
    /// numerically, everything else by canonical text form.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => self.to_string() == other.to_string(),
        }
    }
}

/// Comparison/logical expression over named parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),

    // Leaves
    Literal(Value),
    Binding(String),
}

impl Expression {
    /// Names of all bindings the expression reads.
    pub fn required_bindings(&self, out: &mut Vec<String>) {
        match self {
            Expression::Binding(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expression::Not(e) => e.required_bindings(out),
            Expression::And(l, r)
            | Expression::Or(l, r)
            | Expression::Equal(l, r)
            | Expression::NotEqual(l, r)
            | Expression::GreaterThan(l, r)
            | Expression::GreaterThanOrEqual(l, r)
            | Expression::LessThan(l, r)
            | Expression::LessThanOrEqual(l, r) => {
                l.required_bindings(out);
                r.required_bindings(out);
            }
            Expression::Literal(_) => {}
        }
    }
}
