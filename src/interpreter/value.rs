use crate::ast::Literal;

use super::{class::Instance, Callable};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Instance),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// Never coerces: values of different kinds are never equal, and reference
// types compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.is_nan() => write!(f, "NaN"),
            Value::Number(n) if n.is_infinite() => write!(f, "{}Inf", if *n > 0.0 { "+" } else { "-" }),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Callable(callable) => write!(f, "{}", callable),
            Value::Instance(instance) => write!(f, "{}", instance),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_ne!(Value::Bool(false), Value::Nil);
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
    }

    #[test]
    fn display_non_finite_numbers() {
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "+Inf");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Inf");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
    }
}
