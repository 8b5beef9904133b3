//! Type coercion between connected ports.
//!
//! Variadic ports are declared with a scalar element type while their marshalled
//! argument is always an array, and single-valued ports may be fed by an upstream node
//! that produces an array. [`FlowConvert`] reconciles these mismatches, consulting a
//! pluggable [`ConvertHook`] first for domain-specific casts.

use crate::value::{Value, ValueType};

/// A pluggable direct-conversion rule consulted before the array pack/unpack rules.
pub trait ConvertHook: Send + Sync {
    /// Converts `value` to `target`, or returns `None` if this hook has no rule for it.
    fn convert(&self, value: &Value, target: &ValueType) -> Option<Value>;

    /// Whether a port of type `from` may feed a port of type `to` through this hook.
    fn can_convert(&self, from: &ValueType, to: &ValueType) -> bool;
}

/// A hook with no rules; only the structural array rules apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConversions;

impl ConvertHook for NoConversions {
    fn convert(&self, _value: &Value, _target: &ValueType) -> Option<Value> {
        None
    }

    fn can_convert(&self, _from: &ValueType, _to: &ValueType) -> bool {
        false
    }
}

/// Numeric widening/narrowing, bool/int interop, and formatting to string.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardConversions;

impl ConvertHook for StandardConversions {
    fn convert(&self, value: &Value, target: &ValueType) -> Option<Value> {
        match (value, target) {
            (Value::Int(i), ValueType::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(f), ValueType::Int) => Some(Value::Int(f.trunc() as i64)),
            (Value::Bool(b), ValueType::Int) => Some(Value::Int(i64::from(*b))),
            (Value::Int(i), ValueType::Bool) => Some(Value::Bool(*i != 0)),
            (Value::String(s), ValueType::Int) => s.trim().parse().ok().map(Value::Int),
            (Value::String(s), ValueType::Float) => s.trim().parse().ok().map(Value::Float),
            (Value::Int(_) | Value::Float(_) | Value::Bool(_), ValueType::String) => {
                Some(Value::String(value.to_string()))
            }
            _ => None,
        }
    }

    fn can_convert(&self, from: &ValueType, to: &ValueType) -> bool {
        matches!(
            (from, to),
            (ValueType::Int, ValueType::Float)
                | (ValueType::Float, ValueType::Int)
                | (ValueType::Bool, ValueType::Int)
                | (ValueType::Int, ValueType::Bool)
                | (ValueType::String, ValueType::Int)
                | (ValueType::String, ValueType::Float)
                | (ValueType::Int | ValueType::Float | ValueType::Bool, ValueType::String)
        )
    }
}

/// Stateless coercion helpers.
pub struct FlowConvert;

impl FlowConvert {
    /// Coerces `value` to `target`.
    ///
    /// Values that already conform are returned unchanged. Otherwise the hook is tried,
    /// then a scalar is wrapped into a one-element array, an array is unwrapped to its
    /// first element, or an array is rebuilt element by element. When no rule applies
    /// the target's default value is returned.
    pub fn convert(value: Value, target: &ValueType, hook: &dyn ConvertHook) -> Value {
        if value.conforms_to(target) {
            return value;
        }
        if let Some(converted) = hook.convert(&value, target) {
            return converted;
        }
        match (value, target) {
            (Value::Array(items), ValueType::Array(element)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| Self::convert(item, element, hook))
                    .collect(),
            ),
            (Value::Array(items), target) => match items.into_iter().next() {
                Some(first) => Self::convert(first, target, hook),
                None => target.default_value(),
            },
            (Value::Null, target) => target.default_value(),
            (scalar, ValueType::Array(element)) => {
                Value::Array(vec![Self::convert(scalar, element, hook)])
            }
            (_, target) => target.default_value(),
        }
    }

    /// Whether a port of type `from` may be connected to a port of type `to`.
    pub fn is_convertible(from: &ValueType, to: &ValueType, hook: &dyn ConvertHook) -> bool {
        if from == to || *from == ValueType::Any || *to == ValueType::Any {
            return true;
        }
        if hook.can_convert(from, to) {
            return true;
        }
        match (from, to) {
            (ValueType::Array(a), ValueType::Array(b)) => Self::is_convertible(a, b, hook),
            (ValueType::Array(a), to) => Self::is_convertible(a, to, hook),
            (from, ValueType::Array(b)) => Self::is_convertible(from, b, hook),
            _ => false,
        }
    }
}
