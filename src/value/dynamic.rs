use super::ValueType;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Runtime values flowing through ports.
///
/// Domain entities are carried by id; the card/buff/player model lives in the host.
/// `Opaque` holds arbitrary host objects (the game instance, event arguments) and is
/// skipped by serialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Card(u64),
    Buff(u64),
    Player(u64),
    Array(Vec<Value>),
    #[serde(skip)]
    Opaque(Opaque),
}

impl Value {
    pub fn opaque<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Value::Opaque(Opaque::new(type_name, value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value is already a valid inhabitant of `ty`.
    ///
    /// `Null` inhabits every reference type, arrays conform when every element does.
    pub fn conforms_to(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (_, ValueType::Any) => true,
            (Value::Null, ty) => ty.is_reference(),
            (Value::Bool(_), ValueType::Bool)
            | (Value::Int(_), ValueType::Int)
            | (Value::Float(_), ValueType::Float)
            | (Value::String(_), ValueType::String)
            | (Value::Card(_), ValueType::Card)
            | (Value::Buff(_), ValueType::Buff)
            | (Value::Player(_), ValueType::Player) => true,
            (Value::Opaque(o), ValueType::Object(name)) => o.type_name() == name,
            (Value::Array(items), ValueType::Array(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            _ => false,
        }
    }

    /// A short name for the runtime kind of this value, used in error messages.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Card(_) => "card",
            Value::Buff(_) => "buff",
            Value::Player(_) => "player",
            Value::Array(_) => "array",
            Value::Opaque(o) => o.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Card(id) => write!(f, "card#{}", id),
            Value::Buff(id) => write!(f, "buff#{}", id),
            Value::Player(id) => write!(f, "player#{}", id),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

/// A shared, type-erased host object.
///
/// Equality is identity: two opaque values are equal only if they share the allocation.
#[derive(Clone)]
pub struct Opaque {
    type_name: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: Arc::from(type_name.into()),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opaque")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_conforms_only_to_references() {
        assert!(Value::Null.conforms_to(&ValueType::Card));
        assert!(Value::Null.conforms_to(&ValueType::object("Game")));
        assert!(!Value::Null.conforms_to(&ValueType::Int));
    }

    #[test]
    fn arrays_conform_elementwise() {
        let ints = Value::from(vec![1i64, 2, 3]);
        assert!(ints.conforms_to(&ValueType::array_of(ValueType::Int)));
        assert!(!ints.conforms_to(&ValueType::array_of(ValueType::String)));
        assert!(!ints.conforms_to(&ValueType::Int));
    }

    #[test]
    fn opaque_equality_is_identity() {
        let a = Opaque::new("Game", 1u8);
        let b = Opaque::new("Game", 1u8);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
