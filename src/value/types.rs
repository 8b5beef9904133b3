use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The static type of a port.
///
/// Reference types (`Card`, `Buff`, `Player`, `Object`) point into the host's domain
/// model and default to `Value::Null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Accepts anything, never coerced.
    Any,
    Bool,
    Int,
    Float,
    String,
    Card,
    Buff,
    Player,
    /// A host object identified by its type name (e.g. `"Game"`, `"EventArg"`).
    Object(String),
    Array(Box<ValueType>),
}

impl ValueType {
    /// Shorthand for `ValueType::Array(Box::new(element))`.
    pub fn array_of(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    pub fn object(name: impl Into<String>) -> Self {
        ValueType::Object(name.into())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ValueType::Array(_))
    }

    /// The element type of an array type, `None` for scalars.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ValueType::Card | ValueType::Buff | ValueType::Player | ValueType::Object(_)
        )
    }

    /// The value an unconnected, undefaulted port of this type yields.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::Array(_) => Value::Array(Vec::new()),
            ValueType::Any
            | ValueType::Card
            | ValueType::Buff
            | ValueType::Player
            | ValueType::Object(_) => Value::Null,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Card => write!(f, "card"),
            ValueType::Buff => write!(f, "buff"),
            ValueType::Player => write!(f, "player"),
            ValueType::Object(name) => write!(f, "{}", name),
            ValueType::Array(element) => write!(f, "{}[]", element),
        }
    }
}
