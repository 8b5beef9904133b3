use super::NodeId;
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of the control input every action node carries.
pub const ENTER: &str = "enter";
/// Name of the default control output every action node carries.
pub const EXIT: &str = "exit";
/// Name of the output port carrying a method define's return value.
pub const RETURN: &str = "return";

/// Arena index of a port inside its owning [`ActionGraph`](super::ActionGraph).
///
/// An id records the graph that allocated it and is never reused there, so a stale id
/// or one taken from another graph resolves to nothing rather than to an unrelated port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    pub(crate) graph: u32,
    pub(crate) index: u32,
}

impl PortId {
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.graph, self.index)
    }
}

/// Immutable descriptor of one named, typed port slot.
///
/// Descriptors are shared between every node of a kind. Value equality decides
/// whether two ports are the same slot across a redefinition of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDefine {
    pub value_type: ValueType,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub is_control: bool,
}

impl PortDefine {
    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            value_type,
            display_name: name.clone(),
            name,
            is_variadic: false,
            is_control: false,
        }
    }

    pub fn control(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value_type: ValueType::Any,
            display_name: name.clone(),
            name,
            is_variadic: false,
            is_control: true,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// The static role of a port, combining direction and control/value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    ValueInput,
    ValueOutput,
    ControlInput,
    ControlOutput,
}

impl PortRole {
    /// Value inputs consume one value and control outputs lead to one next step.
    pub fn is_single_connection(self) -> bool {
        matches!(self, PortRole::ValueInput | PortRole::ControlOutput)
    }

    pub fn name(self) -> &'static str {
        match self {
            PortRole::ValueInput => "value input",
            PortRole::ValueOutput => "value output",
            PortRole::ControlInput => "control input",
            PortRole::ControlOutput => "control output",
        }
    }
}

/// A typed endpoint bound to one node and one [`PortDefine`].
#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) id: PortId,
    pub(crate) node: NodeId,
    pub(crate) define: Arc<PortDefine>,
    pub(crate) direction: PortDirection,
    pub(crate) param_index: Option<usize>,
}

impl Port {
    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn define(&self) -> &Arc<PortDefine> {
        &self.define
    }

    pub fn name(&self) -> &str {
        &self.define.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.define.value_type
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Slot index within a variadic group, `None` for a singular port.
    pub fn param_index(&self) -> Option<usize> {
        self.param_index
    }

    pub fn is_control(&self) -> bool {
        self.define.is_control
    }

    pub fn role(&self) -> PortRole {
        match (self.direction, self.define.is_control) {
            (PortDirection::Input, false) => PortRole::ValueInput,
            (PortDirection::Output, false) => PortRole::ValueOutput,
            (PortDirection::Input, true) => PortRole::ControlInput,
            (PortDirection::Output, true) => PortRole::ControlOutput,
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey {
            name: self.define.name.clone(),
            index: self.param_index,
        }
    }

    /// A human-readable description for error messages.
    pub fn describe(&self) -> String {
        format!("{} '{}' on node {}", self.role().name(), self.slot(), self.node)
    }
}

/// Addresses one input slot of a node by name and optional variadic index.
///
/// Renders as `name` or `name[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub name: String,
    pub index: Option<usize>,
}

impl SlotKey {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn variadic(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for SlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix(']').and_then(|rest| rest.split_once('[')) {
            Some((name, index)) => index
                .parse()
                .map(|index| SlotKey::variadic(name, index))
                .map_err(|_| format!("invalid slot index in '{}'", s)),
            None => Ok(SlotKey::single(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_round_trip_through_text() {
        let keys = [SlotKey::single("target"), SlotKey::variadic("values", 4)];
        for key in keys {
            assert_eq!(key.to_string().parse::<SlotKey>(), Ok(key));
        }
        assert!("values[x]".parse::<SlotKey>().is_err());
    }

    #[test]
    fn single_connection_roles() {
        assert!(PortRole::ValueInput.is_single_connection());
        assert!(PortRole::ControlOutput.is_single_connection());
        assert!(!PortRole::ValueOutput.is_single_connection());
        assert!(!PortRole::ControlInput.is_single_connection());
    }
}
