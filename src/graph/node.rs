use super::{PortId, SlotKey};
use crate::define::ActionDefine;
use crate::value::Value;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a node, unique and positive within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a node does when run.
///
/// `Entry` and `Return` are the pseudo-nodes of a generated define's inner graph; their
/// shape mirrors the signature the graph was created for.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Action(Arc<ActionDefine>),
    Entry,
    Return,
}

impl NodeKind {
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Action(define) => define.name(),
            NodeKind::Entry => "Entry",
            NodeKind::Return => "Return",
        }
    }

    pub fn define(&self) -> Option<&Arc<ActionDefine>> {
        match self {
            NodeKind::Action(define) => Some(define),
            NodeKind::Entry | NodeKind::Return => None,
        }
    }
}

/// Editor position of a node. Carried through serialization, ignored at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A unit of computation inside an [`ActionGraph`](super::ActionGraph).
///
/// The port lists are not fixed: they are recomputed whenever the node's define or the
/// arity of one of its variadic groups changes.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<PortId>,
    pub(crate) outputs: Vec<PortId>,
    pub(crate) consts: AHashMap<String, Value>,
    pub(crate) defaults: AHashMap<SlotKey, Value>,
    pub(crate) position: Position,
    /// Minimum variadic arity per group, held while a graph is being rebuilt.
    pub(crate) reserved: AHashMap<String, usize>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            consts: AHashMap::new(),
            defaults: AHashMap::new(),
            position: Position::default(),
            reserved: AHashMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[PortId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortId] {
        &self.outputs
    }

    pub fn ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }

    pub fn consts(&self) -> &AHashMap<String, Value> {
        &self.consts
    }

    pub fn const_value(&self, name: &str) -> Option<&Value> {
        self.consts.get(name)
    }

    pub fn input_defaults(&self) -> &AHashMap<SlotKey, Value> {
        &self.defaults
    }

    pub fn input_default(&self, slot: &SlotKey) -> Option<&Value> {
        self.defaults.get(slot)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn has_variadic_input(&self) -> bool {
        self.kind
            .define()
            .is_some_and(|define| define.inputs().iter().any(|d| d.is_variadic))
    }
}
