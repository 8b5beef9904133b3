//! The action graph: nodes, their ports, and the connections between them.
//!
//! Ports live in an arena owned by the graph and are addressed by [`PortId`]. Nodes hold
//! ordered lists of port ids; connections join two port ids. All mutation goes through
//! [`ActionGraph`] so the single-connection and variadic-arity invariants hold after
//! every call.

use crate::convert::{ConvertHook, FlowConvert, StandardConversions};
use crate::define::{ActionDefine, DefineSignature};
use crate::error::GraphError;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use ahash::AHashMap;

mod connection;
mod node;
mod port;
pub(crate) mod shape;

pub use connection::{ConnectionKind, NodeConnection};
pub use node::{Node, NodeId, NodeKind, Position};
pub use port::{
    ENTER, EXIT, Port, PortDefine, PortDirection, PortId, PortRole, RETURN, SlotKey,
};

/// Upper bound on the slots of one variadic group. Slot indices at or past it are
/// rejected.
pub const MAX_VARIADIC_SLOTS: usize = 256;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

fn next_graph_id() -> u32 {
    NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)
}

/// A directed graph of action nodes.
///
/// A graph created for a generated define carries that define's signature; only such a
/// graph may hold the Entry and Return pseudo-nodes.
///
/// Every graph, clones included, has its own identity. Port ids handed out by one graph
/// do not resolve in any other.
pub struct ActionGraph {
    id: u32,
    nodes: BTreeMap<NodeId, Node>,
    ports: AHashMap<PortId, Port>,
    connections: Vec<NodeConnection>,
    next_port: u32,
    signature: Option<Arc<DefineSignature>>,
    converter: Arc<dyn ConvertHook>,
}

impl Default for ActionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ActionGraph {
    fn clone(&self) -> Self {
        let graph = next_graph_id();
        let rekey = |port: PortId| PortId {
            graph,
            index: port.index,
        };
        let nodes = self
            .nodes
            .iter()
            .map(|(id, node)| {
                let mut node = node.clone();
                for port in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
                    *port = rekey(*port);
                }
                (*id, node)
            })
            .collect();
        let ports = self
            .ports
            .values()
            .map(|port| {
                let mut port = port.clone();
                port.id = rekey(port.id);
                (port.id, port)
            })
            .collect();
        let connections = self
            .connections
            .iter()
            .map(|c| NodeConnection {
                kind: c.kind,
                source: rekey(c.source),
                destination: rekey(c.destination),
            })
            .collect();
        Self {
            id: graph,
            nodes,
            ports,
            connections,
            next_port: self.next_port,
            signature: self.signature.clone(),
            converter: Arc::clone(&self.converter),
        }
    }
}

impl fmt::Debug for ActionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionGraph")
            .field("nodes", &self.nodes)
            .field("ports", &self.ports.len())
            .field("connections", &self.connections)
            .field("signature", &self.signature.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl ActionGraph {
    pub fn new() -> Self {
        Self {
            id: next_graph_id(),
            nodes: BTreeMap::new(),
            ports: AHashMap::new(),
            connections: Vec::new(),
            next_port: 0,
            signature: None,
            converter: Arc::new(StandardConversions),
        }
    }

    /// Replaces the conversion hook used to decide type compatibility when connecting.
    pub fn with_converter(mut self, converter: Arc<dyn ConvertHook>) -> Self {
        self.converter = converter;
        self
    }

    /// Creates the inner graph of a generated define, with its Entry and Return nodes
    /// already placed and wired `entry.exit -> return.enter`.
    pub fn with_signature(signature: DefineSignature) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        graph.set_signature(Arc::new(signature))?;
        Ok(graph)
    }

    /// Reshapes the graph to `signature`, creating the Entry and Return nodes if missing.
    pub fn set_signature(&mut self, signature: Arc<DefineSignature>) -> Result<(), GraphError> {
        self.signature = Some(signature);
        let entry = match self.entry_node() {
            Some(id) => {
                shape::define_node(self, id)?;
                None
            }
            None => Some(self.add_node(NodeKind::Entry)?),
        };
        let ret = match self.return_node() {
            Some(id) => {
                shape::define_node(self, id)?;
                None
            }
            None => Some(self.add_node(NodeKind::Return)?),
        };
        if let (Some(entry), Some(ret)) = (entry, ret) {
            self.connect_by_name(entry, EXIT, ret, ENTER)?;
        }
        Ok(())
    }

    /// Sets the signature without placing pseudo-nodes, for graphs being rebuilt from a
    /// snapshot that lists them explicitly.
    pub(crate) fn attach_signature(&mut self, signature: Arc<DefineSignature>) {
        self.signature = Some(signature);
    }

    pub fn signature(&self) -> Option<&Arc<DefineSignature>> {
        self.signature.as_ref()
    }

    pub fn converter(&self) -> &Arc<dyn ConvertHook> {
        &self.converter
    }

    // --- Nodes ---

    /// Adds a node under the smallest unused id.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        let id = self.next_node_id();
        self.add_node_with_id(id, kind)
    }

    pub fn add_action(&mut self, define: Arc<ActionDefine>) -> Result<NodeId, GraphError> {
        self.add_node(NodeKind::Action(define))
    }

    pub fn add_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> Result<NodeId, GraphError> {
        if id.0 == 0 {
            return Err(GraphError::InvalidNodeId);
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        let pseudo = match kind {
            NodeKind::Entry => Some(("Entry", self.entry_node())),
            NodeKind::Return => Some(("Return", self.return_node())),
            NodeKind::Action(_) => None,
        };
        if let Some((kind, existing)) = pseudo {
            if self.signature.is_none() {
                return Err(GraphError::MissingSignature { kind });
            }
            if existing.is_some() {
                return Err(GraphError::PseudoNodeCount { kind, count: 2 });
            }
        }
        self.nodes.insert(id, Node::new(id, kind));
        shape::define_node(self, id)?;
        Ok(id)
    }

    /// Removes a node after disconnecting all of its ports.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        self.disconnect_node(id)?;
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        for port in node.ports() {
            self.ports.remove(&port);
        }
        Ok(node)
    }

    /// The smallest positive id not used by any node.
    pub fn next_node_id(&self) -> NodeId {
        let mut candidate = 1;
        for id in self.nodes.keys() {
            if id.0 == candidate {
                candidate += 1;
            } else if id.0 > candidate {
                break;
            }
        }
        NodeId(candidate)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_node<P>(&self, mut predicate: P) -> Option<&Node>
    where
        P: FnMut(&Node) -> bool,
    {
        self.nodes.values().find(|node| predicate(node))
    }

    pub fn find_nodes<P>(&self, mut predicate: P) -> impl Iterator<Item = &Node>
    where
        P: FnMut(&Node) -> bool,
    {
        self.nodes.values().filter(move |node| predicate(node))
    }

    pub fn entry_node(&self) -> Option<NodeId> {
        self.find_node(|n| matches!(n.kind, NodeKind::Entry)).map(Node::id)
    }

    pub fn return_node(&self) -> Option<NodeId> {
        self.find_node(|n| matches!(n.kind, NodeKind::Return)).map(Node::id)
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    // --- Ports ---

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub(crate) fn port_ref(&self, id: PortId) -> Result<&Port, GraphError> {
        self.ports.get(&id).ok_or(GraphError::PortNotFound(id))
    }

    /// Finds an input port by name and, for a variadic group, slot index.
    pub fn input_port(&self, node: NodeId, name: &str, index: Option<usize>) -> Option<PortId> {
        self.nodes.get(&node)?.inputs.iter().copied().find(|id| {
            self.ports
                .get(id)
                .is_some_and(|p| p.name() == name && p.param_index == index)
        })
    }

    pub fn output_port(&self, node: NodeId, name: &str) -> Option<PortId> {
        self.nodes
            .get(&node)?
            .outputs
            .iter()
            .copied()
            .find(|id| self.ports.get(id).is_some_and(|p| p.name() == name))
    }

    /// The `enter` control input of a node.
    pub fn control_input(&self, node: NodeId) -> Option<PortId> {
        self.input_port(node, ENTER, None)
    }

    /// The slots of a variadic group in index order.
    pub fn variadic_slots(&self, node: NodeId, group: &str) -> Vec<PortId> {
        let Some(node) = self.nodes.get(&node) else {
            return Vec::new();
        };
        node.inputs
            .iter()
            .copied()
            .filter(|id| {
                self.ports
                    .get(id)
                    .is_some_and(|p| p.name() == group && p.param_index.is_some())
            })
            .collect()
    }

    pub(crate) fn allocate_port_id(&mut self) -> PortId {
        let id = PortId {
            graph: self.id,
            index: self.next_port,
        };
        self.next_port += 1;
        id
    }

    // --- Connections ---

    pub fn connections(&self) -> &[NodeConnection] {
        &self.connections
    }

    pub fn connections_of(&self, port: PortId) -> impl Iterator<Item = &NodeConnection> {
        self.connections.iter().filter(move |c| c.touches(port))
    }

    pub fn is_connected(&self, port: PortId) -> bool {
        self.connections.iter().any(|c| c.touches(port))
    }

    /// The port connected to a value input, if any.
    pub fn value_source(&self, value_input: PortId) -> Option<PortId> {
        self.connections
            .iter()
            .find(|c| c.destination == value_input)
            .map(|c| c.source)
    }

    /// The control input a control output leads to, if any.
    pub fn next_control(&self, control_output: PortId) -> Option<PortId> {
        self.connections
            .iter()
            .find(|c| c.source == control_output)
            .map(|c| c.destination)
    }

    /// Whether `a` and `b` may be connected, in either order.
    pub fn can_connect(&self, a: PortId, b: PortId) -> bool {
        self.check_connection(a, b).is_ok()
    }

    /// Orients a candidate connection as `(source, destination, kind)`, or explains why
    /// the two ports cannot be joined.
    fn check_connection(
        &self,
        a: PortId,
        b: PortId,
    ) -> Result<(PortId, PortId, ConnectionKind), GraphError> {
        let first = self.port_ref(a)?;
        let second = self.port_ref(b)?;
        let reject = |reason: &str| GraphError::IncompatiblePorts {
            source_port: first.describe(),
            destination: second.describe(),
            reason: reason.to_string(),
        };

        if first.node == second.node {
            return Err(reject("ports belong to the same node"));
        }
        let (source, destination, kind) = match (first.role(), second.role()) {
            (PortRole::ValueOutput, PortRole::ValueInput) => (first, second, ConnectionKind::Value),
            (PortRole::ValueInput, PortRole::ValueOutput) => (second, first, ConnectionKind::Value),
            (PortRole::ControlOutput, PortRole::ControlInput) => {
                (first, second, ConnectionKind::Control)
            }
            (PortRole::ControlInput, PortRole::ControlOutput) => {
                (second, first, ConnectionKind::Control)
            }
            (x, y) => {
                return Err(reject(&format!(
                    "a {} cannot connect to a {}",
                    x.name(),
                    y.name()
                )));
            }
        };
        if kind == ConnectionKind::Value
            && !FlowConvert::is_convertible(
                source.value_type(),
                destination.value_type(),
                self.converter.as_ref(),
            )
        {
            return Err(reject(&format!(
                "type {} does not convert to {}",
                source.value_type(),
                destination.value_type()
            )));
        }
        Ok((source.id, destination.id, kind))
    }

    /// Connects two ports, given in either order.
    ///
    /// A value input keeps at most one incoming connection and a control output at most
    /// one outgoing connection; an existing one is replaced. Connecting an already
    /// connected pair does nothing.
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<(), GraphError> {
        let (source, destination, kind) = self.check_connection(a, b)?;
        if self
            .connections
            .iter()
            .any(|c| c.source == source && c.destination == destination)
        {
            return Ok(());
        }

        let mut affected = match kind {
            ConnectionKind::Value => self.sever(|c| c.destination == destination),
            ConnectionKind::Control => self.sever(|c| c.source == source),
        };
        self.connections.push(NodeConnection {
            kind,
            source,
            destination,
        });
        if kind == ConnectionKind::Value {
            affected.push(self.port_ref(destination)?.node);
        }
        self.refresh(affected)
    }

    /// Connects `source_node.source_port` to `dest_node.dest_port` by port name.
    pub fn connect_by_name(
        &mut self,
        source_node: NodeId,
        source_port: &str,
        dest_node: NodeId,
        dest_port: &str,
    ) -> Result<(), GraphError> {
        let source = self
            .output_port(source_node, source_port)
            .ok_or_else(|| unknown_port(source_node, source_port, None))?;
        let destination = self
            .input_port(dest_node, dest_port, None)
            .ok_or_else(|| unknown_port(dest_node, dest_port, None))?;
        self.connect(source, destination)
    }

    /// Removes the connection between two ports, given in either order. Returns whether
    /// a connection existed.
    pub fn disconnect(&mut self, a: PortId, b: PortId) -> Result<bool, GraphError> {
        self.port_ref(a)?;
        self.port_ref(b)?;
        let before = self.connections.len();
        let affected = self.sever(|c| {
            (c.source == a && c.destination == b) || (c.source == b && c.destination == a)
        });
        let removed = self.connections.len() != before;
        self.refresh(affected)?;
        Ok(removed)
    }

    /// Removes every connection touching `port`. Returns how many were removed.
    pub fn disconnect_port(&mut self, port: PortId) -> Result<usize, GraphError> {
        self.port_ref(port)?;
        let before = self.connections.len();
        let affected = self.sever(|c| c.touches(port));
        let removed = before - self.connections.len();
        self.refresh(affected)?;
        Ok(removed)
    }

    /// Removes every connection touching any port of `node`.
    pub fn disconnect_node(&mut self, node: NodeId) -> Result<usize, GraphError> {
        let ports: Vec<PortId> = self.node_ref(node)?.ports().collect();
        let before = self.connections.len();
        let affected = self.sever(|c| ports.iter().any(|p| c.touches(*p)));
        let removed = before - self.connections.len();
        self.refresh(affected.into_iter().filter(|id| *id != node).collect())?;
        Ok(removed)
    }

    /// Drops matching connections and returns the destination nodes whose variadic arity
    /// may have changed.
    pub(crate) fn sever<P>(&mut self, mut predicate: P) -> Vec<NodeId>
    where
        P: FnMut(&NodeConnection) -> bool,
    {
        let mut affected = Vec::new();
        let ports = &self.ports;
        let nodes = &self.nodes;
        self.connections.retain(|c| {
            if !predicate(c) {
                return true;
            }
            if c.kind == ConnectionKind::Value {
                if let Some(port) = ports.get(&c.destination) {
                    if nodes.get(&port.node).is_some_and(Node::has_variadic_input) {
                        affected.push(port.node);
                    }
                }
            }
            false
        });
        affected
    }

    fn refresh(&mut self, mut nodes: Vec<NodeId>) -> Result<(), GraphError> {
        nodes.sort_unstable();
        nodes.dedup();
        for id in nodes {
            if self.nodes.get(&id).is_some_and(Node::has_variadic_input) {
                shape::define_node(self, id)?;
            }
        }
        Ok(())
    }

    // --- Editing ---

    /// Stores a const value on an action node.
    pub fn set_const(&mut self, node: NodeId, name: &str, value: Value) -> Result<(), GraphError> {
        let target = self.node_mut(node)?;
        let declared = target
            .kind
            .define()
            .is_some_and(|d| d.signature().const_define(name).is_some());
        if !declared {
            return Err(unknown_port(node, name, None));
        }
        target.consts.insert(name.to_string(), value);
        Ok(())
    }

    /// Sets the value an input slot takes while it is unconnected.
    pub fn set_input_default(
        &mut self,
        node: NodeId,
        slot: SlotKey,
        value: Value,
    ) -> Result<(), GraphError> {
        let variadic = self.check_input_slot(node, &slot)?;
        self.node_mut(node)?.defaults.insert(slot, value);
        if variadic {
            shape::define_node(self, node)?;
        }
        Ok(())
    }

    pub fn clear_input_default(
        &mut self,
        node: NodeId,
        slot: &SlotKey,
    ) -> Result<Option<Value>, GraphError> {
        let variadic = self.check_input_slot(node, slot)?;
        let removed = self.node_mut(node)?.defaults.remove(slot);
        if variadic {
            shape::define_node(self, node)?;
        }
        Ok(removed)
    }

    /// Validates that `slot` names a value input of `node` within the slot limit; returns
    /// whether it belongs to a variadic group.
    fn check_input_slot(&self, node: NodeId, slot: &SlotKey) -> Result<bool, GraphError> {
        let target = self.node_ref(node)?;
        let define = match &target.kind {
            NodeKind::Action(define) => define.signature().input_define(&slot.name),
            NodeKind::Return => self
                .signature
                .as_ref()
                .and_then(|s| s.outputs.iter().find(|d| d.name == slot.name)),
            NodeKind::Entry => None,
        };
        match define {
            Some(define) if define.is_variadic != slot.index.is_some() => {
                Err(unknown_port(node, &slot.name, slot.index))
            }
            Some(_) => match slot.index {
                Some(index) if index >= MAX_VARIADIC_SLOTS => Err(GraphError::SlotOutOfRange {
                    node_id: node,
                    port: slot.name.clone(),
                    index,
                    limit: MAX_VARIADIC_SLOTS,
                }),
                index => Ok(index.is_some()),
            },
            None => Err(unknown_port(node, &slot.name, slot.index)),
        }
    }

    pub fn set_position(&mut self, node: NodeId, position: Position) -> Result<(), GraphError> {
        self.node_mut(node)?.position = position;
        Ok(())
    }

    /// Points every node of `define`'s kind at `define` and recomputes their shapes.
    /// Ports whose define is unchanged keep their connections; consts and input defaults
    /// the new define no longer declares are dropped. Returns how many nodes were
    /// updated.
    pub fn redefine(&mut self, define: Arc<ActionDefine>) -> Result<usize, GraphError> {
        let targets: Vec<NodeId> = self
            .find_nodes(|n| n.kind.define().is_some_and(|d| d.name() == define.name()))
            .map(Node::id)
            .collect();
        let signature = define.signature();
        for id in &targets {
            let node = self.node_mut(*id)?;
            node.kind = NodeKind::Action(Arc::clone(&define));
            node.consts.retain(|name, _| signature.const_define(name).is_some());
            node.defaults.retain(|slot, _| {
                signature
                    .input_define(&slot.name)
                    .is_some_and(|d| d.is_variadic == slot.index.is_some())
            });
            shape::define_node(self, *id)?;
        }
        Ok(targets.len())
    }

    /// Keeps variadic slot `index` of `group` materialized until reservations are
    /// cleared, so connections can be restored onto it.
    pub(crate) fn reserve_variadic(
        &mut self,
        node: NodeId,
        group: &str,
        index: usize,
    ) -> Result<(), GraphError> {
        self.check_input_slot(node, &SlotKey::variadic(group, index))?;
        let target = self.node_mut(node)?;
        let slot = target.reserved.entry(group.to_string()).or_insert(index);
        *slot = (*slot).max(index);
        shape::define_node(self, node)
    }

    pub(crate) fn clear_reservations(&mut self) -> Result<(), GraphError> {
        let reserved: Vec<NodeId> = self
            .nodes
            .values_mut()
            .filter(|n| !n.reserved.is_empty())
            .map(|n| {
                n.reserved.clear();
                n.id
            })
            .collect();
        for id in reserved {
            shape::define_node(self, id)?;
        }
        Ok(())
    }
}

fn unknown_port(node_id: NodeId, port: &str, param_index: Option<usize>) -> GraphError {
    GraphError::UnknownPort {
        node_id,
        port: port.to_string(),
        param_index,
    }
}
