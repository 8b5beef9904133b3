use crate::define::{DefineCatalog, DefineSignature};
use crate::error::GraphError;
use crate::graph::{ActionGraph, ConnectionKind, NodeId, NodeKind, Position, SlotKey};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Snapshot of an [`ActionGraph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<SerializableNode>,
    pub connections: Vec<SerializableConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableNode {
    pub id: u32,
    pub position: Position,
    pub kind: SerializableNodeKind,
    pub consts: BTreeMap<String, Value>,
    /// Keyed by slot, rendered as `name` or `name[index]`.
    pub input_default_values: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerializableNodeKind {
    Action { define: String },
    Entry,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SerializableConnection {
    pub source_node_id: u32,
    pub source_port_name: String,
    pub dest_node_id: u32,
    pub dest_port_name: String,
    /// 0 for a singular port, otherwise the 1-based slot of a variadic group.
    pub dest_param_index: u32,
    pub kind: ConnectionKind,
}

impl SerializableGraph {
    /// Captures a graph. Nodes are listed by id and connections in sorted order, so equal
    /// graphs produce equal snapshots.
    pub fn from_graph(graph: &ActionGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| SerializableNode {
                id: node.id().0,
                position: node.position(),
                kind: match node.kind() {
                    NodeKind::Action(define) => SerializableNodeKind::Action {
                        define: define.name().to_string(),
                    },
                    NodeKind::Entry => SerializableNodeKind::Entry,
                    NodeKind::Return => SerializableNodeKind::Return,
                },
                consts: node
                    .consts()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                input_default_values: node
                    .input_defaults()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            })
            .collect();

        let mut connections: Vec<SerializableConnection> = graph
            .connections()
            .iter()
            .filter_map(|connection| {
                let source = graph.port(connection.source())?;
                let destination = graph.port(connection.destination())?;
                Some(SerializableConnection {
                    source_node_id: source.node().0,
                    source_port_name: source.name().to_string(),
                    dest_node_id: destination.node().0,
                    dest_port_name: destination.name().to_string(),
                    dest_param_index: destination
                        .param_index()
                        .map_or(0, |i| i as u32 + 1),
                    kind: connection.kind(),
                })
            })
            .collect();
        connections.sort();

        Self { nodes, connections }
    }

    /// Rebuilds the graph against `catalog`.
    ///
    /// Nodes are placed and shaped first, then connections are restored by
    /// `(node id, port name, slot)`. `signature` is required when the snapshot holds
    /// Entry and Return nodes.
    pub fn build(
        &self,
        catalog: &DefineCatalog,
        signature: Option<Arc<DefineSignature>>,
    ) -> Result<ActionGraph, GraphError> {
        let mut graph = ActionGraph::new();
        if let Some(signature) = signature {
            graph.attach_signature(signature);
        }

        for node in &self.nodes {
            let id = NodeId(node.id);
            let kind = match &node.kind {
                SerializableNodeKind::Action { define } => NodeKind::Action(
                    catalog.get(define).ok_or_else(|| GraphError::UnknownDefine {
                        node_id: id,
                        name: define.clone(),
                    })?,
                ),
                SerializableNodeKind::Entry => NodeKind::Entry,
                SerializableNodeKind::Return => NodeKind::Return,
            };
            graph.add_node_with_id(id, kind)?;
            graph.set_position(id, node.position)?;
            for (name, value) in &node.consts {
                graph.set_const(id, name, value.clone())?;
            }
            for (slot, value) in &node.input_default_values {
                let slot: SlotKey = slot.parse().map_err(GraphError::Codec)?;
                graph.set_input_default(id, slot, value.clone())?;
            }
        }

        // Variadic slots only exist while populated, so hold them open until their
        // connections are back.
        for connection in &self.connections {
            if let Some(index) = connection.dest_param_index.checked_sub(1) {
                graph.reserve_variadic(
                    NodeId(connection.dest_node_id),
                    &connection.dest_port_name,
                    index as usize,
                )?;
            }
        }

        for connection in &self.connections {
            restore_connection(&mut graph, connection)?;
        }
        graph.clear_reservations()?;
        Ok(graph)
    }
}

fn restore_connection(
    graph: &mut ActionGraph,
    connection: &SerializableConnection,
) -> Result<(), GraphError> {
    let source_node = NodeId(connection.source_node_id);
    let dest_node = NodeId(connection.dest_node_id);
    let index = connection
        .dest_param_index
        .checked_sub(1)
        .map(|i| i as usize);

    let source = graph
        .output_port(source_node, &connection.source_port_name)
        .ok_or_else(|| GraphError::UnknownPort {
            node_id: source_node,
            port: connection.source_port_name.clone(),
            param_index: None,
        })?;
    let destination = graph
        .input_port(dest_node, &connection.dest_port_name, index)
        .ok_or_else(|| GraphError::UnknownPort {
            node_id: dest_node,
            port: connection.dest_port_name.clone(),
            param_index: index,
        })?;

    let actual = if graph.port_ref(source)?.is_control() {
        ConnectionKind::Control
    } else {
        ConnectionKind::Value
    };
    if actual != connection.kind {
        return Err(GraphError::ConnectionKindMismatch {
            source_node,
            source_port: connection.source_port_name.clone(),
            dest_node,
            dest_port: connection.dest_port_name.clone(),
            recorded: connection.kind.to_string(),
            actual: actual.to_string(),
        });
    }
    graph.connect(source, destination)
}
