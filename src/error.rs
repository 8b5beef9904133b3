use crate::graph::{NodeId, PortId};
use thiserror::Error;

/// Structural errors raised by graph mutation and reconstruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),

    #[error("Port {0} not found in graph")]
    PortNotFound(PortId),

    #[error("Node id {0} is already in use")]
    DuplicateNodeId(NodeId),

    #[error("Node id must be a positive integer")]
    InvalidNodeId,

    #[error("Cannot connect {source_port} to {destination}: {reason}")]
    IncompatiblePorts {
        source_port: String,
        destination: String,
        reason: String,
    },

    #[error("Node '{node_id}' has an unregistered define: '{name}'")]
    UnknownDefine { node_id: NodeId, name: String },

    #[error("Node {node_id} has no port '{port}'{}", slot_suffix(.param_index))]
    UnknownPort {
        node_id: NodeId,
        port: String,
        param_index: Option<usize>,
    },

    #[error("Node {node_id}: slot {index} of '{port}' is past the limit of {limit} slots")]
    SlotOutOfRange {
        node_id: NodeId,
        port: String,
        index: usize,
        limit: usize,
    },

    #[error(
        "Connection {source_node}.{source_port} -> {dest_node}.{dest_port} is recorded as \
         {recorded} but joins {actual} ports"
    )]
    ConnectionKindMismatch {
        source_node: NodeId,
        source_port: String,
        dest_node: NodeId,
        dest_port: String,
        recorded: String,
        actual: String,
    },

    #[error("Graph must contain exactly one {kind} node, found {count}")]
    PseudoNodeCount { kind: &'static str, count: usize },

    #[error("{kind} nodes can only be placed in a graph owned by a generated define")]
    MissingSignature { kind: &'static str },

    #[error("Codec error: {0}")]
    Codec(String),
}

fn slot_suffix(param_index: &Option<usize>) -> String {
    param_index.map(|i| format!(" at slot {}", i)).unwrap_or_default()
}

/// Errors raised while declaring a node kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefineError {
    #[error("Define '{define}' declares parameter '{param}' more than once")]
    DuplicateParameter { define: String, param: String },

    #[error("Define '{define}': variadic parameter '{param}' must be the last parameter")]
    VariadicNotLast { define: String, param: String },

    #[error("Define '{define}' has no body")]
    MissingBody { define: String },

    #[error("Generated define '{define}' cannot declare control output '{port}'")]
    ControlOutputInGenerated { define: String, port: String },

    #[error("Generated define '{define}' has an invalid graph: {source}")]
    InvalidGraph {
        define: String,
        #[source]
        source: GraphError,
    },
}

/// Errors a node body may return.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    #[error("Argument '{name}' expected {expected}, but found {found}")]
    InvalidArgument {
        name: String,
        expected: String,
        found: String,
    },

    #[error("{0}")]
    Failed(String),

    /// An interpreter error raised while the body drove the flow itself.
    #[error(transparent)]
    Flow(Box<FlowError>),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<FlowError> for ActionError {
    fn from(err: FlowError) -> Self {
        ActionError::Flow(Box::new(err))
    }
}

/// Errors that abort a flow execution.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Port {port} is a {actual}, expected a {expected}")]
    WrongPortRole {
        port: PortId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Node {node_id} ('{define}') did not populate its output '{port}'")]
    UnpopulatedOutput {
        node_id: NodeId,
        define: String,
        port: String,
    },

    #[error("Node {node_id} ('{define}') failed: {source}")]
    Action {
        node_id: NodeId,
        define: String,
        #[source]
        source: ActionError,
    },

    #[error("Node {node_id} depends on its own output")]
    ValueCycle { node_id: NodeId },

    #[error("Generated define '{define}' exceeded the maximum call depth of {limit}")]
    CallDepthExceeded { define: String, limit: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl FlowError {
    /// The node this error is attributed to, if any.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            FlowError::UnpopulatedOutput { node_id, .. }
            | FlowError::Action { node_id, .. }
            | FlowError::ValueCycle { node_id } => Some(*node_id),
            _ => None,
        }
    }
}
