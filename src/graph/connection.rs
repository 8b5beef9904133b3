use super::PortId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectionKind {
    Control,
    Value,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Control => write!(f, "control"),
            ConnectionKind::Value => write!(f, "value"),
        }
    }
}

/// A directed edge from an output-side port to an input-side port.
///
/// Connections are immutable; two connections are the same edge when they join the
/// same source and destination.
#[derive(Debug, Clone, Copy, Eq)]
pub struct NodeConnection {
    pub(crate) kind: ConnectionKind,
    pub(crate) source: PortId,
    pub(crate) destination: PortId,
}

impl NodeConnection {
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn source(&self) -> PortId {
        self.source
    }

    pub fn destination(&self) -> PortId {
        self.destination
    }

    pub fn touches(&self, port: PortId) -> bool {
        self.source == port || self.destination == port
    }

    /// The endpoint opposite `port`, if `port` is one of its ends.
    pub fn other(&self, port: PortId) -> Option<PortId> {
        if self.source == port {
            Some(self.destination)
        } else if self.destination == port {
            Some(self.source)
        } else {
            None
        }
    }
}

impl PartialEq for NodeConnection {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.destination == other.destination
    }
}

impl Hash for NodeConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.destination.hash(state);
    }
}
