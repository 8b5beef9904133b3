//! Generated defines: node kinds whose behaviour is an inner action graph.

use super::{ActionDefine, DefineBody, DefineSignature};
use crate::error::{DefineError, GraphError};
use crate::graph::{ActionGraph, NodeKind};
use std::sync::Arc;

/// The inner graph of a generated define.
///
/// The graph carries exactly one Entry node, whose outputs mirror the define's inputs and
/// consts, and one Return node, whose inputs mirror the define's outputs.
#[derive(Debug, Clone)]
pub struct GeneratedDefine {
    graph: Arc<ActionGraph>,
}

impl GeneratedDefine {
    pub fn graph(&self) -> &Arc<ActionGraph> {
        &self.graph
    }
}

impl ActionDefine {
    /// Creates a generated define from an inner graph.
    ///
    /// The graph's Entry and Return nodes are reshaped to `signature`; a graph without
    /// them gets a fresh pair, wired `entry.exit -> return.enter`.
    pub fn generated(
        signature: DefineSignature,
        mut graph: ActionGraph,
    ) -> Result<ActionDefine, DefineError> {
        let name = signature.name.clone();
        let invalid = |source: GraphError| DefineError::InvalidGraph {
            define: name.clone(),
            source,
        };

        if let Some(port) = signature.outputs.iter().find(|d| d.is_control) {
            return Err(DefineError::ControlOutputInGenerated {
                define: signature.name.clone(),
                port: port.name.clone(),
            });
        }
        let mut seen = ahash::AHashSet::new();
        for define in signature.inputs.iter().chain(&signature.consts) {
            if !seen.insert(define.name.as_str()) {
                return Err(DefineError::DuplicateParameter {
                    define: signature.name.clone(),
                    param: define.name.clone(),
                });
            }
        }

        let signature = Arc::new(signature);
        graph.set_signature(Arc::clone(&signature)).map_err(invalid)?;
        for (kind, count) in [
            ("Entry", graph.find_nodes(|n| matches!(n.kind(), NodeKind::Entry)).count()),
            ("Return", graph.find_nodes(|n| matches!(n.kind(), NodeKind::Return)).count()),
        ] {
            if count != 1 {
                return Err(invalid(GraphError::PseudoNodeCount { kind, count }));
            }
        }

        let mut define = ActionDefine::new(
            DefineSignature::clone(&signature),
            DefineBody::Generated(GeneratedDefine {
                graph: Arc::new(graph),
            }),
        );
        define.signature = signature;
        Ok(define)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortDefine;
    use crate::value::ValueType;

    #[test]
    fn control_outputs_are_rejected() {
        let mut signature = DefineSignature::new("Bad");
        signature.outputs.push(Arc::new(PortDefine::control("done")));
        let err = ActionDefine::generated(signature, ActionGraph::new()).unwrap_err();
        assert!(matches!(err, DefineError::ControlOutputInGenerated { .. }));
    }

    #[test]
    fn empty_graph_gets_entry_and_return() {
        let signature = DefineSignature::new("Echo")
            .input("text", ValueType::String)
            .output("text", ValueType::String);
        let define = ActionDefine::generated(signature, ActionGraph::new()).unwrap();
        let graph = define.graph().unwrap();
        assert!(graph.entry_node().is_some());
        assert!(graph.return_node().is_some());
    }
}
