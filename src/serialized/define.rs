use super::SerializableGraph;
use crate::define::{ActionDefine, DefineSignature};
use crate::graph::PortDefine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of a generated define: its signature plus its inner graph.
///
/// Method defines are registered in code and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableDefine {
    pub name: String,
    pub obsolete_names: Vec<String>,
    pub obsolete_message: Option<String>,
    pub inputs: Vec<PortDefine>,
    pub consts: Vec<PortDefine>,
    pub outputs: Vec<PortDefine>,
    pub graph: SerializableGraph,
}

impl SerializableDefine {
    /// Captures a generated define; `None` for a method define.
    pub fn from_define(define: &ActionDefine) -> Option<Self> {
        let graph = define.graph()?;
        let unshare = |defines: &[Arc<PortDefine>]| -> Vec<PortDefine> {
            defines.iter().map(|d| PortDefine::clone(d)).collect()
        };
        Some(Self {
            name: define.name().to_string(),
            obsolete_names: define.obsolete_names().to_vec(),
            obsolete_message: define.obsolete_message().map(str::to_string),
            inputs: unshare(define.inputs()),
            consts: unshare(define.consts()),
            outputs: unshare(define.outputs()),
            graph: SerializableGraph::from_graph(graph),
        })
    }

    pub fn signature(&self) -> DefineSignature {
        let share = |defines: &[PortDefine]| -> Vec<Arc<PortDefine>> {
            defines.iter().cloned().map(Arc::new).collect()
        };
        DefineSignature {
            name: self.name.clone(),
            inputs: share(&self.inputs),
            consts: share(&self.consts),
            outputs: share(&self.outputs),
        }
    }
}
