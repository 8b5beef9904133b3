use serde::{Deserialize, Serialize};

/// Interpreter limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowOptions {
    /// How deeply generated defines may nest child flows.
    pub max_call_depth: usize,
    /// Emit an `error!` line when a node body fails.
    pub log_node_errors: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 32,
            log_node_errors: true,
        }
    }
}
