//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the actiongraph crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use actiongraph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let catalog = DefineCatalog::with_builtins()?;
//! let json = std::fs::read_to_string("path/to/graph.json")?;
//! let graph = SerializableGraph::from_json(&json)?.build(&catalog, None)?;
//! println!("Loaded {} nodes", graph.node_count());
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::graph::{
    ActionGraph, ConnectionKind, ENTER, EXIT, MAX_VARIADIC_SLOTS, Node, NodeId, NodeKind,
    PortDefine, PortId, Position, RETURN, SlotKey,
};

// Node kinds
pub use crate::define::{
    ActionDefine, Ambient, DefineCatalog, DefineSignature, MethodBody, MethodCall,
};

// Interpreter
pub use crate::convert::{ConvertHook, FlowConvert, StandardConversions};
pub use crate::flow::{Flow, FlowEnv, FlowOptions};
pub use crate::value::{Value, ValueType};

// Persistence
pub use crate::serialized::{SerializableDefine, SerializableGraph};

// Error types
pub use crate::error::{ActionError, DefineError, FlowError, GraphError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
