//! # actiongraph - Action Graph Interpreter for Card Effects
//!
//! **actiongraph** executes visual-scripting graphs that encode card effects. Designers
//! assemble *action graphs* out of nodes, typed ports and connections; at runtime a
//! [`Flow`](flow::Flow) interprets the graph under the ambient context of a game, a card,
//! a buff and a triggering event.
//!
//! ## Core Workflow
//!
//! 1.  **Declare node kinds**: register method defines with
//!     [`ActionDefine::method`](define::ActionDefine::method), or build generated defines
//!     whose behaviour is an inner graph. A [`DefineCatalog`](define::DefineCatalog) keeps
//!     them by name.
//! 2.  **Build a graph**: add nodes to an [`ActionGraph`](graph::ActionGraph) and connect
//!     their ports. Variadic input groups grow and shrink with their connections.
//! 3.  **Run**: wrap the graph in an `Arc`, build a `Flow` and run it from a control
//!     input. Control is pushed from node to node; values are pulled on demand and
//!     memoized, so each node runs at most once per scope.
//! 4.  **Persist**: snapshot the graph with
//!     [`SerializableGraph`](serialized::SerializableGraph) (JSON or bincode) and rebuild it
//!     later against the catalog.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actiongraph::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let catalog = DefineCatalog::with_builtins()?;
//!     let integer = catalog.get("Integer").ok_or("missing Integer")?;
//!     let operation = catalog.get("IntegerOperation").ok_or("missing IntegerOperation")?;
//!
//!     // A constant 5, added to itself.
//!     let mut graph = ActionGraph::new();
//!     let five = graph.add_action(integer)?;
//!     graph.set_const(five, "value", Value::Int(5))?;
//!     let sum = graph.add_action(operation)?;
//!     graph.set_const(sum, "operator", Value::from("add"))?;
//!
//!     let result = graph.output_port(five, RETURN).ok_or("no return port")?;
//!     for slot in 0..2 {
//!         let input = graph.input_port(sum, "values", Some(slot)).ok_or("no slot")?;
//!         graph.connect(result, input)?;
//!     }
//!
//!     let graph = Arc::new(graph);
//!     let mut flow = Flow::new(Arc::clone(&graph));
//!     let total = graph.output_port(sum, RETURN).ok_or("no return port")?;
//!     tokio_test::block_on(async {
//!         flow.run_node(sum).await?;
//!         println!("5 + 5 = {}", flow.get_value(total).await?);
//!         Ok::<_, FlowError>(())
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod convert;
pub mod define;
pub mod error;
pub mod flow;
pub mod graph;
pub mod library;
pub mod prelude;
pub mod serialized;
pub mod value;
