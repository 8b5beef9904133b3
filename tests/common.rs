//! Common test utilities for building graphs and running flows.
use actiongraph::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A catalog with the standard defines registered.
#[allow(dead_code)]
pub fn builtins() -> DefineCatalog {
    DefineCatalog::with_builtins().expect("builtins should register")
}

/// Looks up a define that must exist.
#[allow(dead_code)]
pub fn define(catalog: &DefineCatalog, name: &str) -> Arc<ActionDefine> {
    catalog
        .get(name)
        .unwrap_or_else(|| panic!("define '{}' should be registered", name))
}

/// Counts how many times the bodies built from it have run.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RunCounter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl RunCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// A define returning `value` that bumps the counter every time it runs.
    pub fn source(&self, name: &str, value: i64) -> Arc<ActionDefine> {
        let counter = Arc::clone(&self.0);
        Arc::new(
            ActionDefine::method(name)
                .returns(ValueType::Int)
                .body(move |call| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    call.set_return(value);
                    Ok(())
                })
                .build()
                .expect("source define should build"),
        )
    }
}

/// Adds an `Integer` node holding `value`.
#[allow(dead_code)]
pub fn add_integer(graph: &mut ActionGraph, catalog: &DefineCatalog, value: i64) -> NodeId {
    let node = graph
        .add_action(define(catalog, "Integer"))
        .expect("node should be added");
    graph
        .set_const(node, "value", Value::Int(value))
        .expect("const should be set");
    node
}

/// Connects `source.output` to `dest.input[index]`.
#[allow(dead_code)]
pub fn wire(
    graph: &mut ActionGraph,
    source: NodeId,
    output: &str,
    dest: NodeId,
    input: &str,
    index: Option<usize>,
) {
    let from = graph
        .output_port(source, output)
        .unwrap_or_else(|| panic!("node {} has no output '{}'", source, output));
    let to = graph
        .input_port(dest, input, index)
        .unwrap_or_else(|| panic!("node {} has no input '{}' {:?}", dest, input, index));
    graph.connect(from, to).expect("ports should connect");
}

/// Runs `node` in a fresh flow and returns the flow for inspection.
#[allow(dead_code)]
pub fn run_node(graph: Arc<ActionGraph>, node: NodeId) -> std::result::Result<Flow, FlowError> {
    run_node_with(graph, node, FlowEnv::new())
}

#[allow(dead_code)]
pub fn run_node_with(
    graph: Arc<ActionGraph>,
    node: NodeId,
    env: FlowEnv,
) -> std::result::Result<Flow, FlowError> {
    let mut flow = Flow::builder(graph).with_env(env).build();
    tokio_test::block_on(flow.run_node(node))?;
    Ok(flow)
}

/// Reads an output value that the run has already produced.
#[allow(dead_code)]
pub fn output(flow: &Flow, node: NodeId, name: &str) -> Option<Value> {
    let port = flow.graph().output_port(node, name)?;
    flow.cached_value(port).cloned()
}

/// An echo define: a generated define whose Return input is wired straight to its Entry
/// output of the same name.
#[allow(dead_code)]
pub fn echo_define(name: &str, value_type: ValueType) -> ActionDefine {
    let signature = DefineSignature::new(name)
        .input("text", value_type.clone())
        .output("text", value_type);
    let mut graph = ActionGraph::with_signature(signature.clone()).expect("graph should build");
    let entry = graph.entry_node().expect("entry should exist");
    let ret = graph.return_node().expect("return should exist");
    wire(&mut graph, entry, "text", ret, "text", None);
    ActionDefine::generated(signature, graph).expect("generated define should build")
}
