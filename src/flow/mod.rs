//! The interpreter.
//!
//! A [`Flow`] executes an [`ActionGraph`] under two disciplines. Control is pushed: the
//! flow runs a node, follows the control output it returns to the next node, and repeats
//! until a control output leads nowhere. Values are pulled: reading an output port that
//! has not been produced yet runs the node that owns it, and the result is memoized in
//! the current scope, so a node read many times in one scope runs once.
//!
//! A flow is driven by one caller at a time and holds the graph behind an `Arc`, so the
//! graph cannot be edited while a flow over it exists.

use crate::convert::{ConvertHook, FlowConvert};
use crate::define::method::CallOutcome;
use crate::define::{
    ActionDefine, DefineBody, GeneratedDefine, MethodCall, MethodDefine, MethodParam,
};
use crate::error::{ActionError, FlowError, GraphError};
use crate::graph::{ActionGraph, EXIT, Node, NodeId, NodeKind, Port, PortId, PortRole};
use crate::value::Value;
use ahash::AHashMap;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, error, instrument};

mod env;
mod options;
mod scope;

pub use env::FlowEnv;
pub use options::FlowOptions;
pub use scope::FlowScope;

/// Builds a [`Flow`] over a graph.
pub struct FlowBuilder {
    graph: Arc<ActionGraph>,
    env: FlowEnv,
    options: FlowOptions,
    converter: Option<Arc<dyn ConvertHook>>,
}

impl FlowBuilder {
    pub fn new(graph: Arc<ActionGraph>) -> Self {
        Self {
            graph,
            env: FlowEnv::default(),
            options: FlowOptions::default(),
            converter: None,
        }
    }

    pub fn with_env(mut self, env: FlowEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the conversion hook; defaults to the graph's own.
    pub fn with_converter(mut self, converter: Arc<dyn ConvertHook>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn build(self) -> Flow {
        let converter = self
            .converter
            .unwrap_or_else(|| Arc::clone(self.graph.converter()));
        Flow {
            graph: self.graph,
            env: Arc::new(self.env),
            options: Arc::new(self.options),
            converter,
            scopes: vec![FlowScope::default()],
            call_stack: Vec::new(),
            callers: Vec::new(),
            depth: 0,
        }
    }
}

/// One interpreter activation over a graph.
pub struct Flow {
    graph: Arc<ActionGraph>,
    env: Arc<FlowEnv>,
    options: Arc<FlowOptions>,
    converter: Arc<dyn ConvertHook>,
    scopes: Vec<FlowScope>,
    call_stack: Vec<NodeId>,
    /// Generated-define nodes in the enclosing flows that led here, outermost first.
    callers: Vec<NodeId>,
    depth: usize,
}

impl Flow {
    pub fn builder(graph: Arc<ActionGraph>) -> FlowBuilder {
        FlowBuilder::new(graph)
    }

    /// A flow with an empty environment and default options.
    pub fn new(graph: Arc<ActionGraph>) -> Self {
        FlowBuilder::new(graph).build()
    }

    /// A flow over a generated define's inner graph, run on behalf of `caller` and
    /// sharing this flow's environment.
    fn child(&self, graph: Arc<ActionGraph>, caller: NodeId) -> Flow {
        let mut callers = self.callers.clone();
        callers.push(caller);
        Flow {
            graph,
            env: Arc::clone(&self.env),
            options: Arc::clone(&self.options),
            converter: Arc::clone(&self.converter),
            scopes: vec![FlowScope::default()],
            call_stack: Vec::new(),
            callers,
            depth: self.depth + 1,
        }
    }

    pub fn graph(&self) -> &Arc<ActionGraph> {
        &self.graph
    }

    pub fn env(&self) -> &FlowEnv {
        &self.env
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    /// Nesting depth: 0 for a top-level flow, +1 per generated define.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Nodes currently being run, outermost first.
    pub fn call_stack(&self) -> &[NodeId] {
        &self.call_stack
    }

    /// For a flow running a generated define's inner graph: the generated-define nodes
    /// of the enclosing flows, outermost first. Empty for a top-level flow.
    pub fn callers(&self) -> &[NodeId] {
        &self.callers
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.call_stack.last().copied()
    }

    // --- Scopes ---

    /// The value memoized for `port`, searching from the innermost scope outwards.
    pub fn cached_value(&self, port: PortId) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(port))
    }

    /// Writes into the innermost scope only.
    pub fn set_value(&mut self, port: PortId, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.set(port, value);
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(FlowScope::default());
    }

    /// Discards the innermost scope. The base scope is never popped.
    pub fn exit_scope(&mut self) -> Option<FlowScope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    // --- Control ---

    /// Runs from a control input until control leads nowhere.
    #[instrument(
        name = "flow_run",
        skip(self),
        fields(depth = self.depth)
    )]
    pub async fn run(&mut self, control_input: PortId) -> Result<(), FlowError> {
        let role = self.graph.port_ref(control_input)?.role();
        if role != PortRole::ControlInput {
            return Err(FlowError::WrongPortRole {
                port: control_input,
                expected: PortRole::ControlInput.name(),
                actual: role.name(),
            });
        }
        self.drive(control_input).await
    }

    /// Runs from the `enter` input of `node`.
    pub async fn run_node(&mut self, node: NodeId) -> Result<(), FlowError> {
        let enter = self
            .graph
            .control_input(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        self.run(enter).await
    }

    fn drive(&mut self, start: PortId) -> BoxFuture<'_, Result<(), FlowError>> {
        async move {
            let graph = Arc::clone(&self.graph);
            let mut current = start;
            loop {
                let node = graph.port_ref(current)?.node();
                let Some(exit) = self.invoke(node).await? else {
                    return Ok(());
                };
                match graph.next_control(exit) {
                    Some(next) => current = next,
                    None => return Ok(()),
                }
            }
        }
        .boxed()
    }

    // --- Values ---

    /// Resolves the value of a value port.
    ///
    /// An input yields its connected output's value, else its slot default, else its type
    /// default, coerced to the input's type. An output yields its memoized value, running
    /// its node first on a miss.
    pub fn get_value(&mut self, port: PortId) -> BoxFuture<'_, Result<Value, FlowError>> {
        async move {
            if let Some(value) = self.cached_value(port) {
                return Ok(value.clone());
            }
            let graph = Arc::clone(&self.graph);
            let target = graph.port_ref(port)?;
            match target.role() {
                PortRole::ValueInput => {
                    let value = match graph.value_source(port) {
                        Some(source) => self.get_value(source).await?,
                        None => input_default(&graph, target),
                    };
                    Ok(self.coerce(value, target))
                }
                PortRole::ValueOutput => {
                    let node_id = target.node();
                    if self.call_stack.contains(&node_id) {
                        return Err(FlowError::ValueCycle { node_id });
                    }
                    self.invoke(node_id).await?;
                    match self.cached_value(port) {
                        Some(value) => Ok(value.clone()),
                        None => {
                            let define = graph
                                .node(node_id)
                                .map(|n| n.kind().name().to_string())
                                .unwrap_or_default();
                            error!(
                                node_id = %node_id,
                                define = %define,
                                port = %target.slot(),
                                "output_unpopulated"
                            );
                            Err(FlowError::UnpopulatedOutput {
                                node_id,
                                define,
                                port: target.name().to_string(),
                            })
                        }
                    }
                }
                role => Err(FlowError::WrongPortRole {
                    port,
                    expected: "value port",
                    actual: role.name(),
                }),
            }
        }
        .boxed()
    }

    fn coerce(&self, value: Value, port: &Port) -> Value {
        FlowConvert::convert(value, port.value_type(), self.converter.as_ref())
    }

    // --- Nodes ---

    /// Runs one node and returns the control output to follow, if any.
    pub fn invoke(&mut self, node_id: NodeId) -> BoxFuture<'_, Result<Option<PortId>, FlowError>> {
        async move {
            let graph = Arc::clone(&self.graph);
            let node = graph
                .node(node_id)
                .ok_or(GraphError::NodeNotFound(node_id))?;
            debug!(node_id = %node_id, define = node.kind().name(), "node_invoked");

            self.call_stack.push(node_id);
            let result = match node.kind() {
                NodeKind::Entry => {
                    self.populate_entry(&graph, node);
                    Ok(graph.output_port(node_id, EXIT))
                }
                NodeKind::Return => Ok(None),
                NodeKind::Action(define) => match define.body() {
                    DefineBody::Method(method) => {
                        self.run_method(&graph, node, define, method).await
                    }
                    DefineBody::Generated(generated) => {
                        self.run_generated(&graph, node, define, generated).await
                    }
                },
            };
            self.call_stack.pop();
            result
        }
        .boxed()
    }

    /// Entry outputs are written by the caller of a generated define; any left unset
    /// (e.g. when the inner graph is run on its own) read as their type default.
    fn populate_entry(&mut self, graph: &ActionGraph, node: &Node) {
        for port in node.outputs() {
            if self.cached_value(*port).is_some() {
                continue;
            }
            if let Some(port) = graph.port(*port).filter(|p| !p.is_control()) {
                self.set_value(port.id(), port.value_type().default_value());
            }
        }
    }

    async fn run_method(
        &mut self,
        graph: &ActionGraph,
        node: &Node,
        define: &ActionDefine,
        method: &MethodDefine,
    ) -> Result<Option<PortId>, FlowError> {
        let node_id = node.id();
        let mut args = AHashMap::new();
        for param in method.params() {
            match param {
                MethodParam::Input(input) if input.is_variadic => {
                    let packed = self.pack_variadic(graph, node_id, &input.name).await?;
                    args.insert(input.name.clone(), packed);
                }
                MethodParam::Input(input) => {
                    let port = required_input(graph, node_id, &input.name)?;
                    args.insert(input.name.clone(), self.get_value(port).await?);
                }
                MethodParam::Const(constant) => {
                    let value = node
                        .const_value(&constant.name)
                        .cloned()
                        .unwrap_or(Value::Null);
                    let value =
                        FlowConvert::convert(value, &constant.value_type, self.converter.as_ref());
                    args.insert(constant.name.clone(), value);
                }
                MethodParam::Ambient { name, ambient } => {
                    args.insert(name.clone(), self.env.resolve(*ambient));
                }
                MethodParam::Out(_) | MethodParam::Branch(_) => {}
            }
        }

        let body = Arc::clone(method.body());
        let (result, mut outcome) = {
            let mut call = MethodCall::new(self, node_id, args);
            let result = body.invoke(&mut call).await;
            (result, call.finish())
        };
        if let Err(err) = result {
            return Err(self.attribute(node_id, define.name(), err));
        }

        for param in method.params() {
            if let MethodParam::Out(out) = param {
                let value = outcome.outs.remove(&out.name).unwrap_or(Value::Null);
                self.write_output(graph, node_id, &out.name, value)?;
            }
        }
        if let Some(returns) = method.returns() {
            let value = outcome.result.take().unwrap_or(Value::Null);
            self.write_output(graph, node_id, &returns.name, value)?;
        }
        next_control_output(graph, node_id, &outcome)
    }

    async fn run_generated(
        &mut self,
        graph: &ActionGraph,
        node: &Node,
        define: &ActionDefine,
        generated: &GeneratedDefine,
    ) -> Result<Option<PortId>, FlowError> {
        if self.depth + 1 > self.options.max_call_depth {
            return Err(FlowError::CallDepthExceeded {
                define: define.name().to_string(),
                limit: self.options.max_call_depth,
            });
        }
        let node_id = node.id();
        let inner = Arc::clone(generated.graph());
        let entry = inner.entry_node().ok_or(GraphError::PseudoNodeCount {
            kind: "Entry",
            count: 0,
        })?;
        let ret = inner.return_node().ok_or(GraphError::PseudoNodeCount {
            kind: "Return",
            count: 0,
        })?;

        let mut child = self.child(Arc::clone(&inner), node_id);
        for input in define.inputs() {
            let value = if input.is_variadic {
                self.pack_variadic(graph, node_id, &input.name).await?
            } else {
                let port = required_input(graph, node_id, &input.name)?;
                self.get_value(port).await?
            };
            let port = required_output(&inner, entry, &input.name)?;
            let value = child.coerce(value, inner.port_ref(port)?);
            child.set_value(port, value);
        }
        for constant in define.consts() {
            let value = node
                .const_value(&constant.name)
                .cloned()
                .unwrap_or(Value::Null);
            let port = required_output(&inner, entry, &constant.name)?;
            let value = child.coerce(value, inner.port_ref(port)?);
            child.set_value(port, value);
        }

        if let Some(start) = inner
            .output_port(entry, EXIT)
            .and_then(|exit| inner.next_control(exit))
        {
            child.drive(start).await?;
        }

        for output in define.outputs() {
            let inner_port = inner
                .input_port(ret, &output.name, None)
                .ok_or_else(|| unknown_port(ret, &output.name))?;
            let value = child.get_value(inner_port).await?;
            self.write_output(graph, node_id, &output.name, value)?;
        }
        Ok(graph.output_port(node_id, EXIT))
    }

    /// Reads every slot of a variadic group into one array, in slot order.
    async fn pack_variadic(
        &mut self,
        graph: &ActionGraph,
        node_id: NodeId,
        group: &str,
    ) -> Result<Value, FlowError> {
        let slots = graph.variadic_slots(node_id, group);
        let mut packed = Vec::with_capacity(slots.len());
        for slot in slots {
            packed.push(self.get_value(slot).await?);
        }
        Ok(Value::Array(packed))
    }

    fn write_output(
        &mut self,
        graph: &ActionGraph,
        node_id: NodeId,
        name: &str,
        value: Value,
    ) -> Result<(), FlowError> {
        let port = required_output(graph, node_id, name)?;
        let value = self.coerce(value, graph.port_ref(port)?);
        self.set_value(port, value);
        Ok(())
    }

    /// Attaches node identity to a body error. An interpreter error the body passed
    /// through is returned as is.
    fn attribute(&self, node_id: NodeId, define: &str, err: ActionError) -> FlowError {
        match err {
            ActionError::Flow(inner) => *inner,
            source => {
                if self.options.log_node_errors {
                    error!(
                        node_id = %node_id,
                        define = %define,
                        depth = self.depth,
                        callers = ?self.callers,
                        error = %source,
                        "node_failed"
                    );
                }
                FlowError::Action {
                    node_id,
                    define: define.to_string(),
                    source,
                }
            }
        }
    }
}

fn input_default(graph: &ActionGraph, port: &Port) -> Value {
    graph
        .node(port.node())
        .and_then(|node| node.input_default(&port.slot()))
        .cloned()
        .unwrap_or_else(|| port.value_type().default_value())
}

fn next_control_output(
    graph: &ActionGraph,
    node_id: NodeId,
    outcome: &CallOutcome,
) -> Result<Option<PortId>, FlowError> {
    let name = outcome.branch.as_deref().unwrap_or(EXIT);
    match graph.output_port(node_id, name) {
        Some(port) if graph.port_ref(port)?.is_control() => Ok(Some(port)),
        _ => Err(unknown_port(node_id, name).into()),
    }
}

fn required_input(graph: &ActionGraph, node_id: NodeId, name: &str) -> Result<PortId, FlowError> {
    graph
        .input_port(node_id, name, None)
        .ok_or_else(|| unknown_port(node_id, name).into())
}

fn required_output(graph: &ActionGraph, node_id: NodeId, name: &str) -> Result<PortId, FlowError> {
    graph
        .output_port(node_id, name)
        .ok_or_else(|| unknown_port(node_id, name).into())
}

fn unknown_port(node_id: NodeId, name: &str) -> GraphError {
    GraphError::UnknownPort {
        node_id,
        port: name.to_string(),
        param_index: None,
    }
}
