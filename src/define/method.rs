//! Method defines: node kinds backed by a registered, statically-typed body.
//!
//! A method define is declared up front with [`MethodDefineBuilder`]. Each parameter is
//! given a role: value input, const, out value, control branch, or ambient context.
//! At run time the interpreter resolves every parameter, hands them to the body through
//! a [`MethodCall`], and writes the body's out values and return value to the node's
//! output ports.

use super::{ActionDefine, DefineBody, DefineSignature};
use crate::error::{ActionError, DefineError};
use crate::flow::{Flow, FlowEnv};
use crate::graph::{ENTER, EXIT, NodeId, PortDefine, RETURN};
use crate::value::{Value, ValueType};
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use std::sync::Arc;

/// Type name under which the host exposes its game instance.
pub const GAME_TYPE: &str = "Game";
/// Type name under which the host exposes the triggering event argument.
pub const EVENT_TYPE: &str = "EventArg";

/// Context a method parameter can be bound to without a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ambient {
    Game,
    Card,
    Buff,
    Event,
    /// Bound to [`MethodCall::flow`]; adds no argument.
    Flow,
    /// Bound to [`MethodCall::node_id`]; adds no argument.
    Node,
}

impl Ambient {
    /// The ambient context a parameter of type `ty` binds to when it is declared without
    /// an explicit role.
    pub fn for_type(ty: &ValueType) -> Option<Ambient> {
        match ty {
            ValueType::Card => Some(Ambient::Card),
            ValueType::Buff => Some(Ambient::Buff),
            ValueType::Object(name) if name == GAME_TYPE => Some(Ambient::Game),
            ValueType::Object(name) if name == EVENT_TYPE => Some(Ambient::Event),
            _ => None,
        }
    }
}

/// One declared parameter of a method define.
#[derive(Debug, Clone)]
pub enum MethodParam {
    Input(Arc<PortDefine>),
    Const(Arc<PortDefine>),
    Out(Arc<PortDefine>),
    Branch(Arc<PortDefine>),
    Ambient { name: String, ambient: Ambient },
}

impl MethodParam {
    pub fn name(&self) -> &str {
        match self {
            MethodParam::Input(d)
            | MethodParam::Const(d)
            | MethodParam::Out(d)
            | MethodParam::Branch(d) => &d.name,
            MethodParam::Ambient { name, .. } => name,
        }
    }
}

/// The behaviour of a method define.
#[async_trait]
pub trait MethodBody: Send + Sync {
    async fn invoke(&self, call: &mut MethodCall<'_>) -> Result<(), ActionError>;
}

/// Adapts a synchronous closure into a [`MethodBody`].
pub struct FnBody<F>(pub F);

#[async_trait]
impl<F> MethodBody for FnBody<F>
where
    F: Fn(&mut MethodCall<'_>) -> Result<(), ActionError> + Send + Sync,
{
    async fn invoke(&self, call: &mut MethodCall<'_>) -> Result<(), ActionError> {
        (self.0)(call)
    }
}

/// The method half of an [`ActionDefine`]: parameter roles plus the body.
#[derive(Clone)]
pub struct MethodDefine {
    params: Vec<MethodParam>,
    returns: Option<Arc<PortDefine>>,
    body: Arc<dyn MethodBody>,
}

impl MethodDefine {
    pub fn params(&self) -> &[MethodParam] {
        &self.params
    }

    /// The `return` output port define, if the body produces a return value.
    pub fn returns(&self) -> Option<&Arc<PortDefine>> {
        self.returns.as_ref()
    }

    pub fn body(&self) -> &Arc<dyn MethodBody> {
        &self.body
    }
}

/// Declares a method define.
///
/// ```rust,no_run
/// use actiongraph::prelude::*;
///
/// let double = ActionDefine::method("Double")
///     .input("value", ValueType::Int)
///     .returns(ValueType::Int)
///     .body(|call| {
///         let value = call.int("value")?;
///         call.set_return(value * 2);
///         Ok(())
///     })
///     .build()?;
/// # Ok::<(), actiongraph::error::DefineError>(())
/// ```
pub struct MethodDefineBuilder {
    name: String,
    params: Vec<MethodParam>,
    returns: Option<ValueType>,
    obsolete_names: Vec<String>,
    obsolete_message: Option<String>,
    body: Option<Arc<dyn MethodBody>>,
}

impl MethodDefineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            obsolete_names: Vec::new(),
            obsolete_message: None,
            body: None,
        }
    }

    /// Adds a parameter whose role is inferred from its type: ambient context types bind
    /// to the flow environment, anything else becomes a value input.
    pub fn param(self, name: &str, value_type: ValueType) -> Self {
        match Ambient::for_type(&value_type) {
            Some(ambient) => self.ambient(name, ambient),
            None => self.input(name, value_type),
        }
    }

    pub fn input(mut self, name: &str, value_type: ValueType) -> Self {
        self.params
            .push(MethodParam::Input(Arc::new(PortDefine::value(name, value_type))));
        self
    }

    /// A variadic group of value inputs. The body receives an array with one element per
    /// materialized slot.
    pub fn variadic_input(mut self, name: &str, element_type: ValueType) -> Self {
        self.params.push(MethodParam::Input(Arc::new(
            PortDefine::value(name, element_type).variadic(),
        )));
        self
    }

    pub fn constant(mut self, name: &str, value_type: ValueType) -> Self {
        self.params
            .push(MethodParam::Const(Arc::new(PortDefine::value(name, value_type))));
        self
    }

    pub fn out(mut self, name: &str, value_type: ValueType) -> Self {
        self.params
            .push(MethodParam::Out(Arc::new(PortDefine::value(name, value_type))));
        self
    }

    /// A control output the body may select with [`MethodCall::take_branch`].
    pub fn branch(mut self, name: &str) -> Self {
        self.params
            .push(MethodParam::Branch(Arc::new(PortDefine::control(name))));
        self
    }

    pub fn ambient(mut self, name: &str, ambient: Ambient) -> Self {
        self.params.push(MethodParam::Ambient {
            name: name.to_string(),
            ambient,
        });
        self
    }

    pub fn returns(mut self, value_type: ValueType) -> Self {
        self.returns = Some(value_type);
        self
    }

    pub fn obsolete_name(mut self, name: &str) -> Self {
        self.obsolete_names.push(name.to_string());
        self
    }

    pub fn obsolete_message(mut self, message: &str) -> Self {
        self.obsolete_message = Some(message.to_string());
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut MethodCall<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(FnBody(body)));
        self
    }

    pub fn async_body(mut self, body: impl MethodBody + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn build(self) -> Result<ActionDefine, DefineError> {
        let body = self.body.ok_or_else(|| DefineError::MissingBody {
            define: self.name.clone(),
        })?;

        let mut seen: AHashSet<&str> = [ENTER, EXIT].into_iter().collect();
        if self.returns.is_some() {
            seen.insert(RETURN);
        }
        for (i, param) in self.params.iter().enumerate() {
            if !seen.insert(param.name()) {
                return Err(DefineError::DuplicateParameter {
                    define: self.name.clone(),
                    param: param.name().to_string(),
                });
            }
            if let MethodParam::Input(define) = param {
                if define.is_variadic && i + 1 != self.params.len() {
                    return Err(DefineError::VariadicNotLast {
                        define: self.name.clone(),
                        param: define.name.clone(),
                    });
                }
            }
        }

        let mut signature = DefineSignature::new(self.name.clone());
        for param in &self.params {
            match param {
                MethodParam::Input(d) => signature.inputs.push(Arc::clone(d)),
                MethodParam::Const(d) => signature.consts.push(Arc::clone(d)),
                MethodParam::Out(d) | MethodParam::Branch(d) => {
                    signature.outputs.push(Arc::clone(d))
                }
                MethodParam::Ambient { .. } => {}
            }
        }
        let returns = self
            .returns
            .map(|ty| Arc::new(PortDefine::value(RETURN, ty)));
        if let Some(define) = &returns {
            signature.outputs.push(Arc::clone(define));
        }

        let method = MethodDefine {
            params: self.params,
            returns,
            body,
        };
        let mut define = ActionDefine::new(signature, DefineBody::Method(method))
            .with_obsolete_names(self.obsolete_names);
        if let Some(message) = self.obsolete_message {
            define = define.with_obsolete_message(message);
        }
        Ok(define)
    }
}

/// One invocation of a method body.
///
/// Arguments are resolved and coerced to their declared types before the body runs.
/// Out values and the return value that the body never sets are written as their
/// type's default.
pub struct MethodCall<'a> {
    flow: &'a mut Flow,
    node_id: NodeId,
    args: AHashMap<String, Value>,
    outs: AHashMap<String, Value>,
    result: Option<Value>,
    branch: Option<String>,
}

pub(crate) struct CallOutcome {
    pub(crate) outs: AHashMap<String, Value>,
    pub(crate) result: Option<Value>,
    pub(crate) branch: Option<String>,
}

impl<'a> MethodCall<'a> {
    pub(crate) fn new(flow: &'a mut Flow, node_id: NodeId, args: AHashMap<String, Value>) -> Self {
        Self {
            flow,
            node_id,
            args,
            outs: AHashMap::new(),
            result: None,
            branch: None,
        }
    }

    pub(crate) fn finish(self) -> CallOutcome {
        CallOutcome {
            outs: self.outs,
            result: self.result,
            branch: self.branch,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn env(&self) -> &FlowEnv {
        self.flow.env()
    }

    /// The flow running this node, for bodies that drive the interpreter themselves.
    pub fn flow(&mut self) -> &mut Flow {
        &mut *self.flow
    }

    pub fn arg(&self, name: &str) -> Result<&Value, ActionError> {
        self.args
            .get(name)
            .ok_or_else(|| ActionError::MissingArgument(name.to_string()))
    }

    pub fn int(&self, name: &str) -> Result<i64, ActionError> {
        let value = self.arg(name)?;
        value.as_int().ok_or_else(|| invalid(name, "int", value))
    }

    pub fn float(&self, name: &str) -> Result<f64, ActionError> {
        let value = self.arg(name)?;
        value.as_float().ok_or_else(|| invalid(name, "float", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ActionError> {
        let value = self.arg(name)?;
        value.as_bool().ok_or_else(|| invalid(name, "bool", value))
    }

    pub fn str(&self, name: &str) -> Result<&str, ActionError> {
        let value = self.arg(name)?;
        value.as_str().ok_or_else(|| invalid(name, "string", value))
    }

    pub fn array(&self, name: &str) -> Result<&[Value], ActionError> {
        let value = self.arg(name)?;
        value.as_array().ok_or_else(|| invalid(name, "array", value))
    }

    pub fn set_out(&mut self, name: &str, value: impl Into<Value>) {
        self.outs.insert(name.to_string(), value.into());
    }

    pub fn set_return(&mut self, value: impl Into<Value>) {
        self.result = Some(value.into());
    }

    /// Continues control through the named branch instead of `exit`.
    pub fn take_branch(&mut self, name: &str) {
        self.branch = Some(name.to_string());
    }
}

fn invalid(name: &str, expected: &str, found: &Value) -> ActionError {
    ActionError::InvalidArgument {
        name: name.to_string(),
        expected: expected.to_string(),
        found: found.kind_name().to_string(),
    }
}
