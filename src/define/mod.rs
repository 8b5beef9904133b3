//! Node kinds.
//!
//! An [`ActionDefine`] describes a node kind's ports and supplies its behaviour, either
//! as a registered method body ([`method`]) or as an inner action graph with Entry and
//! Return pseudo-nodes ([`generated`]). Defines are created once and shared by every
//! node that references them.

use crate::graph::{ActionGraph, PortDefine};
use crate::value::ValueType;
use std::fmt;
use std::sync::Arc;

pub mod catalog;
pub mod generated;
pub mod method;

pub use catalog::DefineCatalog;
pub use generated::GeneratedDefine;
pub use method::{
    Ambient, FnBody, MethodBody, MethodCall, MethodDefine, MethodDefineBuilder, MethodParam,
};

/// The port-level shape of a node kind: its value inputs, consts and outputs.
///
/// Control ports (`enter`, `exit`) are implied and not listed. `outputs` may contain
/// control branches (`is_control`) alongside value outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineSignature {
    pub name: String,
    pub inputs: Vec<Arc<PortDefine>>,
    pub consts: Vec<Arc<PortDefine>>,
    pub outputs: Vec<Arc<PortDefine>>,
}

impl DefineSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            consts: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, value_type: ValueType) -> Self {
        self.inputs.push(Arc::new(PortDefine::value(name, value_type)));
        self
    }

    pub fn variadic_input(mut self, name: &str, element_type: ValueType) -> Self {
        self.inputs
            .push(Arc::new(PortDefine::value(name, element_type).variadic()));
        self
    }

    pub fn constant(mut self, name: &str, value_type: ValueType) -> Self {
        self.consts.push(Arc::new(PortDefine::value(name, value_type)));
        self
    }

    pub fn output(mut self, name: &str, value_type: ValueType) -> Self {
        self.outputs.push(Arc::new(PortDefine::value(name, value_type)));
        self
    }

    pub fn input_define(&self, name: &str) -> Option<&Arc<PortDefine>> {
        self.inputs.iter().find(|d| d.name == name)
    }

    pub fn const_define(&self, name: &str) -> Option<&Arc<PortDefine>> {
        self.consts.iter().find(|d| d.name == name)
    }
}

/// How a define behaves when its node runs.
#[derive(Clone)]
pub enum DefineBody {
    Method(MethodDefine),
    Generated(GeneratedDefine),
}

/// A node kind: its shape, its behaviour, and the names it was known by before.
#[derive(Clone)]
pub struct ActionDefine {
    signature: Arc<DefineSignature>,
    obsolete_names: Vec<String>,
    obsolete_message: Option<String>,
    body: DefineBody,
}

impl ActionDefine {
    pub(crate) fn new(signature: DefineSignature, body: DefineBody) -> Self {
        Self {
            signature: Arc::new(signature),
            obsolete_names: Vec::new(),
            obsolete_message: None,
            body,
        }
    }

    /// Starts a method define; see [`MethodDefineBuilder`].
    pub fn method(name: impl Into<String>) -> MethodDefineBuilder {
        MethodDefineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &Arc<DefineSignature> {
        &self.signature
    }

    pub fn inputs(&self) -> &[Arc<PortDefine>] {
        &self.signature.inputs
    }

    pub fn consts(&self) -> &[Arc<PortDefine>] {
        &self.signature.consts
    }

    pub fn outputs(&self) -> &[Arc<PortDefine>] {
        &self.signature.outputs
    }

    pub fn body(&self) -> &DefineBody {
        &self.body
    }

    pub fn obsolete_names(&self) -> &[String] {
        &self.obsolete_names
    }

    pub fn obsolete_message(&self) -> Option<&str> {
        self.obsolete_message.as_deref()
    }

    /// The inner graph of a generated define.
    pub fn graph(&self) -> Option<&Arc<ActionGraph>> {
        match &self.body {
            DefineBody::Generated(generated) => Some(generated.graph()),
            DefineBody::Method(_) => None,
        }
    }

    pub fn with_obsolete_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.obsolete_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_obsolete_message(mut self, message: impl Into<String>) -> Self {
        self.obsolete_message = Some(message.into());
        self
    }
}

impl fmt::Debug for ActionDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            DefineBody::Method(_) => "method",
            DefineBody::Generated(_) => "generated",
        };
        f.debug_struct("ActionDefine")
            .field("name", &self.signature.name)
            .field("kind", &kind)
            .field("inputs", &self.signature.inputs)
            .field("consts", &self.signature.consts)
            .field("outputs", &self.signature.outputs)
            .field("obsolete_names", &self.obsolete_names)
            .finish()
    }
}
