use crate::graph::PortId;
use crate::value::Value;
use ahash::AHashMap;

/// One memo frame of a flow: values already produced for ports, by port id.
#[derive(Debug, Clone, Default)]
pub struct FlowScope {
    values: AHashMap<PortId, Value>,
}

impl FlowScope {
    pub fn get(&self, port: PortId) -> Option<&Value> {
        self.values.get(&port)
    }

    pub fn set(&mut self, port: PortId, value: Value) {
        self.values.insert(port, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
