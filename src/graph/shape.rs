//! Port-shape recomputation.
//!
//! A node's port list is derived from its kind and, for variadic groups, from the slots
//! currently in use. Recomputing reuses every existing port whose define and slot index
//! still appear in the new shape, so connections on those ports survive. Ports that
//! disappear have their connections severed.

use super::{
    ActionGraph, ENTER, EXIT, MAX_VARIADIC_SLOTS, Node, NodeId, NodeKind, Port, PortDefine,
    PortDirection, PortId,
};
use crate::error::GraphError;
use crate::value::ValueType;
use ahash::AHashSet;
use std::sync::Arc;

/// One port a node should carry.
#[derive(Debug, Clone)]
pub(crate) struct PortSpec {
    pub(crate) define: Arc<PortDefine>,
    pub(crate) param_index: Option<usize>,
}

impl PortSpec {
    fn single(define: Arc<PortDefine>) -> Self {
        Self {
            define,
            param_index: None,
        }
    }

    fn control(name: &str) -> Self {
        Self::single(Arc::new(PortDefine::control(name)))
    }
}

/// Number of slots a variadic group should expose: one past the highest populated slot,
/// plus one trailing empty slot, capped at [`MAX_VARIADIC_SLOTS`].
///
/// A slot is populated when it has a live connection, an explicit default value, or a
/// reservation held while the graph is being rebuilt.
pub(crate) fn variadic_arity(graph: &ActionGraph, node: &Node, group: &str) -> usize {
    let connected = node.inputs.iter().filter_map(|id| {
        let port = graph.ports.get(id)?;
        if port.name() != group || !graph.is_connected(*id) {
            return None;
        }
        port.param_index
    });
    let defaulted = node
        .defaults
        .keys()
        .filter(|slot| slot.name == group)
        .filter_map(|slot| slot.index);
    let reserved = node.reserved.get(group).copied();

    match connected.chain(defaulted).chain(reserved).max() {
        Some(highest) => highest
            .checked_add(2)
            .map_or(MAX_VARIADIC_SLOTS, |arity| arity.min(MAX_VARIADIC_SLOTS)),
        None => 1,
    }
}

/// The `(inputs, outputs)` a node should carry right now.
pub(crate) fn desired_shape(graph: &ActionGraph, node: &Node) -> (Vec<PortSpec>, Vec<PortSpec>) {
    match &node.kind {
        NodeKind::Action(define) => {
            let mut inputs = vec![PortSpec::control(ENTER)];
            for input in define.inputs() {
                if input.is_variadic {
                    let arity = variadic_arity(graph, node, &input.name);
                    inputs.extend((0..arity).map(|i| PortSpec {
                        define: Arc::clone(input),
                        param_index: Some(i),
                    }));
                } else {
                    inputs.push(PortSpec::single(Arc::clone(input)));
                }
            }
            let mut outputs = vec![PortSpec::control(EXIT)];
            outputs.extend(define.outputs().iter().cloned().map(PortSpec::single));
            (inputs, outputs)
        }
        NodeKind::Entry => {
            let mut outputs = vec![PortSpec::control(EXIT)];
            if let Some(signature) = &graph.signature {
                for input in &signature.inputs {
                    outputs.push(PortSpec::single(if input.is_variadic {
                        let mut packed = PortDefine::clone(input);
                        packed.value_type = ValueType::array_of(input.value_type.clone());
                        packed.is_variadic = false;
                        Arc::new(packed)
                    } else {
                        Arc::clone(input)
                    }));
                }
                outputs.extend(signature.consts.iter().cloned().map(PortSpec::single));
            }
            (Vec::new(), outputs)
        }
        NodeKind::Return => {
            let mut inputs = vec![PortSpec::control(ENTER)];
            if let Some(signature) = &graph.signature {
                inputs.extend(signature.outputs.iter().cloned().map(PortSpec::single));
            }
            (inputs, Vec::new())
        }
    }
}

/// Recomputes the port list of `node_id`.
///
/// Nodes on the far side of a severed connection that carry variadic inputs are
/// recomputed as well, since their arity may have shrunk.
pub(crate) fn define_node(graph: &mut ActionGraph, node_id: NodeId) -> Result<(), GraphError> {
    let node = graph
        .nodes
        .get(&node_id)
        .ok_or(GraphError::NodeNotFound(node_id))?;
    let (input_specs, output_specs) = desired_shape(graph, node);
    let old_inputs = node.inputs.clone();
    let old_outputs = node.outputs.clone();

    let mut kept = AHashSet::new();
    let inputs = reconcile(
        graph,
        node_id,
        PortDirection::Input,
        &old_inputs,
        input_specs,
        &mut kept,
    );
    let outputs = reconcile(
        graph,
        node_id,
        PortDirection::Output,
        &old_outputs,
        output_specs,
        &mut kept,
    );

    let dropped: Vec<PortId> = old_inputs
        .iter()
        .chain(&old_outputs)
        .copied()
        .filter(|id| !kept.contains(id))
        .collect();

    if let Some(node) = graph.nodes.get_mut(&node_id) {
        node.inputs = inputs;
        node.outputs = outputs;
    }

    let mut affected = Vec::new();
    for port in &dropped {
        affected.extend(graph.sever(|c| c.touches(*port)));
        graph.ports.remove(port);
    }
    affected.retain(|id| *id != node_id);
    affected.sort_unstable();
    affected.dedup();
    for other in affected {
        define_node(graph, other)?;
    }
    Ok(())
}

fn reconcile(
    graph: &mut ActionGraph,
    node_id: NodeId,
    direction: PortDirection,
    existing: &[PortId],
    specs: Vec<PortSpec>,
    kept: &mut AHashSet<PortId>,
) -> Vec<PortId> {
    specs
        .into_iter()
        .map(|spec| {
            let reused = existing.iter().copied().find(|id| {
                !kept.contains(id)
                    && graph.ports.get(id).is_some_and(|port| {
                        *port.define == *spec.define && port.param_index == spec.param_index
                    })
            });
            match reused {
                Some(id) => {
                    kept.insert(id);
                    id
                }
                None => {
                    let id = graph.allocate_port_id();
                    graph.ports.insert(
                        id,
                        Port {
                            id,
                            node: node_id,
                            define: spec.define,
                            direction,
                            param_index: spec.param_index,
                        },
                    );
                    kept.insert(id);
                    id
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::define::ActionDefine;
    use crate::graph::{ActionGraph, NodeKind, SlotKey};
    use crate::value::{Value, ValueType};
    use std::sync::Arc;

    fn sum() -> Arc<ActionDefine> {
        Arc::new(
            ActionDefine::method("Sum")
                .variadic_input("values", ValueType::Int)
                .returns(ValueType::Int)
                .body(|call| {
                    let total: i64 = call.array("values")?.iter().filter_map(Value::as_int).sum();
                    call.set_return(total);
                    Ok(())
                })
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn fresh_variadic_group_offers_one_slot() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(NodeKind::Action(sum())).unwrap();
        assert_eq!(graph.variadic_slots(node, "values").len(), 1);
    }

    #[test]
    fn defaults_extend_the_group() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(NodeKind::Action(sum())).unwrap();
        graph
            .set_input_default(node, SlotKey::variadic("values", 3), Value::Int(1))
            .unwrap();
        assert_eq!(graph.variadic_slots(node, "values").len(), 5);

        graph
            .clear_input_default(node, &SlotKey::variadic("values", 3))
            .unwrap();
        assert_eq!(graph.variadic_slots(node, "values").len(), 1);
    }

    #[test]
    fn surviving_slots_keep_their_port_ids() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(NodeKind::Action(sum())).unwrap();
        let first = graph.input_port(node, "values", Some(0)).unwrap();
        graph
            .set_input_default(node, SlotKey::variadic("values", 2), Value::Int(1))
            .unwrap();
        assert_eq!(graph.input_port(node, "values", Some(0)), Some(first));
    }
}
