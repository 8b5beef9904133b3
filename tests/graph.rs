//! Graph mutation tests: connection invariants, variadic arity and redefinition.
mod common;
use actiongraph::prelude::*;
use common::*;
use std::sync::Arc;

fn collect_define() -> Arc<ActionDefine> {
    Arc::new(
        ActionDefine::method("Collect")
            .variadic_input("values", ValueType::Int)
            .returns(ValueType::array_of(ValueType::Int))
            .body(|call| {
                let values = call.array("values")?.to_vec();
                call.set_return(Value::Array(values));
                Ok(())
            })
            .build()
            .expect("collect should build"),
    )
}

#[test]
fn second_source_replaces_value_input_connection() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let b = add_integer(&mut graph, &catalog, 2);
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();

    wire(&mut graph, a, RETURN, compare, "left", None);
    wire(&mut graph, b, RETURN, compare, "left", None);

    let left = graph.input_port(compare, "left", None).unwrap();
    assert_eq!(graph.connections_of(left).count(), 1);
    assert_eq!(graph.value_source(left), graph.output_port(b, RETURN));
}

#[test]
fn second_destination_replaces_control_output_connection() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let first = graph.add_action(define(&catalog, "Log")).unwrap();
    let second = graph.add_action(define(&catalog, "Log")).unwrap();
    let third = graph.add_action(define(&catalog, "Log")).unwrap();

    let exit = graph.output_port(first, EXIT).unwrap();
    graph
        .connect(exit, graph.control_input(second).unwrap())
        .unwrap();
    // Initiating from the destination side follows the same rule.
    graph
        .connect(graph.control_input(third).unwrap(), exit)
        .unwrap();

    assert_eq!(graph.connections_of(exit).count(), 1);
    assert_eq!(graph.next_control(exit), graph.control_input(third));
}

#[test]
fn control_inputs_accept_many_sources() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = graph.add_action(define(&catalog, "Log")).unwrap();
    let b = graph.add_action(define(&catalog, "Log")).unwrap();
    let target = graph.add_action(define(&catalog, "Log")).unwrap();
    wire(&mut graph, a, EXIT, target, ENTER, None);
    wire(&mut graph, b, EXIT, target, ENTER, None);
    let enter = graph.control_input(target).unwrap();
    assert_eq!(graph.connections_of(enter).count(), 2);
}

#[test]
fn connecting_an_existing_pair_is_a_no_op() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();
    wire(&mut graph, a, RETURN, compare, "left", None);
    wire(&mut graph, a, RETURN, compare, "left", None);
    assert_eq!(graph.connections().len(), 1);
}

#[test]
fn incompatible_ports_are_rejected() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let card = graph.add_action(define(&catalog, "GetCard")).unwrap();
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();

    let card_out = graph.output_port(card, RETURN).unwrap();
    let left = graph.input_port(compare, "left", None).unwrap();
    let err = graph.connect(card_out, left).unwrap_err();
    assert!(matches!(err, GraphError::IncompatiblePorts { .. }));

    let own_result = graph.output_port(compare, RETURN).unwrap();
    assert!(graph.connect(own_result, left).is_err());
    assert!(graph.connections().is_empty());
}

#[test]
fn variadic_arity_tracks_connections_and_defaults() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let three = add_integer(&mut graph, &catalog, 3);
    let seven = add_integer(&mut graph, &catalog, 7);
    let collect = graph.add_action(collect_define()).unwrap();

    graph
        .set_input_default(collect, SlotKey::variadic("values", 4), Value::Int(5))
        .unwrap();
    wire(&mut graph, three, RETURN, collect, "values", Some(0));
    wire(&mut graph, seven, RETURN, collect, "values", Some(2));
    assert_eq!(graph.variadic_slots(collect, "values").len(), 6);

    let flow = run_node(Arc::new(graph), collect).unwrap();
    assert_eq!(
        output(&flow, collect, RETURN),
        Some(Value::from(vec![3_i64, 0, 7, 0, 5, 0]))
    );
}

#[test]
fn disconnecting_the_highest_slot_shrinks_the_group() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let sum = graph.add_action(define(&catalog, "IntegerOperation")).unwrap();
    wire(&mut graph, a, RETURN, sum, "values", Some(0));
    wire(&mut graph, a, RETURN, sum, "values", Some(1));
    assert_eq!(graph.variadic_slots(sum, "values").len(), 3);

    let source = graph.output_port(a, RETURN).unwrap();
    let slot = graph.input_port(sum, "values", Some(1)).unwrap();
    assert!(graph.disconnect(slot, source).unwrap());
    assert_eq!(graph.variadic_slots(sum, "values").len(), 2);

    let slot = graph.input_port(sum, "values", Some(0)).unwrap();
    graph.disconnect_port(slot).unwrap();
    assert_eq!(graph.variadic_slots(sum, "values").len(), 1);
}

#[test]
fn disconnecting_a_lower_slot_keeps_the_arity() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let sum = graph.add_action(define(&catalog, "IntegerOperation")).unwrap();
    wire(&mut graph, a, RETURN, sum, "values", Some(0));
    wire(&mut graph, a, RETURN, sum, "values", Some(1));
    let upper = graph.input_port(sum, "values", Some(1)).unwrap();

    let lower = graph.input_port(sum, "values", Some(0)).unwrap();
    graph.disconnect_port(lower).unwrap();
    assert_eq!(graph.variadic_slots(sum, "values").len(), 3);
    assert_eq!(graph.input_port(sum, "values", Some(1)), Some(upper));
    assert!(graph.is_connected(upper));
}

#[test]
fn removing_a_source_node_shrinks_downstream_groups() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let b = add_integer(&mut graph, &catalog, 2);
    let sum = graph.add_action(define(&catalog, "IntegerOperation")).unwrap();
    wire(&mut graph, a, RETURN, sum, "values", Some(0));
    wire(&mut graph, b, RETURN, sum, "values", Some(1));

    graph.remove_node(b).unwrap();
    assert!(graph.node(b).is_none());
    assert_eq!(graph.connections().len(), 1);
    assert_eq!(graph.variadic_slots(sum, "values").len(), 2);
    assert_eq!(graph.next_node_id(), b);
}

#[test]
fn redefinition_keeps_matching_ports() {
    let build = |inputs: &[&str]| {
        let mut builder = ActionDefine::method("Pair");
        for input in inputs {
            builder = builder.input(input, ValueType::Int);
        }
        Arc::new(builder.body(|_| Ok(())).build().unwrap())
    };

    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let pair = graph.add_action(build(&["left"])).unwrap();
    wire(&mut graph, a, RETURN, pair, "left", None);
    let left = graph.input_port(pair, "left", None).unwrap();

    assert_eq!(graph.redefine(build(&["left", "right"])).unwrap(), 1);
    assert_eq!(graph.input_port(pair, "left", None), Some(left));
    assert!(graph.input_port(pair, "right", None).is_some());
    assert_eq!(graph.connections().len(), 1);

    graph.redefine(build(&["right"])).unwrap();
    assert!(graph.input_port(pair, "left", None).is_none());
    assert!(graph.connections().is_empty());
    assert!(graph.port(left).is_none());
}

#[test]
fn consts_and_defaults_are_validated_against_the_define() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();

    assert!(graph.set_const(compare, "operator", Value::from("<")).is_ok());
    assert!(matches!(
        graph.set_const(compare, "missing", Value::Int(1)),
        Err(GraphError::UnknownPort { .. })
    ));
    assert!(
        graph
            .set_input_default(compare, SlotKey::variadic("left", 0), Value::Int(1))
            .is_err()
    );
    assert!(
        graph
            .set_input_default(compare, SlotKey::single("left"), Value::Int(1))
            .is_ok()
    );
}

#[test]
fn signature_graphs_start_wired() {
    let signature = DefineSignature::new("Inner").input("amount", ValueType::Int);
    let graph = ActionGraph::with_signature(signature).unwrap();
    let entry = graph.entry_node().unwrap();
    let ret = graph.return_node().unwrap();

    let exit = graph.output_port(entry, EXIT).unwrap();
    assert_eq!(graph.next_control(exit), graph.control_input(ret));
    assert!(graph.output_port(entry, "amount").is_some());

    let mut graph = graph;
    assert!(matches!(
        graph.add_node(NodeKind::Entry),
        Err(GraphError::PseudoNodeCount { kind: "Entry", .. })
    ));
}

#[test]
fn ports_from_another_graph_are_rejected() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    add_integer(&mut graph, &catalog, 1);
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();
    let left = graph.input_port(compare, "left", None).unwrap();

    let mut other = ActionGraph::new();
    let foreign = add_integer(&mut other, &catalog, 2);
    let foreign_result = other.output_port(foreign, RETURN).unwrap();

    assert!(graph.port(foreign_result).is_none());
    assert!(!graph.can_connect(foreign_result, left));
    assert_eq!(
        graph.connect(foreign_result, left),
        Err(GraphError::PortNotFound(foreign_result))
    );
    assert!(graph.connections().is_empty());
    assert_eq!(graph.value_source(left), None);
}

#[test]
fn clones_allocate_their_own_port_ids() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let a = add_integer(&mut graph, &catalog, 1);
    let compare = graph.add_action(define(&catalog, "Compare")).unwrap();
    wire(&mut graph, a, RETURN, compare, "left", None);

    let copy = graph.clone();
    let original_left = graph.input_port(compare, "left", None).unwrap();
    let copied_left = copy.input_port(compare, "left", None).unwrap();
    assert_ne!(original_left, copied_left);
    assert!(copy.port(original_left).is_none());
    assert_eq!(copy.value_source(copied_left), copy.output_port(a, RETURN));
}

#[test]
fn variadic_slot_indices_are_bounded() {
    let catalog = builtins();
    let mut graph = ActionGraph::new();
    let sum = graph.add_action(define(&catalog, "IntegerOperation")).unwrap();

    for index in [MAX_VARIADIC_SLOTS, usize::MAX] {
        let err = graph
            .set_input_default(sum, SlotKey::variadic("values", index), Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, GraphError::SlotOutOfRange { index: i, .. } if i == index));
    }
    assert_eq!(graph.variadic_slots(sum, "values").len(), 1);

    graph
        .set_input_default(
            sum,
            SlotKey::variadic("values", MAX_VARIADIC_SLOTS - 1),
            Value::Int(1),
        )
        .unwrap();
    assert_eq!(graph.variadic_slots(sum, "values").len(), MAX_VARIADIC_SLOTS);
}

#[test]
fn redefinition_drops_stale_consts_and_defaults() {
    let scale = |with_factor: bool| {
        let mut builder = ActionDefine::method("Scale").input("value", ValueType::Int);
        if with_factor {
            builder = builder
                .constant("factor", ValueType::Int)
                .input("offset", ValueType::Int);
        }
        Arc::new(builder.body(|_| Ok(())).build().unwrap())
    };

    let mut graph = ActionGraph::new();
    let node = graph.add_action(scale(true)).unwrap();
    graph.set_const(node, "factor", Value::Int(3)).unwrap();
    graph
        .set_input_default(node, SlotKey::single("offset"), Value::Int(1))
        .unwrap();
    graph
        .set_input_default(node, SlotKey::single("value"), Value::Int(2))
        .unwrap();

    let current = scale(false);
    graph.redefine(Arc::clone(&current)).unwrap();
    let rebuilt_node = graph.node(node).unwrap();
    assert!(rebuilt_node.consts().is_empty());
    assert_eq!(rebuilt_node.input_defaults().len(), 1);

    let mut catalog = DefineCatalog::new();
    catalog.register_shared(current);
    let snapshot = SerializableGraph::from_graph(&graph);
    let rebuilt = snapshot.build(&catalog, None).unwrap();
    assert_eq!(SerializableGraph::from_graph(&rebuilt), snapshot);
    assert_eq!(
        rebuilt
            .node(node)
            .and_then(|n| n.input_default(&SlotKey::single("value")))
            .cloned(),
        Some(Value::Int(2))
    );
}
