//! Define construction tests: parameter roles, validation and the standard catalog.
mod common;
use actiongraph::define::{MethodParam, method::EVENT_TYPE};
use actiongraph::prelude::*;
use common::*;
use std::sync::Arc;

fn noop(_: &mut MethodCall<'_>) -> std::result::Result<(), ActionError> {
    Ok(())
}

#[test]
fn parameter_roles_shape_the_node() {
    let define = ActionDefine::method("Deal")
        .param("game", ValueType::object("Game"))
        .param("card", ValueType::Card)
        .input("amount", ValueType::Int)
        .constant("element", ValueType::String)
        .out("dealt", ValueType::Int)
        .branch("killed")
        .returns(ValueType::Bool)
        .body(noop)
        .build()
        .unwrap();

    assert_eq!(define.inputs().len(), 1);
    assert_eq!(define.consts().len(), 1);
    let outputs: Vec<&str> = define.outputs().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(outputs, vec!["dealt", "killed", RETURN]);
    let MethodParam::Ambient { ambient, .. } = &method_params(&define)[1] else {
        panic!("card should bind to the environment");
    };
    assert_eq!(*ambient, Ambient::Card);

    let mut graph = ActionGraph::new();
    let node = graph.add_action(Arc::new(define)).unwrap();
    let node = graph.node(node).unwrap();
    let names: Vec<String> = node
        .ports()
        .filter_map(|id| graph.port(id))
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec![ENTER, "amount", EXIT, "dealt", "killed", RETURN]);
}

fn method_params(define: &ActionDefine) -> &[MethodParam] {
    match define.body() {
        actiongraph::define::DefineBody::Method(method) => method.params(),
        actiongraph::define::DefineBody::Generated(_) => &[],
    }
}

#[test]
fn explicit_roles_override_ambient_inference() {
    let define = ActionDefine::method("Target")
        .input("target", ValueType::Card)
        .body(noop)
        .build()
        .unwrap();
    assert_eq!(define.inputs()[0].value_type, ValueType::Card);
    assert_eq!(
        Ambient::for_type(&ValueType::object(EVENT_TYPE)),
        Some(Ambient::Event)
    );
    assert_eq!(Ambient::for_type(&ValueType::Player), None);
}

#[test]
fn duplicate_and_reserved_names_are_rejected() {
    let err = ActionDefine::method("Twice")
        .input("value", ValueType::Int)
        .constant("value", ValueType::Int)
        .body(noop)
        .build()
        .unwrap_err();
    assert!(matches!(err, DefineError::DuplicateParameter { param, .. } if param == "value"));

    let err = ActionDefine::method("Reserved")
        .branch(EXIT)
        .body(noop)
        .build()
        .unwrap_err();
    assert!(matches!(err, DefineError::DuplicateParameter { .. }));
}

#[test]
fn variadic_parameters_must_come_last() {
    let err = ActionDefine::method("Spread")
        .variadic_input("values", ValueType::Int)
        .input("scale", ValueType::Int)
        .body(noop)
        .build()
        .unwrap_err();
    assert!(matches!(err, DefineError::VariadicNotLast { param, .. } if param == "values"));
}

#[test]
fn bodies_are_required() {
    let err = ActionDefine::method("Empty").build().unwrap_err();
    assert_eq!(
        err,
        DefineError::MissingBody {
            define: "Empty".to_string()
        }
    );
}

#[test]
fn generated_entry_packs_variadic_inputs() {
    let signature = DefineSignature::new("Total")
        .variadic_input("values", ValueType::Int)
        .constant("scale", ValueType::Int)
        .output("total", ValueType::Int);
    let define = ActionDefine::generated(signature, ActionGraph::new()).unwrap();
    let inner = define.graph().unwrap();
    let entry = inner.entry_node().unwrap();

    let values = inner.output_port(entry, "values").unwrap();
    assert_eq!(
        inner.port(values).map(|p| p.value_type().clone()),
        Some(ValueType::array_of(ValueType::Int))
    );
    assert!(inner.output_port(entry, "scale").is_some());
    let ret = inner.return_node().unwrap();
    assert!(inner.input_port(ret, "total", None).is_some());
}

#[test]
fn generated_variadic_inputs_arrive_as_arrays() {
    let catalog = builtins();
    let signature = DefineSignature::new("Sum")
        .variadic_input("values", ValueType::Int)
        .output("total", ValueType::Int);
    let mut inner = ActionGraph::with_signature(signature.clone()).unwrap();
    let entry = inner.entry_node().unwrap();
    let ret = inner.return_node().unwrap();
    let sum = inner.add_action(define(&catalog, "IntegerOperation")).unwrap();
    wire(&mut inner, entry, "values", sum, "values", Some(0));
    wire(&mut inner, sum, RETURN, ret, "total", None);
    let total = Arc::new(ActionDefine::generated(signature, inner).unwrap());

    let mut graph = ActionGraph::new();
    let node = graph.add_action(total).unwrap();
    graph
        .set_input_default(node, SlotKey::variadic("values", 0), Value::Int(4))
        .unwrap();
    let flow = run_node(Arc::new(graph), node).unwrap();
    // The packed array unwraps to its first element at the scalar slot.
    assert_eq!(output(&flow, node, "total"), Some(Value::Int(4)));
}

#[test]
fn builtins_are_registered() {
    let catalog = builtins();
    for name in [
        "Integer",
        "IntegerOperation",
        "Compare",
        "Text",
        "Concat",
        "Branch",
        "Delay",
        "GetCard",
        "GetBuff",
        "GetEvent",
        "Log",
    ] {
        assert!(catalog.contains(name), "missing builtin {}", name);
    }
    assert_eq!(catalog.len(), 11);
}
