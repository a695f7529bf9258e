use maplit::btreemap;
use nnir_core::internal::*;
use std::sync::Once;

fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("NNIR_LOG").try_init();
}

static SCHEMAS: Once = Once::new();

fn register_test_schemas() {
    SCHEMAS.call_once(|| {
        for (variable, add, noop) in
            [("Variable_DFS", "Add_DFS", "NoOp_DFS"), ("Variable_Fake", "Add_Fake", "NoOp_Fake")]
        {
            OpSchema::new(variable)
                .doc("Input variable.")
                .input("input_1", "tensor(int32)", "docstr for input_1.")
                .output("output_1", "tensor(int32)", "docstr for output_1.")
                .register()
                .unwrap();
            OpSchema::new(add)
                .doc("Add two integers.")
                .input("input_1", "tensor(int32)", "docstr for input_1.")
                .input("input_2", "tensor(int32)", "docstr for input_2.")
                .output("output_1", "tensor(int32)", "docstr for output_1.")
                .register()
                .unwrap();
            OpSchema::new(noop)
                .doc("Operator doing nothing.")
                .input("input_1", "tensor(int32)", "docstr for input_1.")
                .output("output_1", "tensor(int32)", "docstr for output_1.")
                .register()
                .unwrap();
        }
        OpSchema::new("Variable2_Fake")
            .doc("Input variable.")
            .input("input_1", "T", "docstr for input_1.")
            .output("output_1", "T", "docstr for output_1.")
            .type_constraint("T", &["tensor(int32)", "tensor(float)"], "input/output types")
            .register()
            .unwrap();
        OpSchema::new("Max_Fake")
            .doc("Add two integers.")
            .input("input_1", "T", "docstr for input_1.")
            .input("input_2", "T", "docstr for input_2.")
            .input("input_3", "T", "docstr for input_3.")
            .output("output_1", "T", "docstr for output_1.")
            .type_constraint("T", &["tensor(int32)", "tensor(float)"], "input/output types")
            .register()
            .unwrap();
        OpSchema::new("Split_Fake")
            .doc("Two outputs of the same type.")
            .output("output_1", "T", "docstr for output_1.")
            .output("output_2", "T", "docstr for output_2.")
            .type_constraint("T", &["tensor(int32)", "tensor(float)"], "output types")
            .register()
            .unwrap();
        OpSchema::new("__Constant")
            .doc("Constant Op.")
            .attr("value", "constant value", AttributeKind::Tensor)
            .output("output_1", "tensor(int64)", "docstr for output_1.")
            .register()
            .unwrap();
    });
}

fn int32_vector() -> TypeDescriptor {
    TypeDescriptor::tensor_with_shape(ElementKind::I32, Shape::new([1i64]))
}

fn arg(name: &str) -> ValueInfo {
    ValueInfo::typed(name, int32_vector())
}

/// Source feeds node_1 and node_2, both feed node_3, node_3 feeds node_4,
/// node_4 feeds Sink.
fn diamond(prefix: &str) -> (Graph, NodeId) {
    let mut graph = Graph::new("graph_1");
    let variable = format!("Variable_{prefix}");
    let node_1 = graph.add_node("node_1", &variable, "node 1", &[arg("node_1_in_1")], &[arg("node_1_out_1")]);
    graph.add_node("node_2", &variable, "node 2", &[arg("node_2_in_1")], &[arg("node_2_out_1")]);
    graph.add_node(
        "node_3",
        format!("Add_{prefix}"),
        "node 3",
        &[arg("node_1_out_1"), arg("node_2_out_1")],
        &[arg("node_3_out_1")],
    );
    graph.add_node("node_4", format!("NoOp_{prefix}"), "node 4", &[arg("node_3_out_1")], &[arg("node_4_out_1")]);
    (graph, node_1)
}

#[test]
fn reverse_dfs() {
    setup_test_logger();
    register_test_schemas();
    let (mut graph, _) = diamond("DFS");
    graph.resolve().unwrap();

    let sequence = std::cell::RefCell::new(vec![]);
    graph
        .reverse_dfs_from(
            &[graph.sink_node()],
            |n| sequence.borrow_mut().push(format!("enter:{}", n.name())),
            |n| sequence.borrow_mut().push(format!("leave:{}", n.name())),
            |a, b| a.name().cmp(b.name()),
        )
        .unwrap();
    assert_eq!(
        sequence.into_inner(),
        vec![
            "enter:_Graph_Sink",
            "enter:node_4",
            "enter:node_3",
            "enter:node_2",
            "enter:_Graph_Source",
            "leave:_Graph_Source",
            "leave:node_2",
            "enter:node_1",
            "leave:node_1",
            "leave:node_3",
            "leave:node_4",
            "leave:_Graph_Sink",
        ]
    );
}

#[test]
fn duplicate_node_name() {
    let mut graph = Graph::new("graph_1");
    assert_eq!(graph.name(), "graph_1");
    let outputs = [arg("node_1_out_1")];
    graph.add_node("node_1", "Variable", "node 1.", &[], &outputs);
    let duplicate = graph.add_node("node_1", "Variable", "node 2", &[], &outputs);
    let err = graph.resolve().unwrap_err();
    assert_eq!(err.to_string(), "Error: two nodes with same node name (node_1).");

    graph.remove_node(duplicate).unwrap();
    graph.add_node("node_2", "Variable", "node 2", &[], &outputs);
    let err = graph.resolve().unwrap_err();
    assert_eq!(err.to_string(), "Error: two output args with same name (node_1_out_1).");
}

#[test]
fn unknown_operator() {
    let mut graph = Graph::new("graph_1");
    graph.add_node("node_1", "OpNotExist", "node 1", &[], &[arg("node_1_out_1")]);
    let err = graph.resolve().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error: the operator or function (OpNotExist) referred to by node (node_1) does not exist."
    );
}

#[test]
fn cycle_is_rejected_and_graph_kept() {
    register_test_schemas();
    let (mut graph, node_1) = diamond("Fake");
    graph.resolve().unwrap();
    let order: Vec<_> = graph.topological_nodes().map(|n| n.name().to_string()).collect();
    assert_eq!(order, vec!["node_2", "node_1", "node_3", "node_4"]);

    graph.set_node_input(node_1, 0, &arg("node_4_out_1")).unwrap();
    let before = graph.clone();
    let err = graph.resolve().unwrap_err();
    assert_eq!(err.to_string(), "Error: the graph is not acyclic.");
    let GraphError::GraphNotAcyclic { cycle } = err else { panic!() };
    assert_eq!(cycle.len(), 3);
    assert_eq!(graph, before);
}

#[test]
fn standalone_initializer() {
    let mut graph = Graph::new("graph_1");
    graph.add_initialized_tensor(TensorLiteral::from_strings("node_1_in_2", &[1], &["test"]));
    graph.resolve().unwrap();
    assert!(graph.inputs().is_empty());
    assert_eq!(graph.initializers().count(), 1);
}

#[test]
fn type_inference() {
    setup_test_logger();
    register_test_schemas();
    let mut graph = Graph::new("graph_1");
    graph.add_node("node_1", "Variable2_Fake", "node 1", &[arg("node_1_in_1")], &[arg("node_1_out_1")]);
    let node_2 =
        graph.add_node("node_2", "Variable2_Fake", "node 2", &[arg("node_1_in_1")], &[arg("node_2_out_1")]);
    graph.add_node("node_3", "Variable2_Fake", "node 3", &[arg("node_3_in_1")], &[arg("node_3_out_1")]);
    graph.add_node(
        "node_4",
        "Max_Fake",
        "node 4",
        &[arg("node_1_out_1"), arg("node_2_out_1"), arg("node_3_out_1")],
        &[arg("node_4_out_1")],
    );
    graph.resolve().unwrap();

    let inputs: BTreeSet<_> = graph.inputs().iter().map(|v| v.name.clone()).collect();
    assert_eq!(inputs, ["node_1_in_1".to_string(), "node_3_in_1".to_string()].into_iter().collect());
    let outputs: Vec<_> = graph.outputs().iter().map(|v| v.name.clone()).collect();
    assert_eq!(outputs, vec!["node_4_out_1"]);

    let float = TypeDescriptor::tensor(ElementKind::F32);
    let node = graph.node(node_2).unwrap();
    let (input, output) = (node.inputs()[0], node.outputs()[0]);
    graph.set_value_type(input, Some(float.clone()));
    graph.set_value_type(output, Some(float));
    let err = graph.resolve().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Node (node_4) has different input types (tensor(float),tensor(int32)) matching to same type string (T)."
    );
}

#[test]
fn add_tensor_attribute() {
    register_test_schemas();
    let mut graph = Graph::new("graph_1");
    let output = ValueInfo::typed(
        "node_1_out_1",
        TypeDescriptor::tensor_with_shape(ElementKind::I64, Shape::new([1i64, 3])),
    );
    let node_1 = graph.add_node("node_1", "__Constant", "node 1.", &[], &[output]);
    graph.add_attribute(node_1, "value", TensorLiteral::from_i64("", &[1, 3], &[1, 2, 3])).unwrap();
    graph.resolve().unwrap();
    let value = graph.node(node_1).unwrap().get_attribute("value").unwrap();
    assert_eq!(value.as_tensor().unwrap().as_i64_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn traditional_ml() {
    let mut graph = Graph::new("traditionalMl");
    let float = TypeDescriptor::tensor(ElementKind::F32);
    graph.add_node_full(
        "node_1",
        "CastMap",
        "node 1",
        &[ValueInfo::typed("node_1_in_1", TypeDescriptor::map(ElementKind::I64, ElementKind::F32))],
        &[ValueInfo::typed("node_1_out_1", float.clone())],
        BTreeMap::new(),
        ML_DOMAIN,
    );
    graph.add_node_full(
        "node_4",
        "FeatureVectorizer",
        "node 4",
        &[ValueInfo::typed("node_1_out_1", float.clone())],
        &[ValueInfo::typed("node_4_out_1", float)],
        BTreeMap::new(),
        ML_DOMAIN,
    );
    graph.resolve().unwrap();
    let names: Vec<_> = graph.topological_nodes().map(|n| n.name()).collect();
    assert_eq!(names, vec!["node_1", "node_4"]);
}

#[test]
fn linear_regressor_and_svm() {
    let mut graph = Graph::new("models");
    let features = ValueInfo::typed("x", TypeDescriptor::tensor(ElementKind::F64));
    graph.add_node_full(
        "regressor",
        "LinearRegressor",
        "",
        &[features.clone()],
        &[ValueInfo::untyped("y")],
        btreemap! {
            "coefficients".to_string() => AttributeValue::Floats(vec![0.5, 1.5]),
            "intercepts".to_string() => AttributeValue::Floats(vec![0.1]),
            "post_transform".to_string() => AttributeValue::from("NONE"),
        },
        ML_DOMAIN,
    );
    graph.add_node_full(
        "svm",
        "SVMClassifier",
        "",
        &[features],
        &[ValueInfo::typed("label", TypeDescriptor::tensor(ElementKind::I64)), ValueInfo::untyped("scores")],
        btreemap! {
            "kernel_type".to_string() => AttributeValue::from("RBF"),
            "kernel_params".to_string() => AttributeValue::Floats(vec![0.1, 0.0, 3.0]),
            "classlabels_ints".to_string() => AttributeValue::Ints(vec![0, 1]),
        },
        ML_DOMAIN,
    );
    graph.resolve().unwrap();
    let float = Some(TypeDescriptor::tensor(ElementKind::F32));
    assert_eq!(graph.value_by_name("y").unwrap().ty, float);
    assert_eq!(graph.value_by_name("scores").unwrap().ty, float);
    let outputs: Vec<_> = graph.outputs().iter().map(|v| v.name.clone()).collect();
    assert_eq!(outputs.len(), 3);
}

#[test]
fn mutation_resets_resolution() {
    register_test_schemas();
    let (mut graph, node_1) = diamond("Fake");
    graph.resolve().unwrap();
    assert!(graph.is_resolved());
    graph.add_attribute(node_1, "unused", 1i64).unwrap();
    assert!(!graph.is_resolved());
    assert!(matches!(graph.resolve(), Err(GraphError::UnknownAttribute { .. })));
}

#[test]
fn output_only_type_variable() {
    register_test_schemas();
    let float = TypeDescriptor::tensor(ElementKind::F32);
    let mut graph = Graph::new("graph_1");
    graph.add_node("split", "Split_Fake", "", &[], &[arg("a"), ValueInfo::untyped("b")]);
    graph.resolve().unwrap();
    assert_eq!(graph.value_by_name("b").unwrap().ty, Some(int32_vector()));

    let b = graph.value_id("b").unwrap();
    graph.set_value_type(b, Some(float));
    let err = graph.resolve().unwrap_err();
    let GraphError::TypeMismatch { node, observed, type_var } = err else { panic!("{err:?}") };
    assert_eq!(node, "split");
    assert_eq!(observed, vec!["tensor(float)", "tensor(int32)"]);
    assert_eq!(type_var, "T");
    assert!(!graph.is_resolved());
}

#[test]
fn cast_output_follows_its_target() {
    let float = TypeDescriptor::tensor(ElementKind::F32);
    let mut graph = Graph::new("graph_1");
    let cast =
        graph.add_node("cast", "Cast", "", &[ValueInfo::typed("x", float.clone())], &[ValueInfo::untyped("y")]);
    graph.add_attribute(cast, "to", "int64").unwrap();
    graph.resolve().unwrap();
    assert_eq!(graph.value_by_name("y").unwrap().ty, Some(TypeDescriptor::tensor(ElementKind::I64)));

    graph.add_attribute(cast, "to", "complex").unwrap();
    let err = graph.resolve().unwrap_err();
    assert!(matches!(err, GraphError::TypeConstraintViolation { ref type_var, .. } if type_var == "T2"), "{err:?}");

    graph.add_attribute(cast, "to", "int32").unwrap();
    let y = graph.value_id("y").unwrap();
    graph.set_value_type(y, Some(float));
    assert!(matches!(graph.resolve(), Err(GraphError::TypeMismatch { .. })));
}

#[test]
fn initializer_dims_overflow() {
    let mut graph = Graph::new("graph_1");
    graph.add_initialized_tensor(TensorLiteral::from_f32("w", &[1 << 32, 1 << 32], &[]));
    graph.add_node("node_1", "Identity", "", &[ValueInfo::untyped("w")], &[ValueInfo::untyped("y")]);
    let err = graph.resolve().unwrap_err();
    let GraphError::InvalidInitializer { name, detail } = err else { panic!("{err:?}") };
    assert_eq!(name, "w");
    assert!(detail.contains("overflows"), "{detail}");
}
