//! Standard tensor operators of the default domain, plus the `com.microsoft`
//! extensions.
use crate::model::AttributeKind;
use crate::ops::{MS_DOMAIN, OpSchema};

const FLOATS: &[&str] = &["tensor(float16)", "tensor(float)", "tensor(double)"];

const NUMBERS: &[&str] = &[
    "tensor(float16)",
    "tensor(float)",
    "tensor(double)",
    "tensor(int32)",
    "tensor(int64)",
    "tensor(uint32)",
    "tensor(uint64)",
];

const ALL_TENSORS: &[&str] = &[
    "tensor(bool)",
    "tensor(uint8)",
    "tensor(uint16)",
    "tensor(uint32)",
    "tensor(uint64)",
    "tensor(int8)",
    "tensor(int16)",
    "tensor(int32)",
    "tensor(int64)",
    "tensor(float16)",
    "tensor(float)",
    "tensor(double)",
    "tensor(string)",
];

fn unary(name: &str, doc: &str, types: &[&str]) -> OpSchema {
    OpSchema::new(name)
        .doc(doc)
        .input("X", "T", "Input tensor.")
        .output("Y", "T", "Output tensor, same type as the input.")
        .type_constraint("T", types, "Input and output types.")
}

fn binary(name: &str, doc: &str) -> OpSchema {
    OpSchema::new(name)
        .doc(doc)
        .input("A", "T", "First operand.")
        .input("B", "T", "Second operand.")
        .output("C", "T", "Result, same type as the operands.")
        .attr_with_default("broadcast", "Pass 1 to enable broadcasting of B.", 0i64)
        .attr("axis", "Broadcast axis for B.", AttributeKind::Int)
        .type_constraint("T", NUMBERS, "Numeric tensors.")
}

fn variadic(name: &str, doc: &str) -> OpSchema {
    OpSchema::new(name)
        .doc(doc)
        .variadic_input("data_0", "T", "Operands, all of the same type.")
        .output(&name.to_lowercase(), "T", "Result.")
        .type_constraint("T", FLOATS, "Float tensors.")
}

/// The schemas `register_builtin_ops` publishes.
pub(super) fn schemas() -> Vec<OpSchema> {
    vec![
        unary("Identity", "Forwards its input.", ALL_TENSORS),
        binary("Add", "Elementwise addition."),
        binary("Sub", "Elementwise subtraction."),
        binary("Mul", "Elementwise multiplication."),
        binary("Div", "Elementwise division."),
        variadic("Max", "Elementwise maximum of its inputs."),
        variadic("Min", "Elementwise minimum of its inputs."),
        variadic("Sum", "Elementwise sum of its inputs."),
        unary("Relu", "max(0, x), elementwise.", FLOATS),
        unary("Sigmoid", "1 / (1 + exp(-x)), elementwise.", FLOATS),
        unary("Tanh", "Hyperbolic tangent, elementwise.", FLOATS),

        OpSchema::new("MatMul")
            .doc("Matrix product with numpy semantics.")
            .input("A", "T", "N-dimensional matrix A.")
            .input("B", "T", "N-dimensional matrix B.")
            .output("Y", "T", "Matrix product of A and B.")
            .type_constraint("T", FLOATS, "Float tensors."),

        OpSchema::new("Constant")
            .doc("Produces the tensor held by its value attribute.")
            .required_attr("value", "The constant tensor.", AttributeKind::Tensor)
            .output("output", "T", "The constant.")
            .type_constraint("T", ALL_TENSORS, "Any tensor type."),

        OpSchema::new("Cast")
            .doc("Converts the elements of a tensor to another element kind.")
            .required_attr("to", "Target element kind, e.g. float.", AttributeKind::String)
            .input("input", "T1", "Input tensor.")
            .output("output", "T2", "Converted tensor.")
            .type_constraint("T1", NUMBERS, "Input types.")
            .type_constraint("T2", NUMBERS, "Output types.")
            .type_from_attr("T2", "to"),

        OpSchema::new("Affine")
            .doc("alpha * x + beta, elementwise.")
            .input("X", "T", "Input tensor.")
            .output("Y", "T", "Output tensor.")
            .attr_with_default("alpha", "Scale.", 1.0f32)
            .attr_with_default("beta", "Offset.", 0.0f32)
            .type_constraint("T", FLOATS, "Float tensors."),

        OpSchema::new("Embedding")
            .domain(MS_DOMAIN)
            .doc("Looks rows of W up by index.")
            .input("input", "tensor(uint64)", "Indices.")
            .input("W", "T", "Embedding table of shape [input_dim, output_dim].")
            .output("output", "T", "Gathered rows.")
            .required_attr("input_dim", "Size of the vocabulary.", AttributeKind::Int)
            .required_attr("output_dim", "Dimension of an embedding.", AttributeKind::Int)
            .type_constraint("T", FLOATS, "Float tensors."),
    ]
}
