//! Error kinds surfaced by graph construction, resolution and serialization.
use crate::model::{AttributeKind, NodeId};
use std::fmt;
use thiserror::Error;

/// Which side of a node an arity error is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Inputs,
    Outputs,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgKind::Inputs => write!(fmt, "inputs"),
            ArgKind::Outputs => write!(fmt, "outputs"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Error: two nodes with same node name ({0}).")]
    DuplicateNodeName(String),

    #[error("Error: two output args with same name ({0}).")]
    DuplicateOutputArg(String),

    #[error(
        "Error: the operator or function ({op_type}) referred to by node ({node}) does not exist."
    )]
    UnknownOperator { op_type: String, node: String, domain: String },

    #[error("Error: node ({node}) has {actual} {which}, its operator expects {expected}.")]
    ArityMismatch { node: String, expected: String, actual: usize, which: ArgKind },

    #[error("Error: node ({node}) is missing required attribute ({attribute}).")]
    MissingRequiredAttribute { node: String, attribute: String },

    #[error("Error: attribute ({attribute}) of node ({node}) is {actual}, expected {expected}.")]
    AttributeKindMismatch {
        node: String,
        attribute: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },

    #[error("Error: node ({node}) has unknown attribute ({attribute}).")]
    UnknownAttribute { node: String, attribute: String },

    #[error("Error: input ({value}) of node ({node}) is neither a graph input nor produced by a node.")]
    DanglingInput { value: String, node: String },

    /// Carries the node names along one cycle, in traversal order.
    #[error("Error: the graph is not acyclic.")]
    GraphNotAcyclic { cycle: Vec<String> },

    #[error(
        "Node ({node}) has different input types ({}) matching to same type string ({type_var}).",
        .observed.join(",")
    )]
    TypeMismatch { node: String, observed: Vec<String>, type_var: String },

    #[error(
        "Error: type ({observed}) bound to ({type_var}) in node ({node}) is not one of ({}).",
        .allowed.join(",")
    )]
    TypeConstraintViolation { node: String, type_var: String, observed: String, allowed: Vec<String> },

    #[error("Error: the type of ({value}) in node ({node}) cannot be inferred.")]
    UntypedValue { value: String, node: String },

    #[error("Error: invalid type string: {0}")]
    InvalidTypeString(String),

    #[error("Error: schema registration failed: {0}")]
    SchemaRegistration(String),

    #[error("Error: initializer ({name}) is invalid: {detail}")]
    InvalidInitializer { name: String, detail: String },

    #[error("Error: node {0} does not exist.")]
    NoSuchNode(NodeId),

    #[error("Error: node ({node}) has no slot {slot}.")]
    NoSuchSlot { node: String, slot: usize },

    #[error("Error: serialization failed: {0}")]
    SerializationError(String),

    #[error("Error: I/O failure: {0}")]
    IoError(String),
}

impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        GraphError::IoError(err.to_string())
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
