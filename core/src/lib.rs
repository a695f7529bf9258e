//! # nnir-core
//!
//! The graph intermediate representation of a neural-network model, the
//! process-wide operator schema registry, and the resolver turning a graph
//! under construction into a validated, typed, topologically ordered one.
//!
//! ## Example
//!
//! ```
//! use nnir_core::prelude::*;
//!
//! let float = TypeDescriptor::tensor(ElementKind::F32);
//! let mut graph = Graph::new("graph_1");
//! graph.add_node(
//!     "relu",
//!     "Relu",
//!     "",
//!     &[ValueInfo::typed("x", float.clone())],
//!     &[ValueInfo::untyped("y")],
//! );
//! graph.resolve().unwrap();
//!
//! assert_eq!(graph.value_by_name("y").unwrap().ty, Some(float));
//! assert_eq!(graph.inputs()[0].name, "x");
//! assert_eq!(graph.outputs()[0].name, "y");
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub mod errors;
pub mod model;
pub mod ops;

pub use nnir_data;

pub mod prelude {
    pub use crate::errors::{ArgKind, GraphError, GraphResult};
    pub use crate::model::{
        AttributeKind, AttributeValue, Graph, Node, NodeId, ResolveOptions, ValueId, ValueInfo,
    };
    pub use crate::ops::{
        FormalOption, ML_DOMAIN, MS_DOMAIN, ONNX_DOMAIN, OpSchema, register_builtin_ops,
    };
    pub use nnir_data::prelude::*;
}

pub mod internal {
    pub use crate::model::{SINK_NODE_NAME, SOURCE_NODE_NAME};
    pub use crate::ops::registry::{self, SchemaRegistry};
    pub use crate::ops::schema::{AttrDecl, FormalParameter, TypeConstraint};
    pub use crate::prelude::*;
    pub use nnir_data::internal::*;
    pub use std::collections::{BTreeMap, BTreeSet};
    pub use std::sync::Arc;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("NNIR_LOG").try_init();
}
