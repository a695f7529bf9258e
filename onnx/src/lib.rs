//! # nnir-onnx
//!
//! Reads and writes nnir models in the ONNX protobuf format.
//!
//! ```no_run
//! let model = nnir_onnx::Model::load("model.onnx").unwrap();
//! let mut graph = model.into_graph();
//! graph.resolve().unwrap();
//! ```
#[macro_use]
extern crate log;

pub mod model;
pub mod pb_helpers;
pub mod tensor;

pub mod pb {
    include!("prost/onnx.rs");
}

pub use self::model::{Model, for_path, for_reader};
pub use nnir_core;
