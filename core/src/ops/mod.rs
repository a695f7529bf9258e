//! Operator signatures: the schema type, the process-wide registry, and
//! the builtin operator set.
mod builtin;
mod ml;
pub mod registry;
pub mod schema;

pub use self::registry::register_builtin_ops;
pub use self::schema::{FormalOption, OpSchema};

/// The default operator domain.
pub const ONNX_DOMAIN: &str = "";
/// Traditional machine-learning operators.
pub const ML_DOMAIN: &str = "ai.onnx.ml";
pub const MS_DOMAIN: &str = "com.microsoft";

/// `ai.onnx` is another name for the default domain.
pub fn canonical_domain(domain: &str) -> &str {
    if domain == "ai.onnx" { ONNX_DOMAIN } else { domain }
}
