//! Element kinds, type descriptors and tensor literals.
//!
//! This crate is the "type registry" of the graph IR: it knows the closed
//! set of element kinds, the structural shape of value types, and their
//! canonical textual form (the type strings operator schemas are written
//! with).

#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used for shapes and node input/output lists.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub mod prelude {
    pub use crate::datum::ElementKind;
    pub use crate::dim::{Dim, Shape};
    pub use crate::tensor::{TensorData, TensorLiteral};
    pub use crate::tvec;
    pub use crate::types::{MapType, TensorType, TypeDescriptor};
    pub use crate::TVec;
}

pub mod internal {
    pub use crate::prelude::*;
    pub use crate::types::{canonicalize_type_string, parse_type_string};
    pub use smallvec as nnir_smallvec;
}

pub use anyhow;
pub use half;

mod datum;
mod dim;
mod tensor;
mod types;
