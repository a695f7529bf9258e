//! Tensor dimensions, concrete or symbolic.
use crate::TVec;
use itertools::Itertools;
use std::fmt;

/// A single tensor dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    /// A concrete extent.
    Value(i64),
    /// A named symbolic extent, e.g. `batch`.
    Param(String),
    /// An anonymous unknown extent (`?`).
    Unknown,
}

impl Dim {
    pub fn is_concrete(&self) -> bool {
        matches!(self, Dim::Value(_))
    }

    /// Symbolic and unknown dims unify with anything, concrete dims only
    /// with the same value.
    pub fn unifies_with(&self, other: &Dim) -> bool {
        match (self, other) {
            (Dim::Value(a), Dim::Value(b)) => a == b,
            _ => true,
        }
    }
}

impl From<i64> for Dim {
    fn from(v: i64) -> Dim {
        Dim::Value(v)
    }
}

impl From<usize> for Dim {
    fn from(v: usize) -> Dim {
        Dim::Value(v as i64)
    }
}

impl From<&str> for Dim {
    fn from(s: &str) -> Dim {
        if s == "?" { Dim::Unknown } else { Dim::Param(s.to_string()) }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dim::Value(v) => write!(fmt, "{v}"),
            Dim::Param(p) => write!(fmt, "{p}"),
            Dim::Unknown => write!(fmt, "?"),
        }
    }
}

/// An ordered sequence of dimensions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape(pub TVec<Dim>);

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = impl Into<Dim>>) -> Shape {
        Shape(dims.into_iter().map(|d| d.into()).collect())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[Dim] {
        &self.0
    }

    /// Same rank, and every pair of dims unifies.
    pub fn unifies_with(&self, other: &Shape) -> bool {
        self.rank() == other.rank() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.unifies_with(b))
    }

    /// Element count when every dim is concrete and the product fits.
    pub fn volume(&self) -> Option<i64> {
        self.0.iter().try_fold(1i64, |acc, d| match d {
            Dim::Value(v) => acc.checked_mul(*v),
            _ => None,
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "[{}]", self.0.iter().join(","))
    }
}
