use crate::model::Graph;
use nnir_data::prelude::*;
use std::fmt;

/// The kinds of attribute a schema can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Float,
    Int,
    String,
    Tensor,
    Graph,
    Floats,
    Ints,
    Strings,
    Tensors,
    Graphs,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AttributeKind::Float => "FLOAT",
            AttributeKind::Int => "INT",
            AttributeKind::String => "STRING",
            AttributeKind::Tensor => "TENSOR",
            AttributeKind::Graph => "GRAPH",
            AttributeKind::Floats => "FLOATS",
            AttributeKind::Ints => "INTS",
            AttributeKind::Strings => "STRINGS",
            AttributeKind::Tensors => "TENSORS",
            AttributeKind::Graphs => "GRAPHS",
        };
        write!(fmt, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(TensorLiteral),
    Graph(Box<Graph>),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Tensors(Vec<TensorLiteral>),
    Graphs(Vec<Graph>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::Int(_) => AttributeKind::Int,
            AttributeValue::String(_) => AttributeKind::String,
            AttributeValue::Tensor(_) => AttributeKind::Tensor,
            AttributeValue::Graph(_) => AttributeKind::Graph,
            AttributeValue::Floats(_) => AttributeKind::Floats,
            AttributeValue::Ints(_) => AttributeKind::Ints,
            AttributeValue::Strings(_) => AttributeKind::Strings,
            AttributeValue::Tensors(_) => AttributeKind::Tensors,
            AttributeValue::Graphs(_) => AttributeKind::Graphs,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let AttributeValue::Int(i) = self { Some(*i) } else { None }
    }

    pub fn as_float(&self) -> Option<f32> {
        if let AttributeValue::Float(f) = self { Some(*f) } else { None }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self { Some(s) } else { None }
    }

    pub fn as_tensor(&self) -> Option<&TensorLiteral> {
        if let AttributeValue::Tensor(t) = self { Some(t) } else { None }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        if let AttributeValue::Ints(v) = self { Some(v) } else { None }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        if let AttributeValue::Floats(v) = self { Some(v) } else { None }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        if let AttributeValue::Strings(v) = self { Some(v) } else { None }
    }

    /// Graphs nested in this attribute, if any.
    pub fn subgraphs(&self) -> Vec<&Graph> {
        match self {
            AttributeValue::Graph(g) => vec![g.as_ref()],
            AttributeValue::Graphs(gs) => gs.iter().collect(),
            _ => vec![],
        }
    }

    pub(crate) fn subgraphs_mut(&mut self) -> Vec<&mut Graph> {
        match self {
            AttributeValue::Graph(g) => vec![g.as_mut()],
            AttributeValue::Graphs(gs) => gs.iter_mut().collect(),
            _ => vec![],
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> AttributeValue {
        AttributeValue::Int(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> AttributeValue {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> AttributeValue {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> AttributeValue {
        AttributeValue::String(v)
    }
}

impl From<TensorLiteral> for AttributeValue {
    fn from(v: TensorLiteral) -> AttributeValue {
        AttributeValue::Tensor(v)
    }
}

impl From<Graph> for AttributeValue {
    fn from(v: Graph) -> AttributeValue {
        AttributeValue::Graph(Box::new(v))
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(v: Vec<i64>) -> AttributeValue {
        AttributeValue::Ints(v)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(v: Vec<f32>) -> AttributeValue {
        AttributeValue::Floats(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> AttributeValue {
        AttributeValue::Strings(v)
    }
}
