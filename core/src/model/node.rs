use crate::model::AttributeValue;
use nnir_data::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node in its graph. Stays valid across removals of other nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// Index of a value in its graph's value table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

/// A named edge endpoint, with an optional type.
///
/// Producer and consumers of an edge refer to the same value record, by name
/// when the graph is built and by `ValueId` afterwards.
#[derive(Clone, Debug, PartialEq, new)]
pub struct ValueInfo {
    pub name: String,
    pub ty: Option<TypeDescriptor>,
}

impl ValueInfo {
    pub fn typed(name: impl Into<String>, ty: TypeDescriptor) -> ValueInfo {
        ValueInfo::new(name.into(), Some(ty))
    }

    pub fn untyped(name: impl Into<String>) -> ValueInfo {
        ValueInfo::new(name.into(), None)
    }

    /// An empty name marks an omitted optional argument.
    pub fn is_absent(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) op_type: String,
    pub(crate) domain: String,
    pub(crate) description: String,
    pub(crate) inputs: TVec<ValueId>,
    pub(crate) outputs: TVec<ValueId>,
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} {} ({})", self.id, self.name, self.op_type)
    }
}
