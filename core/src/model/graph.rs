use crate::errors::{GraphError, GraphResult};
use crate::model::{AttributeValue, Node, NodeId, ValueId, ValueInfo};
use crate::ops::{ONNX_DOMAIN, canonical_domain};
use itertools::Either;
use nnir_data::prelude::*;
use std::collections::{BTreeMap, HashMap};

pub const SOURCE_NODE_NAME: &str = "_Graph_Source";
pub const SINK_NODE_NAME: &str = "_Graph_Sink";

const SOURCE: NodeId = NodeId(0);
const SINK: NodeId = NodeId(1);

/// What a successful resolution fixed about the graph.
#[derive(Clone, Debug, PartialEq, Default)]
pub(crate) struct Resolution {
    pub(crate) order: Vec<NodeId>,
    pub(crate) inputs: Vec<ValueId>,
    pub(crate) outputs: Vec<ValueId>,
}

/// A dataflow graph of operator invocations.
///
/// Nodes and values live in two arenas and refer to each other by index.
/// Slot 0 and 1 of the node arena hold the Source and Sink sentinels.
/// Removed nodes leave a tombstone so that other ids stay valid.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    name: String,
    doc_string: String,
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) values: Vec<ValueInfo>,
    value_ids: HashMap<String, ValueId>,
    initializers: BTreeMap<String, TensorLiteral>,
    declared_inputs: Vec<ValueId>,
    declared_outputs: Vec<ValueId>,
    opset: BTreeMap<String, i64>,
    pub(crate) resolution: Option<Resolution>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Graph {
        let sentinel = |id: NodeId, name: &str| Node {
            id,
            name: name.to_string(),
            op_type: String::new(),
            domain: ONNX_DOMAIN.to_string(),
            description: String::new(),
            inputs: tvec!(),
            outputs: tvec!(),
            attributes: BTreeMap::new(),
        };
        Graph {
            name: name.into(),
            doc_string: String::new(),
            nodes: vec![Some(sentinel(SOURCE, SOURCE_NODE_NAME)), Some(sentinel(SINK, SINK_NODE_NAME))],
            values: vec![],
            value_ids: HashMap::new(),
            initializers: BTreeMap::new(),
            declared_inputs: vec![],
            declared_outputs: vec![],
            opset: BTreeMap::new(),
            resolution: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn doc_string(&self) -> &str {
        &self.doc_string
    }

    pub fn set_doc_string(&mut self, doc: impl Into<String>) {
        self.doc_string = doc.into();
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    fn invalidate(&mut self) {
        if self.resolution.take().is_some() {
            trace!("Graph {} needs resolving again", self.name);
        }
    }

    /// Adds a node in the default domain, without attributes.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op_type: impl Into<String>,
        description: impl Into<String>,
        inputs: &[ValueInfo],
        outputs: &[ValueInfo],
    ) -> NodeId {
        self.add_node_full(name, op_type, description, inputs, outputs, BTreeMap::new(), ONNX_DOMAIN)
    }

    /// Adds a node. Nothing is validated until the graph is resolved, not
    /// even name collisions.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node_full(
        &mut self,
        name: impl Into<String>,
        op_type: impl Into<String>,
        description: impl Into<String>,
        inputs: &[ValueInfo],
        outputs: &[ValueInfo],
        attributes: BTreeMap<String, AttributeValue>,
        domain: &str,
    ) -> NodeId {
        self.invalidate();
        let id = NodeId(self.nodes.len());
        let inputs = inputs.iter().map(|v| self.add_value(v)).collect();
        let outputs = outputs.iter().map(|v| self.add_value(v)).collect();
        let node = Node {
            id,
            name: name.into(),
            op_type: op_type.into(),
            domain: canonical_domain(domain).to_string(),
            description: description.into(),
            inputs,
            outputs,
            attributes,
        };
        trace!("Added node {node}");
        self.nodes.push(Some(node));
        id
    }

    /// Tombstones a node. Sentinels can not be removed.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<Node> {
        self.real_node_mut(id)?;
        self.invalidate();
        self.nodes[id.0].take().ok_or(GraphError::NoSuchNode(id))
    }

    /// Interns a value by name. The first definition of a name wins, except
    /// that a type fills in a previously untyped record.
    pub fn add_value(&mut self, value: &ValueInfo) -> ValueId {
        if let Some(&id) = self.value_ids.get(&value.name) {
            let existing = &mut self.values[id.0];
            match (&existing.ty, &value.ty) {
                (None, Some(ty)) => existing.ty = Some(ty.clone()),
                (Some(a), Some(b)) if a != b => {
                    trace!("Value {} keeps type {a}, ignoring {b}", value.name)
                }
                _ => (),
            }
            return id;
        }
        let id = ValueId(self.values.len());
        self.values.push(value.clone());
        self.value_ids.insert(value.name.clone(), id);
        id
    }

    /// Adds or replaces an initializer, keyed by the tensor name.
    pub fn add_initialized_tensor(&mut self, tensor: TensorLiteral) {
        self.invalidate();
        self.initializers.insert(tensor.name.clone(), tensor);
    }

    pub fn initializer(&self, name: &str) -> Option<&TensorLiteral> {
        self.initializers.get(name)
    }

    /// Initializers, by name.
    pub fn initializers(&self) -> impl Iterator<Item = (&str, &TensorLiteral)> {
        self.initializers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Live nodes in id order, sentinels included.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    /// Live nodes in id order, sentinels excluded.
    pub fn real_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| !self.is_sentinel(n.id))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.real_nodes().find(|n| n.name == name)
    }

    pub(crate) fn real_node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        if self.is_sentinel(id) {
            return Err(GraphError::NoSuchNode(id));
        }
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut()).ok_or(GraphError::NoSuchNode(id))
    }

    pub fn source_node(&self) -> NodeId {
        SOURCE
    }

    pub fn sink_node(&self) -> NodeId {
        SINK
    }

    pub fn is_source_node(&self, id: NodeId) -> bool {
        id == SOURCE
    }

    pub fn is_sink_node(&self, id: NodeId) -> bool {
        id == SINK
    }

    pub(crate) fn is_sentinel(&self, id: NodeId) -> bool {
        self.is_source_node(id) || self.is_sink_node(id)
    }

    pub fn value(&self, id: ValueId) -> &ValueInfo {
        &self.values[id.0]
    }

    pub fn value_id(&self, name: &str) -> Option<ValueId> {
        self.value_ids.get(name).copied()
    }

    pub fn value_by_name(&self, name: &str) -> Option<&ValueInfo> {
        self.value_id(name).map(|id| self.value(id))
    }

    /// Every value record, in creation order.
    pub fn values(&self) -> &[ValueInfo] {
        &self.values
    }

    pub fn input_defs<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a ValueInfo> + 'a {
        node.inputs.iter().map(move |&v| self.value(v))
    }

    pub fn output_defs<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a ValueInfo> + 'a {
        node.outputs.iter().map(move |&v| self.value(v))
    }

    /// Rebinds (or appends, when `slot` is the current arity) an input of
    /// a node.
    pub fn set_node_input(&mut self, node: NodeId, slot: usize, value: &ValueInfo) -> GraphResult<()> {
        self.real_node_mut(node)?;
        let value = self.add_value(value);
        self.invalidate();
        let node = self.real_node_mut(node)?;
        Self::set_slot(&node.name, &mut node.inputs, slot, value)
    }

    pub fn set_node_output(&mut self, node: NodeId, slot: usize, value: &ValueInfo) -> GraphResult<()> {
        self.real_node_mut(node)?;
        let value = self.add_value(value);
        self.invalidate();
        let node = self.real_node_mut(node)?;
        Self::set_slot(&node.name, &mut node.outputs, slot, value)
    }

    fn set_slot(name: &str, slots: &mut TVec<ValueId>, slot: usize, value: ValueId) -> GraphResult<()> {
        if slot < slots.len() {
            slots[slot] = value;
        } else if slot == slots.len() {
            slots.push(value);
        } else {
            return Err(GraphError::NoSuchSlot { node: name.to_string(), slot });
        }
        Ok(())
    }

    pub fn set_value_type(&mut self, value: ValueId, ty: Option<TypeDescriptor>) {
        self.invalidate();
        self.values[value.0].ty = ty;
    }

    pub fn add_attribute(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> GraphResult<()> {
        self.real_node_mut(node)?.attributes.insert(name.into(), value.into());
        self.invalidate();
        Ok(())
    }

    /// Declares the graph inputs, as a loaded model lists them. Once
    /// declared, unproduced node inputs must be among them or be
    /// initializers.
    pub fn declare_inputs(&mut self, values: &[ValueInfo]) {
        self.invalidate();
        let ids = values.iter().map(|v| self.add_value(v)).collect();
        self.declared_inputs = ids;
    }

    pub fn declare_outputs(&mut self, values: &[ValueInfo]) {
        self.invalidate();
        let ids = values.iter().map(|v| self.add_value(v)).collect();
        self.declared_outputs = ids;
    }

    pub fn declared_inputs(&self) -> Vec<&ValueInfo> {
        self.declared_inputs.iter().map(|&v| self.value(v)).collect()
    }

    pub fn declared_outputs(&self) -> Vec<&ValueInfo> {
        self.declared_outputs.iter().map(|&v| self.value(v)).collect()
    }

    pub(crate) fn declared_input_ids(&self) -> &[ValueId] {
        &self.declared_inputs
    }

    /// Operator set version per domain, used to pick schema versions.
    pub fn opset_import(&self) -> &BTreeMap<String, i64> {
        &self.opset
    }

    pub fn set_opset_import(&mut self, domain: &str, version: i64) {
        self.invalidate();
        self.opset.insert(canonical_domain(domain).to_string(), version);
    }

    /// Real nodes in topological order once resolved, in insertion order
    /// before that.
    pub fn topological_nodes(&self) -> impl Iterator<Item = &Node> {
        match &self.resolution {
            Some(res) => Either::Left(res.order.iter().filter_map(|&id| self.node(id))),
            None => Either::Right(self.real_nodes()),
        }
    }

    /// Graph inputs: computed by resolution, declared ones before that.
    pub fn inputs(&self) -> Vec<&ValueInfo> {
        match &self.resolution {
            Some(res) => res.inputs.iter().map(|&v| self.value(v)).collect(),
            None => self.declared_inputs(),
        }
    }

    /// Graph outputs: computed by resolution, declared ones before that.
    pub fn outputs(&self) -> Vec<&ValueInfo> {
        match &self.resolution {
            Some(res) => res.outputs.iter().map(|&v| self.value(v)).collect(),
            None => self.declared_outputs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int32() -> TypeDescriptor {
        TypeDescriptor::tensor(ElementKind::I32)
    }

    #[test]
    fn sentinels() {
        let graph = Graph::new("g");
        let names: Vec<_> = graph.nodes().map(|n| n.name()).collect();
        assert_eq!(names, vec![SOURCE_NODE_NAME, SINK_NODE_NAME]);
        assert!(graph.is_source_node(graph.source_node()));
        assert!(graph.is_sink_node(graph.sink_node()));
        assert_eq!(graph.real_nodes().count(), 0);
    }

    #[test]
    fn values_are_shared_by_name() {
        let mut graph = Graph::new("g");
        let a = graph.add_node("a", "Identity", "", &[ValueInfo::untyped("x")], &[ValueInfo::untyped("y")]);
        let b = graph.add_node("b", "Identity", "", &[ValueInfo::typed("y", int32())], &[ValueInfo::untyped("z")]);
        assert_eq!(graph.node(a).unwrap().outputs(), graph.node(b).unwrap().inputs());
        assert_eq!(graph.value_by_name("y").unwrap().ty, Some(int32()));
        assert_eq!(graph.values().len(), 3);
    }

    #[test]
    fn first_type_wins() {
        let mut graph = Graph::new("g");
        graph.add_value(&ValueInfo::typed("x", int32()));
        graph.add_value(&ValueInfo::typed("x", TypeDescriptor::tensor(ElementKind::F32)));
        assert_eq!(graph.value_by_name("x").unwrap().ty, Some(int32()));
    }

    #[test]
    fn remove_keeps_ids() {
        let mut graph = Graph::new("g");
        let a = graph.add_node("a", "Identity", "", &[], &[]);
        let b = graph.add_node("b", "Identity", "", &[], &[]);
        let removed = graph.remove_node(a).unwrap();
        assert_eq!(removed.name(), "a");
        assert!(graph.node(a).is_none());
        assert_eq!(graph.node(b).unwrap().name(), "b");
        assert_eq!(graph.remove_node(a), Err(GraphError::NoSuchNode(a)));
        assert_eq!(graph.remove_node(graph.sink_node()), Err(GraphError::NoSuchNode(NodeId(1))));
    }

    #[test]
    fn rewiring() {
        let mut graph = Graph::new("g");
        let a = graph.add_node("a", "Identity", "", &[ValueInfo::untyped("x")], &[ValueInfo::untyped("y")]);
        graph.set_node_input(a, 0, &ValueInfo::untyped("w")).unwrap();
        graph.set_node_input(a, 1, &ValueInfo::untyped("v")).unwrap();
        assert!(matches!(
            graph.set_node_output(a, 5, &ValueInfo::untyped("u")),
            Err(GraphError::NoSuchSlot { slot: 5, .. })
        ));
        let names: Vec<_> = graph.input_defs(graph.node(a).unwrap()).map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["w", "v"]);
    }

    #[test]
    fn ai_onnx_is_default_domain() {
        let mut graph = Graph::new("g");
        let a = graph.add_node_full("a", "Relu", "", &[], &[], BTreeMap::new(), "ai.onnx");
        assert_eq!(graph.node(a).unwrap().domain(), ONNX_DOMAIN);
    }
}
