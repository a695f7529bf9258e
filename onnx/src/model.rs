use crate::pb;
use crate::pb_helpers::{attribute_from_proto, attribute_to_proto};
use anyhow::Context;
use nnir_core::internal::*;
use prost::Message;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::Path;

/// IR version written by default, the first one with operator set imports.
pub const IR_VERSION: i64 = pb::Version::IrVersion2017113 as i64;
pub const PRODUCER_NAME: &str = "nnir";

/// A main graph plus the metadata an ONNX file carries around it.
///
/// Operator set imports live on the graph, since resolution needs them.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub ir_version: i64,
    pub producer_name: String,
    pub producer_version: String,
    pub domain: String,
    pub model_version: i64,
    pub doc_string: String,
    pub metadata_props: Vec<(String, String)>,
    graph: Graph,
}

impl Model {
    pub fn new(graph: Graph) -> Model {
        Model {
            ir_version: IR_VERSION,
            producer_name: PRODUCER_NAME.to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            domain: String::new(),
            model_version: 0,
            doc_string: String::new(),
            metadata_props: vec![],
            graph,
        }
    }

    pub fn main_graph(&self) -> &Graph {
        &self.graph
    }

    pub fn main_graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn to_proto(&self) -> pb::ModelProto {
        let opset_import = self
            .graph
            .opset_import()
            .iter()
            .map(|(domain, &version)| pb::OperatorSetIdProto { domain: domain.clone(), version })
            .collect();
        pb::ModelProto {
            ir_version: self.ir_version,
            opset_import,
            producer_name: self.producer_name.clone(),
            producer_version: self.producer_version.clone(),
            domain: self.domain.clone(),
            model_version: self.model_version,
            doc_string: self.doc_string.clone(),
            graph: Some(graph_to_proto(&self.graph)),
            metadata_props: self
                .metadata_props
                .iter()
                .map(|(key, value)| pb::StringStringEntryProto { key: key.clone(), value: value.clone() })
                .collect(),
        }
    }

    /// Builds an unresolved model. Graph inputs and outputs listed in the
    /// proto become the declared ones.
    pub fn from_proto(proto: &pb::ModelProto) -> GraphResult<Model> {
        let graph = proto
            .graph
            .as_ref()
            .ok_or_else(|| GraphError::SerializationError("model has no graph".to_string()))?;
        let mut graph = graph_from_proto(graph).map_err(serialization_error)?;
        for opset in &proto.opset_import {
            graph.set_opset_import(&opset.domain, opset.version);
        }
        Ok(Model {
            ir_version: proto.ir_version,
            producer_name: proto.producer_name.clone(),
            producer_version: proto.producer_version.clone(),
            domain: proto.domain.clone(),
            model_version: proto.model_version,
            doc_string: proto.doc_string.clone(),
            metadata_props: proto.metadata_props.iter().map(|e| (e.key.clone(), e.value.clone())).collect(),
            graph,
        })
    }

    pub fn write_to_bytes(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> GraphResult<()> {
        let path = path.as_ref();
        debug!("Saving model {} to {}", self.graph.name(), path.display());
        fs::write(path, self.write_to_bytes())?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> GraphResult<Model> {
        let path = path.as_ref();
        debug!("Loading model from {}", path.display());
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Model::load_from_bytes(&[]);
        }
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Model::load_from_bytes(&mmap)
    }

    pub fn load_from_bytes(bytes: &[u8]) -> GraphResult<Model> {
        let proto = pb::ModelProto::decode(bytes)
            .map_err(|e| GraphError::SerializationError(format!("Can not parse protobuf input: {e}")))?;
        Model::from_proto(&proto)
    }

    pub fn for_reader(reader: &mut dyn Read) -> GraphResult<Model> {
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes)?;
        Model::load_from_bytes(&bytes)
    }
}

pub fn for_path(path: impl AsRef<Path>) -> GraphResult<Model> {
    Model::load(path)
}

pub fn for_reader<R: Read>(mut reader: R) -> GraphResult<Model> {
    Model::for_reader(&mut reader)
}

fn serialization_error(e: anyhow::Error) -> GraphError {
    GraphError::SerializationError(format!("{e:#}"))
}

fn value_info_proto(value: &ValueInfo) -> pb::ValueInfoProto {
    pb::ValueInfoProto {
        name: value.name.clone(),
        r#type: value.ty.as_ref().map(pb::TypeProto::from),
        doc_string: String::new(),
    }
}

fn node_to_proto(graph: &Graph, node: &Node) -> pb::NodeProto {
    pb::NodeProto {
        input: graph.input_defs(node).map(|v| v.name.clone()).collect(),
        output: graph.output_defs(node).map(|v| v.name.clone()).collect(),
        name: node.name().to_string(),
        op_type: node.op_type().to_string(),
        domain: node.domain().to_string(),
        attribute: node.attributes().iter().map(|(name, value)| attribute_to_proto(name, value)).collect(),
        doc_string: node.description().to_string(),
    }
}

/// Nodes go out in topological order once resolved, in insertion order
/// otherwise. `value_info` lists the typed values that are neither graph
/// inputs nor outputs, in order of first use by the written nodes.
pub(crate) fn graph_to_proto(graph: &Graph) -> pb::GraphProto {
    let inputs = graph.inputs();
    let outputs = graph.outputs();
    let interface: HashSet<&str> = inputs.iter().chain(outputs.iter()).map(|v| v.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let value_info = graph
        .topological_nodes()
        .flat_map(|n| graph.input_defs(n).chain(graph.output_defs(n)))
        .filter(|v| v.ty.is_some() && !v.is_absent() && !interface.contains(v.name.as_str()))
        .filter(|v| seen.insert(v.name.as_str()))
        .map(value_info_proto)
        .collect();
    pb::GraphProto {
        node: graph.topological_nodes().map(|n| node_to_proto(graph, n)).collect(),
        name: graph.name().to_string(),
        initializer: graph.initializers().map(|(_, t)| pb::TensorProto::from(t)).collect(),
        doc_string: graph.doc_string().to_string(),
        input: inputs.into_iter().map(value_info_proto).collect(),
        output: outputs.into_iter().map(value_info_proto).collect(),
        value_info,
    }
}

pub(crate) fn graph_from_proto(proto: &pb::GraphProto) -> anyhow::Result<Graph> {
    let mut types: HashMap<&str, TypeDescriptor> = HashMap::new();
    for value in proto.input.iter().chain(&proto.output).chain(&proto.value_info) {
        if let Some(ty) = &value.r#type {
            let ty = TypeDescriptor::try_from(ty).with_context(|| format!("Reading type of {}", value.name))?;
            types.entry(value.name.as_str()).or_insert(ty);
        }
    }
    let value = |name: &String| ValueInfo::new(name.clone(), types.get(name.as_str()).cloned());

    let mut graph = Graph::new(proto.name.clone());
    graph.set_doc_string(proto.doc_string.clone());
    for tensor in &proto.initializer {
        trace!("Initializer {}", tensor.name);
        graph.add_initialized_tensor(TensorLiteral::try_from(tensor)?);
    }
    for node in &proto.node {
        let attributes = node
            .attribute
            .iter()
            .map(|attr| Ok((attr.name.clone(), attribute_from_proto(attr)?)))
            .collect::<anyhow::Result<BTreeMap<_, _>>>()
            .with_context(|| format!("Reading attributes of node {}", node.name))?;
        let inputs: Vec<ValueInfo> = node.input.iter().map(value).collect();
        let outputs: Vec<ValueInfo> = node.output.iter().map(value).collect();
        graph.add_node_full(
            node.name.clone(),
            node.op_type.clone(),
            node.doc_string.clone(),
            &inputs,
            &outputs,
            attributes,
            &node.domain,
        );
    }
    let inputs: Vec<ValueInfo> = proto.input.iter().map(|v| value(&v.name)).collect();
    let outputs: Vec<ValueInfo> = proto.output.iter().map(|v| value(&v.name)).collect();
    graph.declare_inputs(&inputs);
    graph.declare_outputs(&outputs);
    Ok(graph)
}
