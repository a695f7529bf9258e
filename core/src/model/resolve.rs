//! Graph resolution: validation, cycle detection, type inference and the
//! computation of graph inputs and outputs.
//!
//! Every phase works on a read-only view of the graph. Results are only
//! written back once all phases passed, so a failed resolution leaves the
//! graph exactly as the caller built it.
use crate::errors::{ArgKind, GraphError, GraphResult};
use crate::model::graph::Resolution;
use crate::model::order::ReverseDfs;
use crate::model::{AttributeValue, Graph, Node, NodeId, ResolveOptions, ValueId};
use crate::ops::registry;
use crate::ops::OpSchema;
use itertools::Itertools;
use nnir_data::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Everything a successful resolution writes back.
struct Outcome {
    types: Vec<Option<TypeDescriptor>>,
    subgraphs: Vec<(NodeId, String, AttributeValue)>,
    resolution: Resolution,
}

struct Resolver<'g> {
    graph: &'g Graph,
    options: &'g ResolveOptions,
    schemas: HashMap<NodeId, Arc<OpSchema>>,
}

impl Graph {
    pub fn resolve(&mut self) -> GraphResult<()> {
        self.resolve_with_options(&ResolveOptions::default())
    }

    pub fn resolve_with_options(&mut self, options: &ResolveOptions) -> GraphResult<()> {
        debug!("Resolving graph {}", self.name());
        let outcome = Resolver { graph: self, options, schemas: HashMap::new() }.run()?;
        self.commit(outcome);
        debug!("Graph {} resolved", self.name());
        Ok(())
    }

    fn commit(&mut self, outcome: Outcome) {
        for (value, ty) in self.values.iter_mut().zip(outcome.types) {
            value.ty = ty;
        }
        for (id, name, attribute) in outcome.subgraphs {
            if let Ok(node) = self.real_node_mut(id) {
                node.attributes.insert(name, attribute);
            }
        }
        self.resolution = Some(outcome.resolution);
    }
}

impl<'g> Resolver<'g> {
    fn run(mut self) -> GraphResult<Outcome> {
        self.check_names()?;
        let subgraphs = self.bind_operators()?;
        self.check_edges()?;
        let order = self.order()?;
        let types = self.infer_types(&order)?;
        let (inputs, outputs) = self.graph_io(&order);
        Ok(Outcome { types, subgraphs, resolution: Resolution { order, inputs, outputs } })
    }

    fn nodes(&self) -> impl Iterator<Item = &'g Node> + use<'g> {
        let graph: &'g Graph = self.graph;
        graph.real_nodes()
    }

    fn is_absent(&self, value: ValueId) -> bool {
        self.graph.value(value).is_absent()
    }

    fn value_name(&self, value: ValueId) -> String {
        self.graph.value(value).name.clone()
    }

    /// Node names first, then output names, both in insertion order.
    fn check_names(&self) -> GraphResult<()> {
        debug!("Checking names");
        let mut names = HashSet::new();
        for node in self.nodes() {
            if !names.insert(node.name()) {
                return Err(GraphError::DuplicateNodeName(node.name().to_string()));
            }
        }
        let mut outputs = HashSet::new();
        for node in self.nodes() {
            for &output in node.outputs() {
                if !self.is_absent(output) && !outputs.insert(output) {
                    return Err(GraphError::DuplicateOutputArg(self.value_name(output)));
                }
            }
        }
        Ok(())
    }

    /// Looks every node's operator up and checks arities and attributes.
    /// Returns nested graphs, resolved.
    fn bind_operators(&mut self) -> GraphResult<Vec<(NodeId, String, AttributeValue)>> {
        debug!("Binding operators");
        let mut subgraphs = vec![];
        for node in self.nodes() {
            let opset = self.graph.opset_import().get(node.domain()).copied();
            let schema = registry::schema_for_opset(node.op_type(), node.domain(), opset).ok_or_else(|| {
                GraphError::UnknownOperator {
                    op_type: node.op_type().to_string(),
                    node: node.name().to_string(),
                    domain: node.domain().to_string(),
                }
            })?;
            trace!("{node} binds to {} version {}", schema.name(), schema.version());
            check_arity(node, ArgKind::Inputs, node.inputs().len(), schema.min_inputs(), schema.max_inputs())?;
            check_arity(node, ArgKind::Outputs, node.outputs().len(), schema.min_outputs(), schema.max_outputs())?;
            self.check_attributes(node, &schema)?;
            if self.options.resolve_subgraphs {
                for (name, attribute) in node.attributes() {
                    if attribute.subgraphs().is_empty() {
                        continue;
                    }
                    let mut attribute = attribute.clone();
                    for graph in attribute.subgraphs_mut() {
                        debug!("Resolving subgraph {} of {node}", graph.name());
                        graph.resolve_with_options(self.options)?;
                    }
                    subgraphs.push((node.id(), name.clone(), attribute));
                }
            }
            self.schemas.insert(node.id(), schema);
        }
        Ok(subgraphs)
    }

    fn check_attributes(&self, node: &Node, schema: &OpSchema) -> GraphResult<()> {
        for decl in schema.attributes().values() {
            if decl.required && node.get_attribute(&decl.name).is_none() {
                return Err(GraphError::MissingRequiredAttribute {
                    node: node.name().to_string(),
                    attribute: decl.name.clone(),
                });
            }
        }
        for (name, value) in node.attributes() {
            match schema.attributes().get(name) {
                Some(decl) if decl.kind != value.kind() => {
                    return Err(GraphError::AttributeKindMismatch {
                        node: node.name().to_string(),
                        attribute: name.clone(),
                        expected: decl.kind,
                        actual: value.kind(),
                    });
                }
                Some(_) => (),
                None if self.options.reject_unknown_attributes => {
                    return Err(GraphError::UnknownAttribute {
                        node: node.name().to_string(),
                        attribute: name.clone(),
                    });
                }
                None => warn!("Ignoring attribute {name} of {node}, unknown to {}", schema.name()),
            }
        }
        Ok(())
    }

    /// Unproduced inputs must be initializers or, once the graph declares
    /// its inputs, among them. Initializer payloads are checked here too,
    /// and must unify with the type their value declares.
    fn check_edges(&self) -> GraphResult<()> {
        debug!("Checking edges");
        if self.options.check_initializers {
            for (name, tensor) in self.graph.initializers() {
                tensor.check().map_err(|e| GraphError::InvalidInitializer {
                    name: name.to_string(),
                    detail: e.to_string(),
                })?;
                let Some(declared) = self.graph.value_by_name(name).and_then(|v| v.ty.as_ref()) else {
                    continue;
                };
                if !declared.unifies_with(&tensor.type_descriptor()) {
                    let shape = declared.as_tensor().and_then(|t| t.shape.as_ref());
                    return Err(GraphError::InvalidInitializer {
                        name: name.to_string(),
                        detail: format!(
                            "declared as {declared}{}, holds {} {:?}",
                            shape.map(|s| s.to_string()).unwrap_or_default(),
                            tensor.elem,
                            tensor.dims.as_slice()
                        ),
                    });
                }
            }
        }
        let produced: HashSet<ValueId> = self.nodes().flat_map(|n| n.outputs().iter().copied()).collect();
        let declared = self.graph.declared_input_ids();
        for node in self.nodes() {
            for &input in node.inputs() {
                if self.is_absent(input) || produced.contains(&input) {
                    continue;
                }
                let name = &self.graph.value(input).name;
                if self.graph.initializer(name).is_some() {
                    trace!("{node} reads initializer {name}");
                } else if !declared.is_empty() && !declared.contains(&input) {
                    return Err(GraphError::DanglingInput { value: name.clone(), node: node.name().to_string() });
                }
            }
        }
        Ok(())
    }

    /// Topological order of real nodes: the finish order of a reverse
    /// depth-first search from Sink, continued from any node it could not
    /// reach, so that a cycle with no path to Sink is found as well.
    fn order(&self) -> GraphResult<Vec<NodeId>> {
        debug!("Ordering nodes");
        let graph = self.graph;
        let mut order = vec![];
        let mut dfs = ReverseDfs::new(graph);
        let by_name = |a: &Node, b: &Node| a.name().cmp(b.name());
        let mut leave = |n: &Node| {
            if !graph.is_sentinel(n.id()) {
                order.push(n.id())
            }
        };
        dfs.run(&[graph.sink_node()], &mut |_: &Node| (), &mut leave, &by_name)?;
        let unreached: Vec<NodeId> = self
            .nodes()
            .filter(|n| !dfs.is_visited(n.id()))
            .sorted_by(|a, b| by_name(a, b))
            .map(|n| n.id())
            .collect();
        if !unreached.is_empty() {
            trace!("Continuing search from {} nodes not reaching Sink", unreached.len());
            dfs.run(&unreached, &mut |_: &Node| (), &mut leave, &by_name)?;
        }
        Ok(order)
    }

    /// A single pass in topological order. Type variables are bound from a
    /// node's typed inputs, which must agree. A variable no input binds is
    /// taken from the attribute the schema names for it, or else from the
    /// node's typed outputs. The binding then types the node's untyped
    /// inputs and outputs. Disagreements among typed outputs are reported
    /// after the pass, so that a consumer's input mismatch comes first.
    ///
    /// Bindings compare element types only: shapes travel with values but
    /// do not take part in unification here.
    fn infer_types(&self, order: &[NodeId]) -> GraphResult<Vec<Option<TypeDescriptor>>> {
        debug!("Inferring types");
        let mut types: Vec<Option<TypeDescriptor>> = self.graph.values().iter().map(|v| v.ty.clone()).collect();
        for (ix, value) in self.graph.values().iter().enumerate() {
            if value.ty.is_none() {
                if let Some(tensor) = self.graph.initializer(&value.name) {
                    types[ix] = Some(tensor.type_descriptor());
                }
            }
        }
        let mut late_conflicts: Vec<GraphError> = vec![];
        for &id in order {
            let Some(node) = self.graph.node(id) else { continue };
            let Some(schema) = self.schemas.get(&id) else { continue };
            let inputs: Vec<_> = node
                .inputs()
                .iter()
                .enumerate()
                .filter(|(_, v)| !self.is_absent(**v))
                .filter_map(|(slot, &v)| schema.input_formal(slot).map(|f| (f, v)))
                .collect();
            let outputs: Vec<_> = node
                .outputs()
                .iter()
                .enumerate()
                .filter(|(_, v)| !self.is_absent(**v))
                .filter_map(|(slot, &v)| schema.output_formal(slot).map(|f| (f, v)))
                .collect();

            let mut observed: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
            let mut bindings: BTreeMap<&str, TypeDescriptor> = BTreeMap::new();
            for &(formal, value) in &inputs {
                if !formal.is_type_variable() {
                    continue;
                }
                if let Some(ty) = &types[value.0] {
                    observed.entry(formal.type_str()).or_default().insert(ty.type_string());
                    bindings.entry(formal.type_str()).or_insert_with(|| ty.clone());
                }
            }
            for (var, seen) in &observed {
                if seen.len() > 1 {
                    return Err(GraphError::TypeMismatch {
                        node: node.name().to_string(),
                        observed: seen.iter().cloned().collect(),
                        type_var: var.to_string(),
                    });
                }
            }
            for var in schema.type_constraints().keys() {
                if bindings.contains_key(var.as_str()) {
                    continue;
                }
                let Some(attr) = schema.type_attr(var) else { continue };
                let Some(name) = node.get_attribute(attr).and_then(|a| a.as_str()) else { continue };
                let kind = name.parse::<ElementKind>().map_err(|_| GraphError::TypeConstraintViolation {
                    node: node.name().to_string(),
                    type_var: var.clone(),
                    observed: name.to_string(),
                    allowed: schema.type_constraints()[var].allowed.iter().cloned().collect(),
                })?;
                trace!("{node}: {var} is tensor({kind}) from attribute {attr}");
                bindings.insert(var.as_str(), TypeDescriptor::tensor(kind));
            }
            let mut from_outputs: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
            for &(formal, value) in &outputs {
                if !formal.is_type_variable() || observed.contains_key(formal.type_str()) {
                    continue;
                }
                if let Some(ty) = &types[value.0] {
                    from_outputs.entry(formal.type_str()).or_default().insert(ty.type_string());
                    bindings.entry(formal.type_str()).or_insert_with(|| ty.clone());
                }
            }
            for (var, seen) in from_outputs {
                if seen.len() > 1 {
                    late_conflicts.push(GraphError::TypeMismatch {
                        node: node.name().to_string(),
                        observed: seen.into_iter().collect(),
                        type_var: var.to_string(),
                    });
                }
            }
            for (var, ty) in &bindings {
                let allowed = &schema.type_constraints()[*var].allowed;
                if !ty.is_in(allowed) {
                    return Err(GraphError::TypeConstraintViolation {
                        node: node.name().to_string(),
                        type_var: var.to_string(),
                        observed: ty.type_string(),
                        allowed: allowed.iter().cloned().collect(),
                    });
                }
            }

            for (is_output, &(formal, value)) in
                inputs.iter().map(|p| (false, p)).chain(outputs.iter().map(|p| (true, p)))
            {
                let name = &self.graph.value(value).name;
                let expected = match formal.literal_type() {
                    Some(literal) => Some(literal),
                    None => bindings.get(formal.type_str()),
                };
                match (&types[value.0], expected) {
                    (None, Some(expected)) => {
                        trace!("{node}: {name} is {expected}");
                        types[value.0] = Some(expected.clone());
                    }
                    (None, None) => {
                        return Err(GraphError::UntypedValue { value: name.clone(), node: node.name().to_string() });
                    }
                    (Some(actual), _) if !actual.is_in(formal.types()) => {
                        return Err(GraphError::TypeConstraintViolation {
                            node: node.name().to_string(),
                            type_var: formal.type_str().to_string(),
                            observed: actual.type_string(),
                            allowed: formal.types().iter().cloned().collect(),
                        });
                    }
                    (Some(actual), Some(expected))
                        if is_output && actual.type_string() != expected.type_string() =>
                    {
                        late_conflicts.push(GraphError::TypeMismatch {
                            node: node.name().to_string(),
                            observed: [actual.type_string(), expected.type_string()]
                                .into_iter()
                                .sorted()
                                .collect(),
                            type_var: formal.type_str().to_string(),
                        });
                    }
                    _ => (),
                }
            }
        }
        match late_conflicts.into_iter().next() {
            Some(conflict) => Err(conflict),
            None => Ok(types),
        }
    }

    /// Graph inputs are unproduced values other than constant initializers,
    /// graph outputs are produced values no node reads. Both come in order
    /// of first appearance along the topological order.
    fn graph_io(&self, order: &[NodeId]) -> (Vec<ValueId>, Vec<ValueId>) {
        debug!("Computing graph inputs and outputs");
        let produced: HashSet<ValueId> = self.nodes().flat_map(|n| n.outputs().iter().copied()).collect();
        let consumed: HashSet<ValueId> = self.nodes().flat_map(|n| n.inputs().iter().copied()).collect();
        let declared = self.graph.declared_input_ids();
        let ordered = || order.iter().filter_map(|&id| self.graph.node(id));
        let inputs: Vec<ValueId> = ordered()
            .flat_map(|n| n.inputs().iter().copied())
            .filter(|v| !self.is_absent(*v) && !produced.contains(v))
            .filter(|v| {
                self.graph.initializer(&self.graph.value(*v).name).is_none() || declared.contains(v)
            })
            .unique()
            .collect();
        let outputs: Vec<ValueId> = ordered()
            .flat_map(|n| n.outputs().iter().copied())
            .filter(|v| !self.is_absent(*v) && !consumed.contains(v))
            .unique()
            .collect();
        for v in declared {
            if !consumed.contains(v) {
                warn!("Declared input {} is read by no node", self.graph.value(*v).name);
            }
        }
        (inputs, outputs)
    }
}

fn check_arity(node: &Node, which: ArgKind, actual: usize, min: usize, max: usize) -> GraphResult<()> {
    if actual >= min && actual <= max {
        return Ok(());
    }
    let expected = if max == usize::MAX {
        format!("at least {min}")
    } else if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    };
    Err(GraphError::ArityMismatch { node: node.name().to_string(), expected, actual, which })
}
