//! Operator schemas and their builder.
use crate::errors::{GraphError, GraphResult};
use crate::model::{AttributeKind, AttributeValue};
use crate::ops::{ONNX_DOMAIN, canonical_domain, registry};
use nnir_data::internal::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormalOption {
    Single,
    Optional,
    /// Repeats one or more times. Only the last parameter can be variadic.
    Variadic,
}

/// One declared input or output of an operator.
#[derive(Clone, Debug, PartialEq, new)]
pub struct FormalParameter {
    name: String,
    type_str: String,
    description: String,
    option: FormalOption,
    #[new(default)]
    types: BTreeSet<String>,
    #[new(default)]
    literal: Option<TypeDescriptor>,
}

impl FormalParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Either a type variable (`T`) or a literal type string.
    pub fn type_str(&self) -> &str {
        &self.type_str
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn option(&self) -> FormalOption {
        self.option
    }

    /// Canonical type strings this parameter accepts.
    pub fn types(&self) -> &BTreeSet<String> {
        &self.types
    }

    pub fn is_type_variable(&self) -> bool {
        self.literal.is_none()
    }

    /// The fixed type of a parameter declared with a type string.
    pub fn literal_type(&self) -> Option<&TypeDescriptor> {
        self.literal.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttrDecl {
    pub name: String,
    pub description: String,
    pub kind: AttributeKind,
    pub required: bool,
    pub default: Option<AttributeValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeConstraint {
    pub type_var: String,
    pub allowed: BTreeSet<String>,
    pub description: String,
}

/// The signature of an operator.
///
/// Built with chained calls and published with `register`:
///
/// ```
/// use nnir_core::prelude::*;
///
/// OpSchema::new("Scale_Example")
///     .doc("Multiplies by a constant.")
///     .input("X", "T", "Input tensor.")
///     .output("Y", "T", "Output tensor.")
///     .attr_with_default("scale", "The factor.", 1.0f32)
///     .type_constraint("T", &["tensor(float)", "tensor(double)"], "Float tensors.")
///     .register()
///     .unwrap();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct OpSchema {
    name: String,
    domain: String,
    since_version: i64,
    doc: String,
    inputs: Vec<FormalParameter>,
    outputs: Vec<FormalParameter>,
    attributes: BTreeMap<String, AttrDecl>,
    type_constraints: BTreeMap<String, TypeConstraint>,
    /// Type variables named by a string attribute of the node, as
    /// `type_var -> attribute`.
    type_attrs: BTreeMap<String, String>,
}

impl OpSchema {
    pub fn new(name: impl Into<String>) -> OpSchema {
        OpSchema {
            name: name.into(),
            domain: ONNX_DOMAIN.to_string(),
            since_version: 1,
            doc: String::new(),
            inputs: vec![],
            outputs: vec![],
            attributes: BTreeMap::new(),
            type_constraints: BTreeMap::new(),
            type_attrs: BTreeMap::new(),
        }
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = canonical_domain(domain).to_string();
        self
    }

    pub fn since_version(mut self, version: i64) -> Self {
        self.since_version = version;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    fn param(name: &str, type_str: &str, description: &str, option: FormalOption) -> FormalParameter {
        FormalParameter::new(name.to_string(), type_str.to_string(), description.to_string(), option)
    }

    pub fn input(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.inputs.push(Self::param(name, type_str, description, FormalOption::Single));
        self
    }

    pub fn optional_input(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.inputs.push(Self::param(name, type_str, description, FormalOption::Optional));
        self
    }

    pub fn variadic_input(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.inputs.push(Self::param(name, type_str, description, FormalOption::Variadic));
        self
    }

    pub fn output(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.outputs.push(Self::param(name, type_str, description, FormalOption::Single));
        self
    }

    pub fn optional_output(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.outputs.push(Self::param(name, type_str, description, FormalOption::Optional));
        self
    }

    pub fn variadic_output(mut self, name: &str, type_str: &str, description: &str) -> Self {
        self.outputs.push(Self::param(name, type_str, description, FormalOption::Variadic));
        self
    }

    fn push_attr(mut self, decl: AttrDecl) -> Self {
        self.attributes.insert(decl.name.clone(), decl);
        self
    }

    /// An optional attribute without default.
    pub fn attr(self, name: &str, description: &str, kind: AttributeKind) -> Self {
        self.push_attr(AttrDecl {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: false,
            default: None,
        })
    }

    pub fn required_attr(self, name: &str, description: &str, kind: AttributeKind) -> Self {
        self.push_attr(AttrDecl {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: true,
            default: None,
        })
    }

    pub fn attr_with_default(
        self,
        name: &str,
        description: &str,
        default: impl Into<AttributeValue>,
    ) -> Self {
        let default = default.into();
        self.push_attr(AttrDecl {
            name: name.to_string(),
            description: description.to_string(),
            kind: default.kind(),
            required: false,
            default: Some(default),
        })
    }

    pub fn type_constraint(mut self, type_var: &str, allowed: &[&str], description: &str) -> Self {
        self.type_constraints.insert(
            type_var.to_string(),
            TypeConstraint {
                type_var: type_var.to_string(),
                allowed: allowed.iter().map(|s| s.to_string()).collect(),
                description: description.to_string(),
            },
        );
        self
    }

    /// Binds `type_var` to the tensor type whose element kind a node names
    /// in its string attribute `attr`, e.g. `to = "float"` for Cast.
    pub fn type_from_attr(mut self, type_var: &str, attr: &str) -> Self {
        self.type_attrs.insert(type_var.to_string(), attr.to_string());
        self
    }

    /// Validates the schema and publishes it in the process-wide registry.
    pub fn register(self) -> GraphResult<Arc<OpSchema>> {
        registry::register(self)
    }

    /// Canonicalizes type strings and binds every formal parameter to its
    /// set of accepted types.
    pub(crate) fn finalize(mut self) -> GraphResult<OpSchema> {
        let fail = |msg: String| GraphError::SchemaRegistration(msg);
        for constraint in self.type_constraints.values_mut() {
            if constraint.allowed.is_empty() {
                return Err(fail(format!(
                    "{}: type variable {} allows no type",
                    self.name, constraint.type_var
                )));
            }
            constraint.allowed = constraint
                .allowed
                .iter()
                .map(|s| {
                    canonicalize_type_string(s).map_err(|e| {
                        fail(format!("{}: constraint {}: {e}", self.name, constraint.type_var))
                    })
                })
                .collect::<GraphResult<_>>()?;
        }
        for (type_var, attr) in &self.type_attrs {
            if !self.type_constraints.contains_key(type_var) {
                return Err(fail(format!("{}: {type_var} is not a type variable", self.name)));
            }
            if self.attributes.get(attr).map(|a| a.kind) != Some(AttributeKind::String) {
                return Err(fail(format!("{}: {type_var} refers to {attr}, not a string attribute", self.name)));
            }
        }
        for (side, params) in [("input", &self.inputs), ("output", &self.outputs)] {
            for (ix, param) in params.iter().enumerate() {
                let followed_by_single = params[ix + 1..].iter().any(|p| p.option == FormalOption::Single);
                if param.option != FormalOption::Single && followed_by_single {
                    return Err(fail(format!(
                        "{}: {side} {} is {:?} but followed by a mandatory {side}",
                        self.name, param.name, param.option
                    )));
                }
                if param.option == FormalOption::Variadic && ix + 1 != params.len() {
                    return Err(fail(format!("{}: variadic {side} {} is not last", self.name, param.name)));
                }
            }
        }
        for (side, params) in [("input", &mut self.inputs), ("output", &mut self.outputs)] {
            let mut names = BTreeSet::new();
            for param in params.iter_mut() {
                if !names.insert(param.name.clone()) {
                    return Err(fail(format!("{}: duplicate {side} {}", self.name, param.name)));
                }
                if let Some(constraint) = self.type_constraints.get(&param.type_str) {
                    param.types = constraint.allowed.clone();
                } else {
                    let literal = parse_type_string(&param.type_str).map_err(|_| {
                        fail(format!(
                            "{}: {side} {} refers to undeclared type {}",
                            self.name, param.name, param.type_str
                        ))
                    })?;
                    param.types = [literal.type_string()].into_iter().collect();
                    param.literal = Some(literal);
                }
            }
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain_name(&self) -> &str {
        &self.domain
    }

    pub fn version(&self) -> i64 {
        self.since_version
    }

    pub fn doc_string(&self) -> &str {
        &self.doc
    }

    pub fn inputs(&self) -> &[FormalParameter] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FormalParameter] {
        &self.outputs
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrDecl> {
        &self.attributes
    }

    pub fn type_constraints(&self) -> &BTreeMap<String, TypeConstraint> {
        &self.type_constraints
    }

    /// The attribute naming the element kind of `type_var`, if any.
    pub fn type_attr(&self, type_var: &str) -> Option<&str> {
        self.type_attrs.get(type_var).map(|s| s.as_str())
    }

    pub fn attribute_default(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).and_then(|a| a.default.as_ref())
    }

    pub fn min_inputs(&self) -> usize {
        min_arity(&self.inputs)
    }

    pub fn max_inputs(&self) -> usize {
        max_arity(&self.inputs)
    }

    pub fn min_outputs(&self) -> usize {
        min_arity(&self.outputs)
    }

    pub fn max_outputs(&self) -> usize {
        max_arity(&self.outputs)
    }

    /// The formal parameter an actual input in `slot` binds to.
    pub fn input_formal(&self, slot: usize) -> Option<&FormalParameter> {
        formal_at(&self.inputs, slot)
    }

    pub fn output_formal(&self, slot: usize) -> Option<&FormalParameter> {
        formal_at(&self.outputs, slot)
    }
}

fn min_arity(params: &[FormalParameter]) -> usize {
    params.iter().filter(|p| p.option != FormalOption::Optional).count()
}

fn max_arity(params: &[FormalParameter]) -> usize {
    match params.last() {
        Some(p) if p.option == FormalOption::Variadic => usize::MAX,
        _ => params.len(),
    }
}

fn formal_at(params: &[FormalParameter], slot: usize) -> Option<&FormalParameter> {
    params.get(slot).or_else(|| params.last().filter(|p| p.option == FormalOption::Variadic))
}
