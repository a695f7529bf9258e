//! Value type descriptors and their canonical type strings.
//!
//! A type string is the textual form operator schemas use to name types:
//! `tensor(int32)`, `map(int64,float)`, `seq(tensor(float))`. Type strings
//! carry no shape, so two descriptors with the same type string may still
//! differ structurally.
use crate::datum::ElementKind;
use crate::dim::Shape;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alphanumeric1, one_of};
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};
use nom_language::error::VerboseError;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorType {
    pub elem: ElementKind,
    pub shape: Option<Shape>,
}

impl TensorType {
    pub fn new(elem: ElementKind) -> TensorType {
        TensorType { elem, shape: None }
    }

    pub fn with_shape(self, shape: Shape) -> TensorType {
        TensorType { shape: Some(shape), ..self }
    }

    fn unifies_with(&self, other: &TensorType) -> bool {
        self.elem == other.elem
            && match (&self.shape, &other.shape) {
                (Some(a), Some(b)) => a.unifies_with(b),
                _ => true,
            }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapType {
    pub key: ElementKind,
    pub value: TensorType,
}

/// The type of a value flowing along a graph edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Tensor(TensorType),
    Map(MapType),
    Sequence(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn tensor(elem: ElementKind) -> TypeDescriptor {
        TypeDescriptor::Tensor(TensorType::new(elem))
    }

    pub fn tensor_with_shape(elem: ElementKind, shape: Shape) -> TypeDescriptor {
        TypeDescriptor::Tensor(TensorType::new(elem).with_shape(shape))
    }

    pub fn map(key: ElementKind, value: ElementKind) -> TypeDescriptor {
        TypeDescriptor::Map(MapType { key, value: TensorType::new(value) })
    }

    pub fn sequence(inner: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Sequence(Box::new(inner))
    }

    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            TypeDescriptor::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Canonical type string, shape excluded.
    pub fn type_string(&self) -> String {
        self.to_string()
    }

    /// Structural compatibility: element kinds must match exactly, symbolic
    /// or missing shapes match any shape, concrete dims must be equal.
    pub fn unifies_with(&self, other: &TypeDescriptor) -> bool {
        match (self, other) {
            (TypeDescriptor::Tensor(a), TypeDescriptor::Tensor(b)) => a.unifies_with(b),
            (TypeDescriptor::Map(a), TypeDescriptor::Map(b)) => {
                a.key == b.key && a.value.unifies_with(&b.value)
            }
            (TypeDescriptor::Sequence(a), TypeDescriptor::Sequence(b)) => a.unifies_with(b),
            _ => false,
        }
    }

    /// Membership of this descriptor's type string in a set of canonical
    /// type strings.
    pub fn is_in(&self, allowed: &BTreeSet<String>) -> bool {
        allowed.contains(&self.type_string())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeDescriptor::Tensor(t) => write!(fmt, "tensor({})", t.elem),
            TypeDescriptor::Map(m) => write!(fmt, "map({},{})", m.key, m.value.elem),
            TypeDescriptor::Sequence(inner) => write!(fmt, "seq({inner})"),
        }
    }
}

impl std::str::FromStr for TypeDescriptor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type_string(s)
    }
}

type R<'i, O> = IResult<&'i str, O, VerboseError<&'i str>>;

pub fn parse_type_string(input: &str) -> anyhow::Result<TypeDescriptor> {
    match all_consuming(delimited(spaces, type_descriptor, spaces)).parse(input) {
        Ok(pair) => Ok(pair.1),
        Err(e) => anyhow::bail!("Failed to parse type string {:?}, {:?}", input, e),
    }
}

/// Parses and re-formats, so that `map(int64, tensor(float))` and
/// `map(int64,float)` name the same thing.
pub fn canonicalize_type_string(input: &str) -> anyhow::Result<String> {
    Ok(parse_type_string(input)?.type_string())
}

fn type_descriptor(i: &str) -> R<'_, TypeDescriptor> {
    alt((
        map(tensor_type, TypeDescriptor::Tensor),
        map(map_type, TypeDescriptor::Map),
        map(preceded(stag("seq"), delimited(stag("("), type_descriptor, stag(")"))), |inner| {
            TypeDescriptor::Sequence(Box::new(inner))
        }),
    ))
    .parse(i)
}

fn tensor_type(i: &str) -> R<'_, TensorType> {
    map(preceded(stag("tensor"), delimited(stag("("), spaced(element), stag(")"))), TensorType::new)
        .parse(i)
}

fn map_type(i: &str) -> R<'_, MapType> {
    map(
        preceded(
            stag("map"),
            delimited(
                stag("("),
                separated_pair(spaced(map_key), stag(","), spaced(map_value)),
                stag(")"),
            ),
        ),
        |(key, value)| MapType { key, value },
    )
    .parse(i)
}

fn map_key(i: &str) -> R<'_, ElementKind> {
    map_res(element, |k| {
        if k.is_map_key() { Ok(k) } else { Err(anyhow::format_err!("{k} is not a map key kind")) }
    })
    .parse(i)
}

fn map_value(i: &str) -> R<'_, TensorType> {
    alt((tensor_type, map(element, TensorType::new))).parse(i)
}

fn element(i: &str) -> R<'_, ElementKind> {
    map_res(alphanumeric1, str::parse::<ElementKind>).parse(i)
}

fn spaces(i: &str) -> R<'_, ()> {
    map(many0(one_of(" \t\n\r")), |_| ()).parse(i)
}

fn spaced<'s, O, P>(it: P) -> impl Parser<&'s str, Output = O, Error = VerboseError<&'s str>>
where
    P: Parser<&'s str, Output = O, Error = VerboseError<&'s str>>,
{
    delimited(spaces, it, spaces)
}

fn stag<'s>(t: &'static str) -> impl Parser<&'s str, Output = &'s str, Error = VerboseError<&'s str>> {
    spaced(tag(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;
    use proptest::prelude::*;

    #[test]
    fn parse_tensor() {
        assert_eq!(parse_type_string("tensor(int32)").unwrap(), TypeDescriptor::tensor(ElementKind::I32));
        assert_eq!(parse_type_string(" tensor( float ) ").unwrap(), TypeDescriptor::tensor(ElementKind::F32));
    }

    #[test]
    fn parse_map_both_forms() {
        let expected = TypeDescriptor::map(ElementKind::I64, ElementKind::F32);
        assert_eq!(parse_type_string("map(int64,float)").unwrap(), expected);
        assert_eq!(parse_type_string("map(int64, tensor(float))").unwrap(), expected);
        assert_eq!(canonicalize_type_string("map(int64, tensor(float))").unwrap(), "map(int64,float)");
    }

    #[test]
    fn parse_seq() {
        let t = parse_type_string("seq(map(string,int64))").unwrap();
        assert_eq!(t, TypeDescriptor::sequence(TypeDescriptor::map(ElementKind::String, ElementKind::I64)));
        assert_eq!(t.type_string(), "seq(map(string,int64))");
    }

    #[test]
    fn reject_garbage() {
        assert!(parse_type_string("tensor(int33)").is_err());
        assert!(parse_type_string("map(float,float)").is_err());
        assert!(parse_type_string("tensor(int32) trailing").is_err());
        assert!(parse_type_string("T").is_err());
    }

    #[test]
    fn type_string_ignores_shape() {
        let shaped = TypeDescriptor::tensor_with_shape(ElementKind::I32, Shape::new([1i64]));
        assert_eq!(shaped.type_string(), "tensor(int32)");
        let allowed: BTreeSet<String> = ["tensor(int32)".to_string()].into_iter().collect();
        assert!(shaped.is_in(&allowed));
        assert!(!TypeDescriptor::tensor(ElementKind::F32).is_in(&allowed));
    }

    #[test]
    fn unification() {
        let a = TypeDescriptor::tensor_with_shape(ElementKind::F32, Shape::new([Dim::Unknown, Dim::Value(3)]));
        let b = TypeDescriptor::tensor_with_shape(ElementKind::F32, Shape::new([8i64, 3]));
        let c = TypeDescriptor::tensor_with_shape(ElementKind::F32, Shape::new([8i64, 4]));
        assert!(a.unifies_with(&b));
        assert!(!b.unifies_with(&c));
        assert!(TypeDescriptor::tensor(ElementKind::F32).unifies_with(&c));
        assert!(!TypeDescriptor::tensor(ElementKind::F64).unifies_with(&c));
        assert!(!a.unifies_with(&TypeDescriptor::map(ElementKind::I64, ElementKind::F32)));
    }

    fn element_strat() -> impl Strategy<Value = ElementKind> {
        proptest::sample::select(ElementKind::ALL.to_vec())
    }

    fn descriptor_strat() -> impl Strategy<Value = TypeDescriptor> {
        let key = proptest::sample::select(vec![ElementKind::I32, ElementKind::I64, ElementKind::String]);
        let leaf = prop_oneof![
            element_strat().prop_map(TypeDescriptor::tensor),
            (key, element_strat()).prop_map(|(k, v)| TypeDescriptor::map(k, v)),
        ];
        leaf.prop_recursive(3, 8, 1, |inner| inner.prop_map(TypeDescriptor::sequence))
    }

    proptest! {
        #[test]
        fn type_strings_are_canonical(t in descriptor_strat()) {
            let s = t.type_string();
            let parsed = parse_type_string(&s).unwrap();
            prop_assert_eq!(&parsed, &t);
            prop_assert_eq!(parsed.type_string(), s);
        }
    }
}
