use crate::model::{graph_from_proto, graph_to_proto};
use crate::pb::attribute_proto::AttributeType;
use crate::pb::*;
use anyhow::{Context, bail, format_err};
use nnir_core::internal::*;
use std::fmt::{self, Display};
use std::str;

impl Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Tensor => "tensor",
            AttributeType::String => "string",
            AttributeType::Ints => "list of ints",
            AttributeType::Floats => "list of floats",
            AttributeType::Tensors => "list of tensors",
            AttributeType::Strings => "list of strings",
            AttributeType::Graph => "graph",
            AttributeType::Graphs => "graphs",
            AttributeType::Undefined => "<undefined>",
        })
    }
}

impl From<AttributeKind> for AttributeType {
    fn from(kind: AttributeKind) -> AttributeType {
        match kind {
            AttributeKind::Float => AttributeType::Float,
            AttributeKind::Int => AttributeType::Int,
            AttributeKind::String => AttributeType::String,
            AttributeKind::Tensor => AttributeType::Tensor,
            AttributeKind::Graph => AttributeType::Graph,
            AttributeKind::Floats => AttributeType::Floats,
            AttributeKind::Ints => AttributeType::Ints,
            AttributeKind::Strings => AttributeType::Strings,
            AttributeKind::Tensors => AttributeType::Tensors,
            AttributeKind::Graphs => AttributeType::Graphs,
        }
    }
}

fn utf8(bytes: &[u8]) -> anyhow::Result<String> {
    Ok(str::from_utf8(bytes).context("Invalid UTF8 buffer")?.to_string())
}

pub fn attribute_to_proto(name: &str, value: &AttributeValue) -> AttributeProto {
    let mut proto = AttributeProto {
        name: name.to_string(),
        r#type: AttributeType::from(value.kind()) as i32,
        ..AttributeProto::default()
    };
    match value {
        AttributeValue::Float(f) => proto.f = *f,
        AttributeValue::Int(i) => proto.i = *i,
        AttributeValue::String(s) => proto.s = s.as_bytes().to_vec(),
        AttributeValue::Tensor(t) => proto.t = Some(t.into()),
        AttributeValue::Graph(g) => proto.g = Some(graph_to_proto(g)),
        AttributeValue::Floats(v) => proto.floats = v.clone(),
        AttributeValue::Ints(v) => proto.ints = v.clone(),
        AttributeValue::Strings(v) => proto.strings = v.iter().map(|s| s.as_bytes().to_vec()).collect(),
        AttributeValue::Tensors(v) => proto.tensors = v.iter().map(TensorProto::from).collect(),
        AttributeValue::Graphs(v) => proto.graphs = v.iter().map(graph_to_proto).collect(),
    }
    proto
}

pub fn attribute_from_proto(attr: &AttributeProto) -> anyhow::Result<AttributeValue> {
    let ty = AttributeType::from_i32(attr.r#type)
        .ok_or_else(|| format_err!("Attribute {} has unknown type {}", attr.name, attr.r#type))?;
    trace!("Attribute {}: {}", attr.name, ty);
    let missing = || format_err!("Attribute {} is a {} but holds none", attr.name, ty);
    let value = match ty {
        AttributeType::Float => AttributeValue::Float(attr.f),
        AttributeType::Int => AttributeValue::Int(attr.i),
        AttributeType::String => AttributeValue::String(utf8(&attr.s)?),
        AttributeType::Tensor => AttributeValue::Tensor(attr.t.as_ref().ok_or_else(missing)?.try_into()?),
        AttributeType::Graph => {
            AttributeValue::Graph(Box::new(graph_from_proto(attr.g.as_ref().ok_or_else(missing)?)?))
        }
        AttributeType::Floats => AttributeValue::Floats(attr.floats.clone()),
        AttributeType::Ints => AttributeValue::Ints(attr.ints.clone()),
        AttributeType::Strings => {
            AttributeValue::Strings(attr.strings.iter().map(|s| utf8(s)).collect::<anyhow::Result<_>>()?)
        }
        AttributeType::Tensors => AttributeValue::Tensors(
            attr.tensors.iter().map(TensorLiteral::try_from).collect::<anyhow::Result<_>>()?,
        ),
        AttributeType::Graphs => {
            AttributeValue::Graphs(attr.graphs.iter().map(graph_from_proto).collect::<anyhow::Result<_>>()?)
        }
        AttributeType::Undefined => bail!("Attribute {} has no type", attr.name),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: AttributeValue) {
        let proto = attribute_to_proto("a", &value);
        assert_eq!(proto.name, "a");
        assert_eq!(attribute_from_proto(&proto).unwrap(), value);
    }

    #[test]
    fn scalars_and_lists() {
        round_trip(AttributeValue::Float(0.5));
        round_trip(AttributeValue::Int(-3));
        round_trip(AttributeValue::from("RBF"));
        round_trip(AttributeValue::Ints(vec![0, 1]));
        round_trip(AttributeValue::Strings(vec!["a".to_string(), "b".to_string()]));
        round_trip(AttributeValue::Tensor(TensorLiteral::from_i64("", &[1, 3], &[1, 2, 3])));
    }

    #[test]
    fn kind_is_recorded() {
        let proto = attribute_to_proto("to", &AttributeValue::from("float"));
        assert_eq!(AttributeType::from_i32(proto.r#type), Some(AttributeType::String));
        assert_eq!(proto.s, b"float".to_vec());
    }

    #[test]
    fn undefined_and_invalid() {
        let proto = AttributeProto { name: "x".into(), ..AttributeProto::default() };
        assert!(attribute_from_proto(&proto).is_err());
        let proto = AttributeProto {
            name: "x".into(),
            r#type: AttributeType::String as i32,
            s: vec![0xff, 0xfe],
            ..AttributeProto::default()
        };
        assert!(attribute_from_proto(&proto).is_err());
        let proto =
            AttributeProto { name: "t".into(), r#type: AttributeType::Tensor as i32, ..AttributeProto::default() };
        assert!(attribute_from_proto(&proto).is_err());
    }
}
