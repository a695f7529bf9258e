use crate::pb::tensor_proto::DataType;
use crate::pb::tensor_shape_proto::dimension::Value as DimValue;
use crate::pb::*;
use anyhow::{Context, bail, ensure, format_err};
use nnir_core::internal::*;

impl TryFrom<DataType> for ElementKind {
    type Error = anyhow::Error;
    fn try_from(t: DataType) -> anyhow::Result<ElementKind> {
        match t {
            DataType::Bool => Ok(ElementKind::Bool),
            DataType::Uint8 => Ok(ElementKind::U8),
            DataType::Uint16 => Ok(ElementKind::U16),
            DataType::Uint32 => Ok(ElementKind::U32),
            DataType::Uint64 => Ok(ElementKind::U64),
            DataType::Int8 => Ok(ElementKind::I8),
            DataType::Int16 => Ok(ElementKind::I16),
            DataType::Int32 => Ok(ElementKind::I32),
            DataType::Int64 => Ok(ElementKind::I64),
            DataType::Float16 => Ok(ElementKind::F16),
            DataType::Float => Ok(ElementKind::F32),
            DataType::Double => Ok(ElementKind::F64),
            DataType::String => Ok(ElementKind::String),
            _ => bail!("Unsupported element type {}", t.as_str_name()),
        }
    }
}

impl From<ElementKind> for DataType {
    fn from(kind: ElementKind) -> DataType {
        match kind {
            ElementKind::Bool => DataType::Bool,
            ElementKind::U8 => DataType::Uint8,
            ElementKind::U16 => DataType::Uint16,
            ElementKind::U32 => DataType::Uint32,
            ElementKind::U64 => DataType::Uint64,
            ElementKind::I8 => DataType::Int8,
            ElementKind::I16 => DataType::Int16,
            ElementKind::I32 => DataType::Int32,
            ElementKind::I64 => DataType::Int64,
            ElementKind::F16 => DataType::Float16,
            ElementKind::F32 => DataType::Float,
            ElementKind::F64 => DataType::Double,
            ElementKind::String => DataType::String,
        }
    }
}

/// Element kind of a raw `data_type` or `elem_type` field.
pub fn element_kind(data_type: i32) -> anyhow::Result<ElementKind> {
    DataType::from_i32(data_type).ok_or_else(|| format_err!("Unknown data type {}", data_type))?.try_into()
}

impl From<&TensorLiteral> for TensorProto {
    fn from(t: &TensorLiteral) -> TensorProto {
        let mut proto = TensorProto {
            dims: t.dims.to_vec(),
            data_type: DataType::from(t.elem) as i32,
            name: t.name.clone(),
            ..TensorProto::default()
        };
        match &t.data {
            TensorData::Raw(bytes) => proto.raw_data = bytes.clone(),
            TensorData::F32(v) => proto.float_data = v.clone(),
            TensorData::I32(v) => proto.int32_data = v.clone(),
            TensorData::Strings(v) => proto.string_data = v.clone(),
            TensorData::I64(v) => proto.int64_data = v.clone(),
            TensorData::F64(v) => proto.double_data = v.clone(),
            TensorData::U64(v) => proto.uint64_data = v.clone(),
        }
        proto
    }
}

impl<'a> TryFrom<&'a TensorProto> for TensorLiteral {
    type Error = anyhow::Error;
    fn try_from(t: &TensorProto) -> anyhow::Result<TensorLiteral> {
        let elem = element_kind(t.data_type).with_context(|| format!("Reading tensor {:?}", t.name))?;
        let data = if !t.raw_data.is_empty() {
            ensure!(elem != ElementKind::String, "String tensor {:?} has a raw payload", t.name);
            TensorData::Raw(t.raw_data.clone())
        } else {
            // Empty typed payloads all look alike on the wire: pick the
            // field the element kind normally uses.
            match TensorData::empty_for(elem) {
                TensorData::F32(_) => TensorData::F32(t.float_data.clone()),
                TensorData::I32(_) => TensorData::I32(t.int32_data.clone()),
                TensorData::Strings(_) => TensorData::Strings(t.string_data.clone()),
                TensorData::I64(_) => TensorData::I64(t.int64_data.clone()),
                TensorData::F64(_) => TensorData::F64(t.double_data.clone()),
                TensorData::U64(_) => TensorData::U64(t.uint64_data.clone()),
                TensorData::Raw(_) => TensorData::Raw(vec![]),
            }
        };
        Ok(TensorLiteral { name: t.name.clone(), elem, dims: t.dims.iter().copied().collect(), data })
    }
}

impl TryFrom<TensorProto> for TensorLiteral {
    type Error = anyhow::Error;
    fn try_from(t: TensorProto) -> anyhow::Result<TensorLiteral> {
        TensorLiteral::try_from(&t)
    }
}

fn shape_to_proto(shape: &Shape) -> TensorShapeProto {
    let dim = shape
        .dims()
        .iter()
        .map(|d| tensor_shape_proto::Dimension {
            denotation: String::new(),
            value: match d {
                Dim::Value(v) => Some(DimValue::DimValue(*v)),
                Dim::Param(p) => Some(DimValue::DimParam(p.clone())),
                Dim::Unknown => None,
            },
        })
        .collect();
    TensorShapeProto { dim }
}

fn shape_from_proto(shape: &TensorShapeProto) -> Shape {
    Shape::new(shape.dim.iter().map(|d| match &d.value {
        Some(DimValue::DimValue(v)) => Dim::Value(*v),
        Some(DimValue::DimParam(p)) => Dim::Param(p.clone()),
        None => Dim::Unknown,
    }))
}

fn tensor_type_to_proto(t: &TensorType) -> type_proto::Tensor {
    type_proto::Tensor { elem_type: DataType::from(t.elem) as i32, shape: t.shape.as_ref().map(shape_to_proto) }
}

fn tensor_type_from_proto(t: &type_proto::Tensor) -> anyhow::Result<TensorType> {
    let tensor = TensorType::new(element_kind(t.elem_type)?);
    Ok(match &t.shape {
        Some(shape) => tensor.with_shape(shape_from_proto(shape)),
        None => tensor,
    })
}

impl From<&TypeDescriptor> for TypeProto {
    fn from(ty: &TypeDescriptor) -> TypeProto {
        let value = match ty {
            TypeDescriptor::Tensor(t) => type_proto::Value::TensorType(tensor_type_to_proto(t)),
            TypeDescriptor::Map(m) => type_proto::Value::MapType(type_proto::Map {
                key_type: DataType::from(m.key) as i32,
                value_type: Some(Box::new(TypeProto {
                    denotation: String::new(),
                    value: Some(type_proto::Value::TensorType(tensor_type_to_proto(&m.value))),
                })),
            }),
            TypeDescriptor::Sequence(inner) => type_proto::Value::SequenceType(type_proto::Sequence {
                elem_type: Some(Box::new(TypeProto::from(inner.as_ref()))),
            }),
        };
        TypeProto { denotation: String::new(), value: Some(value) }
    }
}

impl<'a> TryFrom<&'a TypeProto> for TypeDescriptor {
    type Error = anyhow::Error;
    fn try_from(t: &TypeProto) -> anyhow::Result<TypeDescriptor> {
        match &t.value {
            Some(type_proto::Value::TensorType(tensor)) => {
                Ok(TypeDescriptor::Tensor(tensor_type_from_proto(tensor)?))
            }
            Some(type_proto::Value::MapType(map)) => {
                let key = element_kind(map.key_type)?;
                ensure!(key.is_map_key(), "{} can not be a map key", key);
                let value = match map.value_type.as_deref().and_then(|v| v.value.as_ref()) {
                    Some(type_proto::Value::TensorType(tensor)) => tensor_type_from_proto(tensor)?,
                    Some(_) => bail!("Map values must be tensors"),
                    None => bail!("Map type without value type"),
                };
                Ok(TypeDescriptor::Map(MapType { key, value }))
            }
            Some(type_proto::Value::SequenceType(seq)) => {
                let inner = seq.elem_type.as_deref().context("Sequence type without element type")?;
                Ok(TypeDescriptor::Sequence(Box::new(TypeDescriptor::try_from(inner)?)))
            }
            None => bail!("Type proto carries no type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_back() {
        for kind in ElementKind::ALL {
            let dt = DataType::from(kind);
            assert_eq!(ElementKind::try_from(dt).unwrap(), kind);
        }
        assert!(element_kind(DataType::Complex64 as i32).is_err());
        assert!(element_kind(1234).is_err());
    }

    #[test]
    fn tensor_payload_fields() {
        let t = TensorLiteral::from_i64("c", &[1, 3], &[1, 2, 3]);
        let proto = TensorProto::from(&t);
        assert_eq!(proto.int64_data, vec![1, 2, 3]);
        assert!(proto.raw_data.is_empty());
        assert_eq!(TensorLiteral::try_from(&proto).unwrap(), t);

        let raw = TensorLiteral::from_raw("r", ElementKind::F32, &[1], 1.5f32.to_le_bytes().to_vec());
        let back = TensorLiteral::try_from(TensorProto::from(&raw)).unwrap();
        assert_eq!(back.as_f32_vec().unwrap(), vec![1.5]);
    }

    #[test]
    fn empty_payload_picks_natural_field() {
        let proto = TensorProto { data_type: DataType::Double as i32, dims: vec![0], ..TensorProto::default() };
        assert_eq!(TensorLiteral::try_from(&proto).unwrap().data, TensorData::F64(vec![]));
    }

    #[test]
    fn raw_strings_are_rejected() {
        let proto =
            TensorProto { data_type: DataType::String as i32, raw_data: vec![0], ..TensorProto::default() };
        assert!(TensorLiteral::try_from(&proto).is_err());
    }

    #[test]
    fn types() {
        let shaped = TypeDescriptor::tensor_with_shape(
            ElementKind::F32,
            Shape::new([Dim::Param("N".to_string()), Dim::Value(3), Dim::Unknown]),
        );
        let map = TypeDescriptor::map(ElementKind::I64, ElementKind::F32);
        let seq = TypeDescriptor::sequence(map.clone());
        for ty in [shaped, map, seq] {
            let proto = TypeProto::from(&ty);
            assert_eq!(TypeDescriptor::try_from(&proto).unwrap(), ty);
        }
        let bad_key = TypeProto {
            denotation: String::new(),
            value: Some(type_proto::Value::MapType(type_proto::Map {
                key_type: DataType::Float as i32,
                value_type: None,
            })),
        };
        assert!(TypeDescriptor::try_from(&bad_key).is_err());
    }
}
