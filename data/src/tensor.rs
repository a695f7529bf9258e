//! Constant tensors, as carried by initializers and tensor attributes.
use crate::TVec;
use crate::datum::ElementKind;
use crate::dim::Shape;
use crate::types::TypeDescriptor;
use half::f16;
use std::fmt;

/// Payload of a tensor literal.
///
/// The variants follow the storage fields of the interchange format, so a
/// literal survives a save/load cycle with its storage choice intact.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    /// Fixed-width little-endian bytes.
    Raw(Vec<u8>),
    F32(Vec<f32>),
    /// int32, int16, int8, uint16, uint8, bool, and float16 bit patterns.
    I32(Vec<i32>),
    Strings(Vec<Vec<u8>>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    /// uint32 and uint64.
    U64(Vec<u64>),
}

impl TensorData {
    /// The payload variant the interchange format uses for a kind when it
    /// is not stored raw.
    pub fn empty_for(elem: ElementKind) -> TensorData {
        use ElementKind::*;
        match elem {
            F32 => TensorData::F32(vec![]),
            Bool | U8 | U16 | I8 | I16 | I32 | F16 => TensorData::I32(vec![]),
            String => TensorData::Strings(vec![]),
            I64 => TensorData::I64(vec![]),
            F64 => TensorData::F64(vec![]),
            U32 | U64 => TensorData::U64(vec![]),
        }
    }

    fn accepts(&self, elem: ElementKind) -> bool {
        match self {
            TensorData::Raw(_) => elem != ElementKind::String,
            other => std::mem::discriminant(other) == std::mem::discriminant(&TensorData::empty_for(elem)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TensorLiteral {
    pub name: String,
    pub elem: ElementKind,
    pub dims: TVec<i64>,
    pub data: TensorData,
}

trait LeBytes: Sized {
    const SIZE: usize;
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! le_bytes {
    ($($ty:ty: $n:expr),*) => {
        $(impl LeBytes for $ty {
            const SIZE: usize = $n;
            fn from_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $n];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }
        })*
    };
}

le_bytes!(i8: 1, i16: 2, i32: 4, i64: 8, u8: 1, u16: 2, u32: 4, u64: 8, f32: 4, f64: 8);

impl TensorLiteral {
    literal_accessors!(from_i8, as_i8_vec, i8, I8, I32);
    literal_accessors!(from_i16, as_i16_vec, i16, I16, I32);
    literal_accessors!(from_i32, as_i32_vec, i32, I32, I32);
    literal_accessors!(from_u8, as_u8_vec, u8, U8, I32);
    literal_accessors!(from_u16, as_u16_vec, u16, U16, I32);
    literal_accessors!(from_i64, as_i64_vec, i64, I64, I64);
    literal_accessors!(from_u32, as_u32_vec, u32, U32, U64);
    literal_accessors!(from_u64, as_u64_vec, u64, U64, U64);
    literal_accessors!(from_f32, as_f32_vec, f32, F32, F32);
    literal_accessors!(from_f64, as_f64_vec, f64, F64, F64);

    pub fn from_bool(name: impl Into<String>, dims: &[i64], values: &[bool]) -> TensorLiteral {
        TensorLiteral {
            name: name.into(),
            elem: ElementKind::Bool,
            dims: dims.iter().copied().collect(),
            data: TensorData::I32(values.iter().map(|&b| b as i32).collect()),
        }
    }

    /// Half floats travel as their bit patterns in the int32 payload.
    pub fn from_f16(name: impl Into<String>, dims: &[i64], values: &[f16]) -> TensorLiteral {
        TensorLiteral {
            name: name.into(),
            elem: ElementKind::F16,
            dims: dims.iter().copied().collect(),
            data: TensorData::I32(values.iter().map(|v| v.to_bits() as i32).collect()),
        }
    }

    pub fn from_strings(
        name: impl Into<String>,
        dims: &[i64],
        values: &[impl AsRef<str>],
    ) -> TensorLiteral {
        TensorLiteral {
            name: name.into(),
            elem: ElementKind::String,
            dims: dims.iter().copied().collect(),
            data: TensorData::Strings(values.iter().map(|s| s.as_ref().as_bytes().to_vec()).collect()),
        }
    }

    pub fn from_raw(
        name: impl Into<String>,
        elem: ElementKind,
        dims: &[i64],
        bytes: Vec<u8>,
    ) -> TensorLiteral {
        TensorLiteral { name: name.into(), elem, dims: dims.iter().copied().collect(), data: TensorData::Raw(bytes) }
    }

    pub fn with_name(self, name: impl Into<String>) -> TensorLiteral {
        TensorLiteral { name: name.into(), ..self }
    }

    pub fn as_bool_vec(&self) -> anyhow::Result<Vec<bool>> {
        anyhow::ensure!(self.elem == ElementKind::Bool, "Tensor {} holds {}, not bool", self.name, self.elem);
        match &self.data {
            TensorData::I32(v) => Ok(v.iter().map(|&x| x != 0).collect()),
            TensorData::Raw(bytes) => Ok(bytes.iter().map(|&x| x != 0).collect()),
            other => anyhow::bail!("Tensor {} has an unexpected payload {:?}", self.name, other),
        }
    }

    pub fn as_f16_vec(&self) -> anyhow::Result<Vec<f16>> {
        anyhow::ensure!(self.elem == ElementKind::F16, "Tensor {} holds {}, not float16", self.name, self.elem);
        match &self.data {
            TensorData::I32(v) => Ok(v.iter().map(|&x| f16::from_bits(x as u16)).collect()),
            TensorData::Raw(bytes) => {
                Ok(self.raw_values::<u16>(bytes)?.into_iter().map(f16::from_bits).collect())
            }
            other => anyhow::bail!("Tensor {} has an unexpected payload {:?}", self.name, other),
        }
    }

    pub fn as_string_vec(&self) -> anyhow::Result<Vec<String>> {
        match &self.data {
            TensorData::Strings(v) => v
                .iter()
                .map(|b| String::from_utf8(b.clone()).map_err(|e| anyhow::format_err!("Invalid UTF8 buffer in {}: {}", self.name, e)))
                .collect(),
            other => anyhow::bail!("Tensor {} has an unexpected payload {:?}", self.name, other),
        }
    }

    fn raw_values<T: LeBytes>(&self, bytes: &[u8]) -> anyhow::Result<Vec<T>> {
        anyhow::ensure!(
            bytes.len() % T::SIZE == 0,
            "Raw payload of {} is {} bytes, not a multiple of {}",
            self.name,
            bytes.len(),
            T::SIZE
        );
        Ok(bytes.chunks_exact(T::SIZE).map(T::from_le).collect())
    }

    /// Tensor type with the literal's dims as shape.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::tensor_with_shape(self.elem, Shape::new(self.dims.iter().copied()))
    }

    /// Product of the dims, `None` when it overflows. A literal without
    /// dims is a scalar.
    pub fn element_count(&self) -> Option<i64> {
        Shape::new(self.dims.iter().copied()).volume()
    }

    /// Number of elements actually present in the payload.
    pub fn payload_len(&self) -> usize {
        match &self.data {
            TensorData::Raw(bytes) => self.elem.size_of().map(|s| bytes.len() / s).unwrap_or(0),
            TensorData::F32(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::Strings(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::U64(v) => v.len(),
        }
    }

    /// Checks that the payload variant suits the element kind and that its
    /// length matches the dims.
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.dims.iter().all(|&d| d >= 0), "negative dimension in {:?}", self.dims);
        anyhow::ensure!(self.data.accepts(self.elem), "{} cannot be stored in this payload", self.elem);
        if let (TensorData::Raw(bytes), Some(size)) = (&self.data, self.elem.size_of()) {
            anyhow::ensure!(bytes.len() % size == 0, "raw payload of {} bytes for {}", bytes.len(), self.elem);
        }
        let expected = self
            .element_count()
            .ok_or_else(|| anyhow::format_err!("element count of dims {:?} overflows", self.dims))?;
        anyhow::ensure!(
            self.payload_len() as i64 == expected,
            "dims {:?} call for {} elements, payload has {}",
            self.dims,
            expected,
            self.payload_len()
        );
        Ok(())
    }
}

impl fmt::Display for TensorLiteral {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} {}{:?}", self.name, self.elem, self.dims.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_payloads() {
        let t = TensorLiteral::from_i64("c", &[1, 3], &[1, 2, 3]);
        assert_eq!(t.data, TensorData::I64(vec![1, 2, 3]));
        assert_eq!(t.as_i64_vec().unwrap(), vec![1, 2, 3]);
        assert!(t.as_i32_vec().is_err());
        t.check().unwrap();
    }

    #[test]
    fn narrow_ints_use_int32_storage() {
        let t = TensorLiteral::from_u8("u", &[2], &[7, 255]);
        assert_eq!(t.data, TensorData::I32(vec![7, 255]));
        assert_eq!(t.as_u8_vec().unwrap(), vec![7, 255]);
    }

    #[test]
    fn raw_payload() {
        let bytes = [1.5f32, -2.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let t = TensorLiteral::from_raw("r", ElementKind::F32, &[2], bytes);
        assert_eq!(t.as_f32_vec().unwrap(), vec![1.5, -2.0]);
        t.check().unwrap();
    }

    #[test]
    fn half_bits() {
        let values = [f16::from_f32(0.5), f16::from_f32(-3.0)];
        let t = TensorLiteral::from_f16("h", &[2], &values);
        assert_eq!(t.as_f16_vec().unwrap(), values.to_vec());
    }

    #[test]
    fn strings() {
        let t = TensorLiteral::from_strings("node_1_in_2", &[1], &["test"]);
        assert_eq!(t.as_string_vec().unwrap(), vec!["test".to_string()]);
        t.check().unwrap();
    }

    #[test]
    fn check_rejects_mismatch() {
        assert!(TensorLiteral::from_f32("x", &[2, 2], &[1.0, 2.0, 3.0]).check().is_err());
        let wrong_variant = TensorLiteral { data: TensorData::F64(vec![1.0]), ..TensorLiteral::from_f32("x", &[1], &[1.0]) };
        assert!(wrong_variant.check().is_err());
        assert!(TensorLiteral::from_raw("s", ElementKind::String, &[1], vec![0]).check().is_err());
        TensorLiteral::from_f32("scalar", &[], &[4.0]).check().unwrap();
    }

    #[test]
    fn huge_dims_are_rejected() {
        let t = TensorLiteral::from_f32("w", &[1 << 32, 1 << 32], &[]);
        assert_eq!(t.element_count(), None);
        assert!(t.check().unwrap_err().to_string().contains("overflows"));
        assert_eq!(TensorLiteral::from_f32("e", &[0, 1 << 40], &[]).element_count(), Some(0));
    }
}
