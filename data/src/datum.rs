//! The closed set of tensor element kinds.
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum ElementKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    String,
}

impl ElementKind {
    pub const ALL: [ElementKind; 13] = [
        ElementKind::Bool,
        ElementKind::U8,
        ElementKind::U16,
        ElementKind::U32,
        ElementKind::U64,
        ElementKind::I8,
        ElementKind::I16,
        ElementKind::I32,
        ElementKind::I64,
        ElementKind::F16,
        ElementKind::F32,
        ElementKind::F64,
        ElementKind::String,
    ];

    pub fn is_unsigned(&self) -> bool {
        matches!(self, ElementKind::U8 | ElementKind::U16 | ElementKind::U32 | ElementKind::U64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, ElementKind::I8 | ElementKind::I16 | ElementKind::I32 | ElementKind::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementKind::F16 | ElementKind::F32 | ElementKind::F64)
    }

    /// Kinds allowed as map keys.
    pub fn is_map_key(&self) -> bool {
        matches!(self, ElementKind::I32 | ElementKind::I64 | ElementKind::String)
    }

    /// Width of one element in a little-endian raw payload. `None` for
    /// strings, which are never stored raw.
    pub fn size_of(&self) -> Option<usize> {
        use ElementKind::*;
        match self {
            Bool | U8 | I8 => Some(1),
            U16 | I16 | F16 => Some(2),
            U32 | I32 | F32 => Some(4),
            U64 | I64 | F64 => Some(8),
            String => None,
        }
    }

    /// Name used inside type strings, e.g. `int32` in `tensor(int32)`.
    pub fn type_string_name(&self) -> &'static str {
        use ElementKind::*;
        match self {
            Bool => "bool",
            U8 => "uint8",
            U16 => "uint16",
            U32 => "uint32",
            U64 => "uint64",
            I8 => "int8",
            I16 => "int16",
            I32 => "int32",
            I64 => "int64",
            F16 => "float16",
            F32 => "float",
            F64 => "double",
            String => "string",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.type_string_name())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ElementKind::Bool),
            "uint8" => Ok(ElementKind::U8),
            "uint16" => Ok(ElementKind::U16),
            "uint32" => Ok(ElementKind::U32),
            "uint64" => Ok(ElementKind::U64),
            "int8" => Ok(ElementKind::I8),
            "int16" => Ok(ElementKind::I16),
            "int32" => Ok(ElementKind::I32),
            "int64" => Ok(ElementKind::I64),
            "float16" => Ok(ElementKind::F16),
            "float" | "float32" => Ok(ElementKind::F32),
            "double" | "float64" => Ok(ElementKind::F64),
            "string" => Ok(ElementKind::String),
            _ => anyhow::bail!("Unknown element kind {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.type_string_name().parse::<ElementKind>().unwrap(), kind);
        }
    }

    #[test]
    fn aliases() {
        assert_eq!("float32".parse::<ElementKind>().unwrap(), ElementKind::F32);
        assert_eq!("float64".parse::<ElementKind>().unwrap(), ElementKind::F64);
        assert!("complex64".parse::<ElementKind>().is_err());
    }

    #[test]
    fn map_keys() {
        let keys: Vec<_> = ElementKind::ALL.iter().filter(|k| k.is_map_key()).collect();
        assert_eq!(keys, vec![&ElementKind::I32, &ElementKind::I64, &ElementKind::String]);
    }
}
