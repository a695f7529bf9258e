#[macro_export]
macro_rules! tvec {
    // count helper: transform any expression into 1
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::TVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ tvec!(@one $x))*;
        #[allow(unused_mut)]
        let mut vec = $crate::TVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::TVec::from_vec(vec![$($x,)*])
        }
    });
}

/// Implements the typed `TensorLiteral` constructor and accessor for one
/// element kind stored in one payload variant.
macro_rules! literal_accessors {
    ($ctor:ident, $getter:ident, $ty:ty, $kind:ident, $variant:ident) => {
        pub fn $ctor(name: impl Into<String>, dims: &[i64], values: &[$ty]) -> TensorLiteral {
            TensorLiteral {
                name: name.into(),
                elem: ElementKind::$kind,
                dims: dims.iter().copied().collect(),
                data: TensorData::$variant(values.iter().map(|v| (*v).into()).collect()),
            }
        }

        pub fn $getter(&self) -> anyhow::Result<Vec<$ty>> {
            anyhow::ensure!(
                self.elem == ElementKind::$kind,
                "Tensor {} holds {}, not {}",
                self.name,
                self.elem,
                ElementKind::$kind
            );
            match &self.data {
                TensorData::$variant(v) => v
                    .iter()
                    .map(|x| <$ty>::try_from(*x).map_err(|_| anyhow::format_err!("{} out of range", x)))
                    .collect(),
                TensorData::Raw(bytes) => self.raw_values::<$ty>(bytes),
                other => anyhow::bail!("Tensor {} has an unexpected payload {:?}", self.name, other),
            }
        }
    };
}
