use crate::codec::{FromHost, ToHost};

/// Element representation of a tensor.
///
/// The numeric tag of each variant is stable and is what the host receives from
/// `dtype`. Tags 0 (half float) and 3 (bool) are reserved and unsupported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Float32,
        DType::Float64,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::Uint8,
        DType::Uint16,
        DType::Uint32,
        DType::Uint64,
    ];

    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::Int8 | DType::Uint8 => 1,
            DType::Int16 | DType::Uint16 => 2,
            DType::Float32 | DType::Int32 | DType::Uint32 => 4,
            DType::Float64 | DType::Int64 | DType::Uint64 => 8,
        }
    }

    pub fn tag(self) -> i32 {
        match self {
            DType::Float32 => 1,
            DType::Float64 => 2,
            DType::Int16 => 4,
            DType::Int32 => 5,
            DType::Int64 => 6,
            DType::Uint8 => 7,
            DType::Uint16 => 8,
            DType::Uint32 => 9,
            DType::Uint64 => 10,
            DType::Int8 => 11,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| i64::from(dtype.tag()) == tag)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }
}

/// Intermediate used for dtype conversion. Every supported integer fits an i128
/// exactly, so integer-to-integer casts never go through a float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i128),
    Float(f64),
}

/// A fixed-width element type that can live in tensor storage.
pub trait Element: Copy + Send + Sync + 'static + FromHost + ToHost {
    const DTYPE: DType;

    /// Decode from exactly `DTYPE.size_in_bytes()` native-endian bytes.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Encode into exactly `DTYPE.size_in_bytes()` native-endian bytes.
    fn write_ne(self, out: &mut [u8]);

    fn to_scalar(self) -> Scalar;

    /// Convert with `as` semantics: integers wrap, float to integer saturates.
    fn from_scalar(scalar: Scalar) -> Self;

    /// Element used to fill the fixed `[0, 1, ..., n)` demo slices.
    fn from_index(index: usize) -> Self {
        Self::from_scalar(Scalar::Int(index as i128))
    }
}

macro_rules! int_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }

            fn write_ne(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Int(self as i128)
            }

            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Int(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                }
            }
        }
    )*};
}

int_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
);

macro_rules! float_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {$(
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }

            fn write_ne(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Int(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                }
            }
        }
    )*};
}

float_element!(f32 => Float32, f64 => Float64);

/// Run `$body` with `$T` bound to the Rust element type of a runtime dtype.
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::tensor::DType::Float32 => {
                type $T = f32;
                $body
            }
            $crate::tensor::DType::Float64 => {
                type $T = f64;
                $body
            }
            $crate::tensor::DType::Int8 => {
                type $T = i8;
                $body
            }
            $crate::tensor::DType::Int16 => {
                type $T = i16;
                $body
            }
            $crate::tensor::DType::Int32 => {
                type $T = i32;
                $body
            }
            $crate::tensor::DType::Int64 => {
                type $T = i64;
                $body
            }
            $crate::tensor::DType::Uint8 => {
                type $T = u8;
                $body
            }
            $crate::tensor::DType::Uint16 => {
                type $T = u16;
                $body
            }
            $crate::tensor::DType::Uint32 => {
                type $T = u32;
                $body
            }
            $crate::tensor::DType::Uint64 => {
                type $T = u64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_dtype;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_and_are_unique() {
        for dtype in DType::ALL {
            assert_eq!(DType::from_tag(i64::from(dtype.tag())), Some(dtype));
        }
        let mut tags: Vec<_> = DType::ALL.iter().map(|d| d.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), DType::ALL.len());
    }

    #[test]
    fn reserved_tags_are_unsupported() {
        assert_eq!(DType::from_tag(0), None);
        assert_eq!(DType::from_tag(3), None);
        assert_eq!(DType::from_tag(-1), None);
    }

    #[test]
    fn float32_is_tag_one() {
        assert_eq!(DType::Float32.tag(), 1);
        assert_eq!(DType::Float32.size_in_bytes(), 4);
    }

    #[test]
    fn from_index_wraps_like_twos_complement() {
        assert_eq!(i8::from_index(200), -56);
        assert_eq!(u8::from_index(99), 99);
        assert_eq!(f32::from_index(42), 42.0);
    }

    #[test]
    fn scalar_casts_are_exact_for_wide_ints() {
        let big = u64::MAX - 1;
        assert_eq!(u64::from_scalar(big.to_scalar()), big);
        assert_eq!(i64::from_scalar(Scalar::Float(1e30)), i64::MAX);
    }
}
