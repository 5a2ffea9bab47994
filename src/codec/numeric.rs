use num_bigint::BigInt;

use super::{FromHost, ToHost};
use crate::{
    host::HostValue,
    utils::error::{BridgeError, Result},
};

/// Addition carried out in the native width: integers wrap on overflow, floats follow IEEE.
pub trait NativeAdd: Copy {
    fn native_add(self, rhs: Self) -> Self;
}

fn expect_number(value: &HostValue, target: &'static str) -> Result<f64> {
    match value {
        HostValue::Number(n) => Ok(*n),
        other => Err(BridgeError::type_error(
            format!("number for {target}"),
            other.type_name(),
        )),
    }
}

fn expect_bigint<'a>(value: &'a HostValue, target: &'static str) -> Result<&'a BigInt> {
    match value {
        HostValue::BigInt(n) => Ok(n),
        other => Err(BridgeError::type_error(
            format!("bigint for {target}"),
            other.type_name(),
        )),
    }
}

// Integers up to 32 bits travel as host numbers. Fractions, NaN and infinities
// are not integers of any width, so they are range errors rather than truncated.
macro_rules! number_backed_int {
    ($($ty:ty),* $(,)?) => {$(
        impl FromHost for $ty {
            fn from_host(value: &HostValue) -> Result<Self> {
                let n = expect_number(value, stringify!($ty))?;
                if n.fract() != 0.0 || n < <$ty>::MIN as f64 || n > <$ty>::MAX as f64 {
                    return Err(BridgeError::range_error(n, stringify!($ty)));
                }
                Ok(n as $ty)
            }
        }

        impl ToHost for $ty {
            fn to_host(self) -> HostValue {
                HostValue::Number(self as f64)
            }
        }

        impl NativeAdd for $ty {
            fn native_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
        }
    )*};
}

number_backed_int!(i8, i16, i32, u8, u16, u32);

// 64-bit integers only ever cross as host big integers, never as numbers.
macro_rules! bigint_backed_int {
    ($($ty:ty),* $(,)?) => {$(
        impl FromHost for $ty {
            fn from_host(value: &HostValue) -> Result<Self> {
                let n = expect_bigint(value, stringify!($ty))?;
                <$ty>::try_from(n).map_err(|_| BridgeError::range_error(n, stringify!($ty)))
            }
        }

        impl ToHost for $ty {
            fn to_host(self) -> HostValue {
                HostValue::BigInt(BigInt::from(self))
            }
        }

        impl NativeAdd for $ty {
            fn native_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
        }
    )*};
}

bigint_backed_int!(i64, u64);

impl FromHost for f32 {
    fn from_host(value: &HostValue) -> Result<Self> {
        let n = expect_number(value, "f32")?;
        if n.is_finite() && n.abs() > f32::MAX as f64 {
            return Err(BridgeError::range_error(n, "f32"));
        }
        Ok(n as f32)
    }
}

impl ToHost for f32 {
    fn to_host(self) -> HostValue {
        HostValue::Number(self as f64)
    }
}

impl NativeAdd for f32 {
    fn native_add(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl FromHost for f64 {
    fn from_host(value: &HostValue) -> Result<Self> {
        expect_number(value, "f64")
    }
}

impl ToHost for f64 {
    fn to_host(self) -> HostValue {
        HostValue::Number(self)
    }
}

impl NativeAdd for f64 {
    fn native_add(self, rhs: Self) -> Self {
        self + rhs
    }
}
