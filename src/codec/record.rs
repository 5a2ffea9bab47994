use super::FromHost;
use crate::{
    host::{HostObject, HostValue},
    utils::error::{BridgeError, Result},
};

/// A native aggregate with a fixed list of typed fields.
///
/// Implementations are generated by [`native_record!`](crate::native_record); the
/// conversions are value-preserving in both directions.
pub trait NativeRecord: Sized {
    const NAME: &'static str;
    const FIELDS: &'static [&'static str];

    /// Host object with one entry per field, in declaration order.
    fn to_host(&self) -> HostValue;

    fn from_host(value: &HostValue) -> Result<Self>;

    /// A single field as a host value, or `None` for an undeclared name.
    fn field(&self, name: &str) -> Option<HostValue>;
}

pub fn expect_object<'a>(value: &'a HostValue, record: &'static str) -> Result<&'a HostObject> {
    value
        .as_object()
        .ok_or_else(|| BridgeError::type_error(format!("object for {record}"), value.type_name()))
}

/// Read one declared field. `undefined` counts as absent, matching how the host
/// treats a key that was never set.
pub fn read_field<T: FromHost>(object: &HostObject, field: &'static str) -> Result<T> {
    let value = match object.get(field) {
        Some(value) if !value.is_undefined() => value,
        _ => {
            return Err(BridgeError::MissingField {
                field: field.to_string(),
            });
        }
    };

    T::from_host(value).map_err(|err| {
        BridgeError::type_error(
            format!("a value for field `{field}` ({err})"),
            value.type_name(),
        )
    })
}

/// Declare a struct together with its [`NativeRecord`] implementation.
///
/// Every field type must implement `Clone`, [`FromHost`] and
/// [`ToHost`](crate::codec::ToHost).
#[macro_export]
macro_rules! native_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($fvis:vis $field:ident : $fty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $fty),*
        }

        impl $crate::codec::record::NativeRecord for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn to_host(&self) -> $crate::host::HostValue {
                let mut object = $crate::host::HostObject::new();
                $(
                    object.insert(
                        stringify!($field),
                        $crate::codec::ToHost::to_host(::core::clone::Clone::clone(&self.$field)),
                    );
                )*
                $crate::host::HostValue::Object(object)
            }

            fn from_host(value: &$crate::host::HostValue) -> $crate::utils::error::Result<Self> {
                let object = $crate::codec::record::expect_object(value, stringify!($name))?;
                ::core::result::Result::Ok(Self {
                    $($field: $crate::codec::record::read_field::<$fty>(object, stringify!($field))?),*
                })
            }

            fn field(&self, name: &str) -> ::core::option::Option<$crate::host::HostValue> {
                $(
                    if name == stringify!($field) {
                        return ::core::option::Option::Some($crate::codec::ToHost::to_host(
                            ::core::clone::Clone::clone(&self.$field),
                        ));
                    }
                )*
                ::core::option::Option::None
            }
        }
    };
}
