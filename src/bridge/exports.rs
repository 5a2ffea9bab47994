use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::trace;

use super::bridge::Bridge;
use crate::{
    codec::{FromHost, NativeAdd, NativeRecord, NativeString, ToHost},
    handle::Handle,
    host::HostValue,
    tensor::Element,
    utils::error::{BridgeError, Result},
    view::{TypedArray, ViewBuilder},
};

type Export = fn(&Bridge, &[HostValue]) -> Result<HostValue>;

const HELLO: &str = "Hello, World!";
const SLICE_LEN: usize = 100;

crate::native_record! {
    #[derive(Clone, Debug, PartialEq)]
    pub struct Sample {
        pub a: i32,
        pub b: i32,
        pub c: String,
    }
}

crate::native_record! {
    #[derive(Clone, Debug, PartialEq)]
    pub struct Pair {
        pub a: i32,
        pub b: i64,
    }
}

// One row per dtype: element type, dtype name, buffer export prefix, typed array kind.
macro_rules! per_dtype {
    ($table:ident; $($ty:ty => $name:literal, $lower:literal, $array:literal);* $(;)?) => {$(
        $table.insert(concat!("tensorFrom", $name, "Buffer"), tensor_from_buffer::<$ty> as Export);
        $table.insert(concat!($lower, "Buffer"), buffer::<$ty> as Export);
        $table.insert(concat!("dtype", $name), dtype_tag::<$ty> as Export);
        $table.insert(concat!("slice_to_", $array), slice_to::<$ty> as Export);
        $table.insert(concat!("add_", stringify!($ty)), add::<$ty> as Export);
    )*};
}

static EXPORTS: Lazy<HashMap<&'static str, Export>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, Export> = HashMap::new();

    per_dtype! { table;
        i8 => "Int8", "int8", "Int8Array";
        u8 => "Uint8", "uint8", "Uint8Array";
        i16 => "Int16", "int16", "Int16Array";
        u16 => "Uint16", "uint16", "Uint16Array";
        i32 => "Int32", "int32", "Int32Array";
        u32 => "Uint32", "uint32", "Uint32Array";
        i64 => "Int64", "int64", "BigInt64Array";
        u64 => "Uint64", "uint64", "BigUint64Array";
        f32 => "Float32", "float32", "Float32Array";
        f64 => "Float64", "float64", "Float64Array";
    }

    table.insert("bool_true", bool_true);
    table.insert("bool_false", bool_false);
    table.insert("negate_bool", negate_bool);

    table.insert("round_trip_string", round_trip_string);
    table.insert("concat_strings", concat_strings);
    table.insert("new_string", new_string);

    table.insert("returns_struct", returns_struct);
    table.insert("round_trip_struct", round_trip_struct);
    table.insert("wrapped_struct", wrapped_struct);
    table.insert("wrapped_struct_get_a", wrapped_struct_get_a);
    table.insert("wrapped_struct_get_b", wrapped_struct_get_b);

    table.insert("createTensor", create_tensor);
    table.insert("setRowMajor", set_row_major);
    table.insert("setColMajor", set_col_major);
    table.insert("isRowMajor", is_row_major);
    table.insert("isColMajor", is_col_major);
    table.insert("dtype", dtype);
    table.insert("bytesUsed", bytes_used);
    table.insert("asContiguousTensor", as_contiguous_tensor);
    table.insert("elements", elements);
    table.insert("bytes", bytes);
    table.insert("ndim", ndim);
    table.insert("shape", shape);
    table.insert("reshape", reshape);
    table.insert("transpose", transpose);
    table.insert("flatten", flatten);
    table.insert("copy", copy);
    table.insert("astype", astype);
    table.insert("scalar", scalar);
    table.insert("dispose", dispose);

    table.insert("testSliceOut", slice_to::<f32>);
    table.insert("testSliceIn", test_slice_in);

    table
});

pub(crate) fn call(bridge: &Bridge, name: &str, args: &[HostValue]) -> Result<HostValue> {
    let export = EXPORTS
        .get(name)
        .ok_or_else(|| BridgeError::UnknownExport(name.to_string()))?;
    trace!(export = name, argc = args.len(), "call");
    export(bridge, args)
}

/// Every export name, sorted.
pub fn export_names() -> Vec<&'static str> {
    let mut names: Vec<_> = EXPORTS.keys().copied().collect();
    names.sort_unstable();
    names
}

// A missing argument reads as `undefined`, as it does in the host.
fn arg<T: FromHost>(args: &[HostValue], index: usize) -> Result<T> {
    match args.get(index) {
        Some(value) => T::from_host(value),
        None => T::from_host(&HostValue::Undefined),
    }
}

// Lengths arrive as plain numbers from `array.length`, but a bigint is accepted too.
fn length_arg(args: &[HostValue], index: usize) -> Result<i64> {
    match args.get(index) {
        Some(HostValue::BigInt(_)) => arg::<i64>(args, index),
        Some(HostValue::Number(n)) if n.is_finite() && n.fract() == 0.0 => Ok(*n as i64),
        Some(HostValue::Number(n)) => Err(BridgeError::range_error(n, "length")),
        Some(other) => Err(BridgeError::type_error("number", other.type_name())),
        None => Err(BridgeError::type_error("number", "undefined")),
    }
}

/* Numbers and booleans */

fn add<T: FromHost + ToHost + NativeAdd>(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let a: T = arg(args, 0)?;
    let b: T = arg(args, 1)?;
    Ok(a.native_add(b).to_host())
}

fn bool_true(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(true.to_host())
}

fn bool_false(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(false.to_host())
}

fn negate_bool(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let value: bool = arg(args, 0)?;
    Ok((!value).to_host())
}

/* Strings */

fn round_trip_string(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let value: NativeString = arg(args, 0)?;
    value.to_host()
}

fn concat_strings(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let parts = args
        .iter()
        .map(NativeString::from_host)
        .collect::<Result<Vec<_>>>()?;
    NativeString::concat(&parts).to_host()
}

fn new_string(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(HELLO.to_host())
}

/* Structs */

fn returns_struct(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    let sample = Sample {
        a: 1,
        b: 2,
        c: HELLO.to_string(),
    };
    Ok(sample.to_host())
}

fn round_trip_struct(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let sample = Sample::from_host(args.first().unwrap_or(&HostValue::Undefined))?;
    let bump = |field: i32| {
        field
            .checked_add(1)
            .ok_or_else(|| BridgeError::range_error(field, "i32"))
    };
    let bumped = Sample {
        a: bump(sample.a)?,
        b: bump(sample.b)?,
        c: sample.c,
    };
    Ok(bumped.to_host())
}

fn wrapped_struct(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let pair = Pair {
        a: arg(args, 0)?,
        b: arg(args, 1)?,
    };
    Ok(bridge.wrap(pair)?.to_host())
}

fn wrapped_struct_get_a(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    bridge.wrapped_field(arg(args, 0)?, "a")
}

fn wrapped_struct_get_b(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    bridge.wrapped_field(arg(args, 0)?, "b")
}

/* Tensors */

fn tensor_from_buffer<T: Element>(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let length = length_arg(args, 0)?;
    let array: TypedArray = arg(args, 1)?;
    let elements = array.to_vec::<T>()?;
    Ok(bridge.tensor_from_buffer(length, &elements)?.to_host())
}

fn create_tensor(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let shape: TypedArray = arg(args, 0)?;
    Ok(bridge.create_tensor(&shape.to_vec::<i64>()?)?.to_host())
}

fn set_row_major(bridge: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    bridge.set_row_major(true);
    Ok(HostValue::Undefined)
}

fn set_col_major(bridge: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    bridge.set_row_major(false);
    Ok(HostValue::Undefined)
}

fn is_row_major(bridge: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.is_row_major().to_host())
}

fn is_col_major(bridge: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok((!bridge.is_row_major()).to_host())
}

fn buffer<T: Element>(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.buffer_of::<T>(arg(args, 0)?)?.to_host())
}

fn dtype_tag<T: Element>(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(i64::from(T::DTYPE.tag()).to_host())
}

fn dtype(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let dtype = bridge.dtype(arg(args, 0)?)?;
    Ok(i64::from(dtype.tag()).to_host())
}

fn bytes_used(bridge: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.bytes_used().to_host())
}

fn as_contiguous_tensor(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.as_contiguous(arg(args, 0)?)?.to_host())
}

fn elements(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok((bridge.elements(arg(args, 0)?)? as u64).to_host())
}

fn bytes(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok((bridge.bytes(arg(args, 0)?)? as u64).to_host())
}

fn ndim(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok((bridge.ndim(arg(args, 0)?)? as u32).to_host())
}

fn shape(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let dims: Vec<i64> = bridge
        .shape(arg(args, 0)?)?
        .into_iter()
        .map(|d| d as i64)
        .collect();
    Ok(ViewBuilder::copy_slice(&dims).to_host())
}

fn reshape(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let handle: Handle = arg(args, 0)?;
    let shape: TypedArray = arg(args, 1)?;
    let dims = shape.to_vec::<i64>()?;
    Ok(bridge.reshape(handle, &dims)?.to_host())
}

fn transpose(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.transpose(arg(args, 0)?)?.to_host())
}

fn flatten(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.flatten(arg(args, 0)?)?.to_host())
}

fn copy(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    Ok(bridge.copy(arg(args, 0)?)?.to_host())
}

fn astype(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let handle: Handle = arg(args, 0)?;
    let tag: i64 = arg(args, 1)?;
    Ok(bridge.astype(handle, tag)?.to_host())
}

fn scalar(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    bridge.scalar(arg(args, 0)?)
}

fn dispose(bridge: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    bridge.dispose(arg(args, 0)?)?;
    Ok(HostValue::Undefined)
}

/* Slices */

// The slice is transient, so the host always receives a copy.
fn slice_to<T: Element>(_: &Bridge, _: &[HostValue]) -> Result<HostValue> {
    let slice: Vec<T> = (0..SLICE_LEN).map(T::from_index).collect();
    Ok(ViewBuilder::copy_slice(&slice).to_host())
}

fn test_slice_in(_: &Bridge, args: &[HostValue]) -> Result<HostValue> {
    let view: TypedArray = arg(args, 0)?;
    let slice = view.to_vec::<f32>()?;
    trace!(len = slice.len(), "received float32 slice");
    Ok(HostValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn unknown_names_are_rejected() {
        let bridge = Bridge::default();
        let err = bridge.call("fl_save", &[]).unwrap_err();
        assert_eq!(err, BridgeError::UnknownExport("fl_save".to_string()));
    }

    #[test]
    fn every_dtype_has_its_exports() {
        let names = export_names();
        for name in [
            "tensorFromUint64Buffer",
            "int8Buffer",
            "dtypeUint64",
            "slice_to_BigInt64Array",
            "add_f64",
        ] {
            assert!(names.contains(&name), "{name}");
        }
        assert_eq!(names.iter().filter(|n| n.starts_with("tensorFrom")).count(), 10);
        assert_eq!(names.iter().filter(|n| n.starts_with("slice_to_")).count(), 10);
    }

    #[test]
    fn missing_arguments_read_as_undefined() {
        let bridge = Bridge::default();
        let err = bridge.call("add_i32", &[HostValue::number(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn lengths_accept_numbers_and_bigints() {
        let bridge = Bridge::default();
        let array = HostValue::from(TypedArray::from_slice(&[1.0f32, 2.0]));
        let by_number = bridge
            .call("tensorFromFloat32Buffer", &[HostValue::number(2), array.clone()])
            .unwrap();
        let by_bigint = bridge
            .call("tensorFromFloat32Buffer", &[HostValue::bigint(2), array.clone()])
            .unwrap();
        assert_ne!(by_number, by_bigint);

        let err = bridge
            .call("tensorFromFloat32Buffer", &[HostValue::number(1.5), array])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
    }
}
