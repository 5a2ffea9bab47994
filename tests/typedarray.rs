use hostbridge::{Bridge, Element, ErrorKind, HostValue, TypedArray, TypedArrayKind, ViewPolicy};

fn base<T: Element>() -> TypedArray {
    let values: Vec<T> = (0..100).map(T::from_index).collect();
    TypedArray::from_slice(&values)
}

fn slice(bridge: &Bridge, name: &str) -> TypedArray {
    let value = bridge.call(name, &[]).unwrap();
    value.as_typed_array().cloned().unwrap()
}

#[test]
fn slices_come_back_as_matching_kinds() {
    let bridge = Bridge::default();
    let cases = [
        ("slice_to_Int8Array", TypedArrayKind::Int8Array, base::<i8>()),
        ("slice_to_Uint8Array", TypedArrayKind::Uint8Array, base::<u8>()),
        ("slice_to_Int16Array", TypedArrayKind::Int16Array, base::<i16>()),
        ("slice_to_Uint16Array", TypedArrayKind::Uint16Array, base::<u16>()),
        ("slice_to_Int32Array", TypedArrayKind::Int32Array, base::<i32>()),
        ("slice_to_Uint32Array", TypedArrayKind::Uint32Array, base::<u32>()),
        ("slice_to_BigInt64Array", TypedArrayKind::BigInt64Array, base::<i64>()),
        ("slice_to_BigUint64Array", TypedArrayKind::BigUint64Array, base::<u64>()),
        ("slice_to_Float32Array", TypedArrayKind::Float32Array, base::<f32>()),
        ("slice_to_Float64Array", TypedArrayKind::Float64Array, base::<f64>()),
    ];

    for (name, kind, expected) in cases {
        let array = slice(&bridge, name);
        assert_eq!(array.kind(), kind, "{name}");
        assert_eq!(array.len(), 100, "{name}");
        assert_eq!(array.policy(), ViewPolicy::Copy, "{name}");
        assert_eq!(array, expected, "{name}");
    }
}

#[test]
fn int8_slice_matches_sequence() {
    let bridge = Bridge::default();
    let array = slice(&bridge, "slice_to_Int8Array");
    let expected: Vec<i8> = (0..100).map(|i| i as i8).collect();
    assert_eq!(array.to_vec::<i8>().unwrap(), expected);
}

#[test]
fn bigint_kinds_hold_bigints() {
    let bridge = Bridge::default();
    let array = slice(&bridge, "slice_to_BigUint64Array");
    assert_eq!(array.get(99).unwrap(), HostValue::bigint(99u64));
    assert_eq!(array.to_vec::<u64>().unwrap(), (0..100).collect::<Vec<u64>>());
}

#[test]
fn slice_out_is_an_independent_copy() {
    let bridge = Bridge::default();
    let first = slice(&bridge, "testSliceOut");
    let second = slice(&bridge, "testSliceOut");
    assert_eq!(first.kind(), TypedArrayKind::Float32Array);
    assert!(!first.is_shared());

    first.set(0, &HostValue::number(42)).unwrap();
    assert_eq!(second.get(0).unwrap(), HostValue::number(0));
}

#[test]
fn slice_in_accepts_float32_arrays_only() {
    let bridge = Bridge::default();
    let out = bridge.call("testSliceOut", &[]).unwrap();
    assert_eq!(bridge.call("testSliceIn", &[out]).unwrap(), HostValue::Undefined);

    let err = bridge
        .call("testSliceIn", &[TypedArray::from_slice(&[1.0f64]).into()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DtypeMismatch);

    let err = bridge.call("testSliceIn", &[HostValue::number(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeError);
}
