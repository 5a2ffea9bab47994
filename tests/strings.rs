use hostbridge::{Bridge, ErrorKind, HostValue, codec::NativeString};

#[test]
fn round_trips_strings() {
    let bridge = Bridge::default();
    for text in ["", "Hello, World!", "héllo wörld", "日本語", "emoji 🦀"] {
        let back = bridge
            .call("round_trip_string", &[HostValue::from(text)])
            .unwrap();
        assert_eq!(back, HostValue::from(text));
    }
}

#[test]
fn concatenates_any_number_of_strings() {
    let bridge = Bridge::default();
    let joined = bridge
        .call(
            "concat_strings",
            &["Hello, ".into(), "World".into(), "!".into()],
        )
        .unwrap();
    assert_eq!(joined, HostValue::from("Hello, World!"));

    assert_eq!(bridge.call("concat_strings", &[]).unwrap(), HostValue::from(""));
    let joined = bridge
        .call("concat_strings", &["a".into(), "".into(), "ü".into(), "c".into()])
        .unwrap();
    assert_eq!(joined, HostValue::from("aüc"));
}

#[test]
fn new_string_is_fixed() {
    let bridge = Bridge::default();
    assert_eq!(
        bridge.call("new_string", &[]).unwrap(),
        HostValue::from("Hello, World!")
    );
}

#[test]
fn non_strings_are_type_errors() {
    let bridge = Bridge::default();
    let err = bridge
        .call("concat_strings", &["a".into(), HostValue::number(1)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeError);
}

#[test]
fn invalid_utf8_reports_the_valid_prefix() {
    let bytes = NativeString::from_bytes(vec![b'o', b'k', 0xff, b'!']);
    let err = bytes.to_host().unwrap_err();
    assert_eq!(err, hostbridge::BridgeError::EncodingError { valid_up_to: 2 });
    assert_eq!(err.kind(), ErrorKind::EncodingError);
}
