//! Answer-file parser: never panics, and whatever it accepts survives the
//! canonical serializer unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(set) = curvegate_domain::parse_answers("fuzz", text) else {
        return;
    };
    let again = curvegate_domain::parse_answers("fuzz", &curvegate_domain::serialize_answers(&set))
        .expect("serialized answers must parse");
    assert_eq!(again, set);
});
