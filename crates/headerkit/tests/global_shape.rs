//! The process-wide output shape.
//!
//! Lives in its own test binary: installing the shape affects every later
//! lookup in the process.

#![allow(clippy::unwrap_used)]

use headerkit::{Header, Headers, OneOrMany, OutputShape, ParseOptions, parse, parse_with};

fn install() {
    let _ = OutputShape::install(OutputShape::AlwaysMany);
    assert_eq!(OutputShape::global(), OutputShape::AlwaysMany);
}

#[test]
fn test_installed_shape_applies_to_parsing() {
    install();

    let headers = parse("Host: developer.mozilla.org\r\nAccept: text/html, */*;q=0.8");
    assert!(matches!(headers.get("host"), Some(OneOrMany::Many(v)) if v.len() == 1));

    let accept = headers.get_all("accept");
    assert_eq!(accept[1].get("q"), Some(OneOrMany::Many(vec!["0.8".to_string()])));
}

#[test]
fn test_installed_shape_applies_to_new_values() {
    install();

    let header = Header::new("Content-Type", "text/html; charset=UTF-8").unwrap();
    assert_eq!(header.get("charset"), Some(OneOrMany::Many(vec!["UTF-8".to_string()])));

    let mut headers = Headers::new();
    headers.push(header);
    assert!(matches!(headers.get("content-type"), Some(OneOrMany::Many(_))));
}

#[test]
fn test_second_install_is_rejected() {
    install();
    assert_eq!(
        OutputShape::install(OutputShape::Flexible),
        Err(OutputShape::AlwaysMany)
    );
}

#[test]
fn test_explicit_options_override_installed_shape() {
    install();

    let options = ParseOptions::new().with_output_shape(OutputShape::Flexible);
    let headers = parse_with("Host: a", &options);
    assert!(matches!(headers.get("host"), Some(OneOrMany::One(_))));
}
