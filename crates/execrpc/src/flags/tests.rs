//! Unit tests for invocation flag parsing.

use rstest::{fixture, rstest};

use super::*;
use crate::procedure::Procedure;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|&value| value.to_owned()).collect()
}

#[fixture]
fn echo_spec() -> Spec {
    Spec::new(vec![
        Procedure::with_args("/echo.v1.EchoService/Echo", vec!["echo".into(), "request".into()])
            .expect("valid procedure"),
        Procedure::new("/echo.v1.EchoService/List").expect("valid procedure"),
    ])
    .expect("valid spec")
}

// ---------------------------------------------------------------------------
// Handshake flags
// ---------------------------------------------------------------------------

#[rstest]
fn protocol_flag_parses(echo_spec: Spec) {
    let invocation = parse(&args(&["--protocol"]), &echo_spec, None).expect("parses");
    assert!(matches!(invocation, Invocation::Protocol));
}

#[rstest]
#[case::space_separated(&["--spec", "--format", "json"])]
#[case::equals_separated(&["--spec", "--format=json"])]
#[case::upper_case_value(&["--spec", "--format", "JSON"])]
fn spec_flag_parses_with_format(echo_spec: Spec, #[case] values: &[&str]) {
    let invocation = parse(&args(values), &echo_spec, None).expect("parses");
    match invocation {
        Invocation::PrintSpec { format } => assert_eq!(format, Format::Json),
        other => panic!("expected spec invocation, got: {other:?}"),
    }
}

#[rstest]
fn spec_flag_defaults_to_binary(echo_spec: Spec) {
    let invocation = parse(&args(&["--spec"]), &echo_spec, None).expect("parses");
    match invocation {
        Invocation::PrintSpec { format } => assert_eq!(format, Format::Binary),
        other => panic!("expected spec invocation, got: {other:?}"),
    }
}

#[rstest]
fn protocol_and_spec_are_mutually_exclusive(echo_spec: Spec) {
    let err = parse(&args(&["--protocol", "--spec"]), &echo_spec, None)
        .expect_err("conflicting flags should fail");
    assert!(matches!(err, Error::Usage { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// Selector and rejection
// ---------------------------------------------------------------------------

#[rstest]
fn selector_collects_positional_args(echo_spec: Spec) {
    let invocation =
        parse(&args(&["echo", "request", "--format", "json"]), &echo_spec, None).expect("parses");
    match invocation {
        Invocation::Call { selector, format } => {
            assert_eq!(selector, vec!["echo", "request"]);
            assert_eq!(format, Format::Json);
        }
        other => panic!("expected call invocation, got: {other:?}"),
    }
}

#[rstest]
fn unknown_flag_is_rejected(echo_spec: Spec) {
    let err = parse(&args(&["--bogus"]), &echo_spec, None).expect_err("unknown flag should fail");
    assert!(matches!(err, Error::Usage { .. }), "got: {err}");
}

#[rstest]
fn unknown_format_is_rejected(echo_spec: Spec) {
    let err = parse(&args(&["--spec", "--format", "xml"]), &echo_spec, None)
        .expect_err("unknown format should fail");
    match err {
        Error::Usage { message } => {
            assert!(message.contains("xml"), "unexpected message: {message}");
        }
        other => panic!("expected usage error, got: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Help
// ---------------------------------------------------------------------------

#[rstest]
#[case::short("-h")]
#[case::long("--help")]
fn help_renders_procedure_table(echo_spec: Spec, #[case] flag: &str) {
    let invocation = parse(&args(&[flag]), &echo_spec, None).expect("help parses");
    match invocation {
        Invocation::Help(text) => {
            assert!(text.contains("Procedures:"), "missing table: {text}");
            assert!(text.contains("/echo.v1.EchoService/Echo"), "missing path: {text}");
            assert!(text.contains("echo request"), "missing args alias: {text}");
        }
        other => panic!("expected help invocation, got: {other:?}"),
    }
}

#[rstest]
fn help_includes_doc_preamble(echo_spec: Spec) {
    let invocation = parse(&args(&["--help"]), &echo_spec, Some("An echo plugin."))
        .expect("help parses");
    match invocation {
        Invocation::Help(text) => {
            assert!(text.contains("An echo plugin."), "missing doc: {text}");
        }
        other => panic!("expected help invocation, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Protocol encoding
// ---------------------------------------------------------------------------

#[test]
fn protocol_round_trips() {
    let data = encode_protocol(PROTOCOL_VERSION);
    assert_eq!(data, b"1\n");
    assert_eq!(decode_protocol(&data).expect("decodes"), PROTOCOL_VERSION);
}

#[rstest]
#[case::trailing_newline("2\n", 2)]
#[case::surrounding_whitespace("  3 \n", 3)]
#[case::bare("4", 4)]
fn decode_protocol_trims_whitespace(#[case] text: &str, #[case] expected: u32) {
    assert_eq!(decode_protocol(text.as_bytes()).expect("decodes"), expected);
}

#[rstest]
#[case::empty("")]
#[case::not_a_number("abc")]
#[case::negative("-1")]
fn decode_protocol_rejects_garbage(#[case] text: &str) {
    let err = decode_protocol(text.as_bytes()).expect_err("garbage should fail");
    assert!(matches!(err, Error::Handshake { .. }), "got: {err}");
}
