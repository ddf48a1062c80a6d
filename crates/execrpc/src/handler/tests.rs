//! Unit tests for server-side request handling.

use std::io::Cursor;

use rstest::rstest;
use serde::{Deserialize, Serialize};

use super::*;
use crate::code::Code;
use crate::wire::Response;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoRequest {
    message: String,
}

impl Message for EchoRequest {
    const TYPE_URL: &'static str = "type.example.com/test.v1.EchoRequest";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoResponse {
    message: String,
}

impl Message for EchoResponse {
    const TYPE_URL: &'static str = "type.example.com/test.v1.EchoResponse";
}

fn echo(request: EchoRequest) -> Result<EchoResponse, crate::error::RpcError> {
    Ok(EchoResponse {
        message: request.message,
    })
}

fn handle_with(
    stdin: &[u8],
    format: Format,
    handle_fn: impl FnOnce(EchoRequest) -> Result<EchoResponse, crate::error::RpcError>,
) -> (Result<(), Error>, Vec<u8>) {
    let mut stdin = Cursor::new(stdin.to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = Handler::new().handle(
        HandleEnv {
            stdin: &mut stdin,
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
        handle_fn,
        HandleOptions::new().with_format(format),
    );
    (result, stdout)
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn handle_round_trips_request(#[case] format: Format) {
    let request_data = wire::marshal_request(
        format,
        Some(&EchoRequest {
            message: String::from("hello"),
        }),
    )
    .expect("marshal succeeds");
    let (result, stdout) = handle_with(&request_data, format, echo);
    result.expect("handle succeeds");
    let response: EchoResponse =
        wire::unmarshal_response(format, &stdout).expect("response decodes");
    assert_eq!(response.message, "hello");
}

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn handle_tolerates_empty_stdin(#[case] format: Format) {
    let (result, stdout) = handle_with(&[], format, echo);
    result.expect("handle succeeds");
    let response: EchoResponse =
        wire::unmarshal_response(format, &stdout).expect("response decodes");
    assert_eq!(response, EchoResponse::default());
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[test]
fn user_error_is_serialised_and_returned() {
    let (result, stdout) = handle_with(&[], Format::Binary, |_request| {
        Err(crate::error::RpcError::new(Code::DeadlineExceeded, "hello"))
    });
    let err = result.expect_err("user error propagates");
    match &err {
        Error::Rpc(rpc_error) => {
            assert_eq!(rpc_error.code(), Code::DeadlineExceeded);
            assert_eq!(rpc_error.message(), "hello");
        }
        other => panic!("expected rpc error, got: {other}"),
    }
    let envelope: Response = Format::Binary
        .unmarshal("response", &stdout)
        .expect("envelope decodes");
    let wire_error = envelope.error.expect("error present in envelope");
    assert_eq!(wire_error.code, Code::DeadlineExceeded.as_u32());
    assert_eq!(wire_error.message, "hello");
    assert!(envelope.value.is_none());
}

#[test]
fn decode_failure_is_serialised_as_structured_error() {
    let (result, stdout) = handle_with(b"definitely not an envelope", Format::Binary, echo);
    let err = result.expect_err("decode failure propagates");
    assert!(matches!(err, Error::Deserialize { .. }), "got: {err}");
    let envelope: Response = Format::Binary
        .unmarshal("response", &stdout)
        .expect("envelope decodes");
    let wire_error = envelope.error.expect("error present in envelope");
    assert_eq!(wire_error.code, Code::Unknown.as_u32());
}
