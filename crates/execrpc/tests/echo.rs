//! End-to-end tests for the echo service over the full wire protocol.
//!
//! The in-process [`ServerRunner`] exercises flag parsing, envelope framing,
//! dispatch, and error propagation exactly as a child process would, without
//! needing a compiled plugin binary.

use execrpc::{
    Client, Code, Error, Format, Handler, Message, Procedure, RpcError, RunEnv, Runner, Server,
    ServerRegistrar, ServerRunner, Spec,
};
use rstest::rstest;
use serde::{Deserialize, Serialize};

const ECHO_REQUEST_PATH: &str = "/echo.v1.EchoService/EchoRequest";
const ECHO_LIST_PATH: &str = "/echo.v1.EchoService/EchoList";
const ECHO_ERROR_PATH: &str = "/echo.v1.EchoService/EchoError";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoRequestRequest {
    message: String,
}

impl Message for EchoRequestRequest {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoRequestRequest";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoRequestResponse {
    message: String,
}

impl Message for EchoRequestResponse {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoRequestResponse";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoListRequest {}

impl Message for EchoListRequest {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoListRequest";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoListResponse {
    list: Vec<String>,
}

impl Message for EchoListResponse {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoListResponse";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoErrorRequest {
    code: u32,
    message: String,
}

impl Message for EchoErrorRequest {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoErrorRequest";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EchoErrorResponse {}

impl Message for EchoErrorResponse {
    const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoErrorResponse";
}

fn echo_spec() -> Spec {
    Spec::new(vec![
        Procedure::with_args(ECHO_REQUEST_PATH, vec!["echo".into(), "request".into()])
            .expect("valid procedure"),
        // EchoList has no args alias and is selected by its path.
        Procedure::new(ECHO_LIST_PATH).expect("valid procedure"),
        Procedure::with_args(ECHO_ERROR_PATH, vec!["echo".into(), "error".into()])
            .expect("valid procedure"),
    ])
    .expect("valid spec")
}

fn echo_server() -> Server {
    let registrar = ServerRegistrar::new();
    registrar.register(ECHO_REQUEST_PATH, |env, options| {
        Handler::new().handle(
            env,
            |request: EchoRequestRequest| {
                Ok(EchoRequestResponse {
                    message: request.message,
                })
            },
            options,
        )
    });
    registrar.register(ECHO_LIST_PATH, |env, options| {
        Handler::new().handle(
            env,
            |_request: EchoListRequest| {
                Ok(EchoListResponse {
                    list: vec![String::from("foo"), String::from("bar")],
                })
            },
            options,
        )
    });
    registrar.register(ECHO_ERROR_PATH, |env, options| {
        Handler::new().handle(
            env,
            |request: EchoErrorRequest| -> Result<EchoErrorResponse, RpcError> {
                Err(RpcError::from_wire(request.code, request.message))
            },
            options,
        )
    });
    Server::new(echo_spec(), registrar)
        .expect("spec and registrar map one-to-one")
        .with_doc("An echo plugin used for end-to-end testing.")
}

fn new_client(format: Format) -> Client<ServerRunner> {
    Client::new(ServerRunner::new(echo_server())).with_format(format)
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn echo_request_round_trips(#[case] format: Format) {
    let client = new_client(format);
    let response: EchoRequestResponse = client
        .call(
            ECHO_REQUEST_PATH,
            Some(&EchoRequestRequest {
                message: String::from("hello"),
            }),
        )
        .expect("echo succeeds");
    assert_eq!(response.message, "hello");
}

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn echo_request_with_no_body_yields_default(#[case] format: Format) {
    let client = new_client(format);
    let response: EchoRequestResponse = client
        .call::<EchoRequestRequest, _>(ECHO_REQUEST_PATH, None)
        .expect("echo succeeds");
    assert_eq!(response.message, "");
}

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn echo_list_dispatches_by_path(#[case] format: Format) {
    let client = new_client(format);
    let response: EchoListResponse = client
        .call::<EchoListRequest, _>(ECHO_LIST_PATH, None)
        .expect("list succeeds");
    assert_eq!(response.list, vec!["foo", "bar"]);
}

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn echo_error_surfaces_structured_failure(#[case] format: Format) {
    let client = new_client(format);
    let err = client
        .call::<EchoErrorRequest, EchoErrorResponse>(
            ECHO_ERROR_PATH,
            Some(&EchoErrorRequest {
                code: Code::DeadlineExceeded.as_u32(),
                message: String::from("hello"),
            }),
        )
        .expect_err("error procedure fails");
    match err {
        Error::Rpc(rpc_error) => {
            assert_eq!(rpc_error.code(), Code::DeadlineExceeded);
            assert_eq!(rpc_error.message(), "hello");
        }
        other => panic!("expected rpc error, got: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Spec handshake
// ---------------------------------------------------------------------------

#[rstest]
#[case::binary(Format::Binary)]
#[case::json(Format::Json)]
fn handshake_resolves_full_spec(#[case] format: Format) {
    let client = new_client(format);
    let spec = client.spec().expect("handshake succeeds");
    assert_eq!(spec.procedures().len(), 3);
    let echo = spec
        .procedure_for_path(ECHO_REQUEST_PATH)
        .expect("echo procedure advertised");
    assert_eq!(echo.args(), &["echo", "request"]);
    let list = spec
        .procedure_for_path(ECHO_LIST_PATH)
        .expect("list procedure advertised");
    assert!(list.args().is_empty());
}

// ---------------------------------------------------------------------------
// Raw invocation surface
// ---------------------------------------------------------------------------

#[test]
fn server_tolerates_missing_stdin_for_bodyless_call() {
    let server = echo_server();
    let mut stdout = Vec::new();
    server
        .serve(RunEnv {
            args: vec![ECHO_LIST_PATH.to_owned(), "--format".into(), "json".into()],
            stdin: None,
            stdout: Some(&mut stdout),
            stderr: None,
        })
        .expect("bodyless call succeeds");
    assert!(!stdout.is_empty(), "response envelope expected on stdout");
}

#[test]
fn server_runner_preserves_exit_error_contract() {
    let runner = ServerRunner::new(echo_server());
    let err = runner
        .run(RunEnv {
            args: vec!["bogus".into(), "selector".into()],
            stdin: None,
            stdout: None,
            stderr: None,
        })
        .expect_err("unknown selector fails");
    assert_eq!(execrpc::ExitError::wrap(err).exit_code(), 1);
}
