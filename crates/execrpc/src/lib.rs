//! RPC framework in which a plugin is an executable child process and the
//! RPC transport is the process boundary itself.
//!
//! Arguments select a procedure, the request body arrives on standard input,
//! the response body is emitted on standard output, and the exit code carries
//! coarse failure status. Each invocation is a one-shot process execution
//! carrying a single unary request and a single unary response.
//!
//! # Architecture
//!
//! A plugin advertises a [`Spec`]: a validated set of [`Procedure`]s, each
//! identified by a URI-shaped path and optionally aliased by a tuple of CLI
//! args. A [`Client`] probes an unknown plugin once (`--protocol`, then
//! `--spec`), caches the result, and thereafter invokes procedures by
//! spawning the plugin through a [`Runner`] with the selector on argv and the
//! request envelope on stdin. On the far side a [`Server`] parses the
//! invocation, answers handshake queries, and routes the selector to the
//! handle function registered for the procedure in a [`ServerRegistrar`].
//!
//! Bodies are serialised in either of two [`Format`]s: a compact binary
//! encoding or textual JSON with snake_case field names. Failures travel on
//! two orthogonal tracks: a structured [`RpcError`] inside the response
//! envelope, and a process-level [`ExitError`] carried by the exit code.
//!
//! # Example
//!
//! ```rust,no_run
//! use execrpc::{Client, ExecRunner, Message};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct EchoRequest {
//!     message: String,
//! }
//!
//! impl Message for EchoRequest {
//!     const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoRequest";
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct EchoResponse {
//!     message: String,
//! }
//!
//! impl Message for EchoResponse {
//!     const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoResponse";
//! }
//!
//! fn main() -> Result<(), execrpc::Error> {
//!     let client = Client::new(ExecRunner::new("echo-plugin"));
//!     let request = EchoRequest {
//!         message: "hello".to_owned(),
//!     };
//!     let response: EchoResponse =
//!         client.call("/echo.v1.EchoService/Echo", Some(&request))?;
//!     println!("{}", response.message);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod code;
pub mod error;
pub mod flags;
pub mod format;
pub mod handler;
pub mod procedure;
pub mod registry;
pub mod runner;
pub mod server;
pub mod spec;
pub mod wire;

pub use self::client::Client;
pub use self::code::Code;
pub use self::error::{Error, ExitError, RpcError};
pub use self::flags::PROTOCOL_VERSION;
pub use self::format::Format;
pub use self::handler::{HandleEnv, HandleOptions, Handler};
pub use self::procedure::Procedure;
pub use self::registry::ServerRegistrar;
pub use self::runner::{ExecRunner, RunEnv, Runner, ServerRunner};
pub use self::server::{serve_main, Server};
pub use self::spec::Spec;
pub use self::wire::{
    AnyValue, Message, ProcedureDescriptor, Request, Response, SpecDescriptor, WireError,
};

/// Semantic version of the execrpc crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
