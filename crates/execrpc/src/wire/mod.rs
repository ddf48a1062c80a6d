//! Wire envelopes crossing the process boundary.
//!
//! Three structured messages travel between client and plugin: a [`Request`]
//! carries an opaque typed payload on stdin, a [`Response`] carries a payload
//! and/or a structured error on stdout, and a [`SpecDescriptor`] is the
//! serialised form a plugin prints for `--spec`. Payloads are carried as a
//! type-URL-tagged container ([`AnyValue`]); decoding into a concrete type
//! is a two-step operation driven by the caller-supplied [`Message`] type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, RpcError};
use crate::format::Format;
use crate::procedure::Procedure;
use crate::spec::Spec;

/// A structured message that can cross the plugin process boundary.
///
/// Implemented by the request and response types of every procedure. The
/// type URL names the message on the wire so a decoder can reject payloads
/// of the wrong type.
///
/// # Example
///
/// ```
/// use execrpc::Message;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct EchoRequest {
///     message: String,
/// }
///
/// impl Message for EchoRequest {
///     const TYPE_URL: &'static str = "type.example.com/echo.v1.EchoRequest";
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned {
    /// Fully-qualified type URL identifying the message on the wire, for
    /// example `type.example.com/echo.v1.EchoRequest`.
    const TYPE_URL: &'static str;
}

/// Self-describing payload container: a type URL plus the encoded bytes.
///
/// The bytes are encoded with the same [`Format`] as the surrounding
/// envelope. In the JSON encoding they render as standard base64; in the
/// binary encoding as a native binary blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyValue {
    type_url: String,
    #[serde(with = "encoded_bytes")]
    value: Vec<u8>,
}

impl AnyValue {
    /// Packs a message into a tagged payload.
    pub(crate) fn pack<M: Message>(format: Format, message: &M) -> Result<Self, Error> {
        Ok(Self {
            type_url: M::TYPE_URL.to_owned(),
            value: format.marshal("payload", message)?,
        })
    }

    /// Unpacks the payload into a concrete message type.
    ///
    /// Type checking compares the trailing `/`-segment of the stored and
    /// expected type URLs, so payloads tagged under a different authority
    /// but naming the same message still decode.
    pub(crate) fn unpack<M: Message>(&self, format: Format) -> Result<M, Error> {
        if message_name(&self.type_url) != message_name(M::TYPE_URL) {
            return Err(Error::TypeMismatch {
                expected: M::TYPE_URL,
                actual: self.type_url.clone(),
            });
        }
        format.unmarshal("payload", &self.value)
    }

    /// Returns the type URL tagging the payload.
    #[must_use]
    pub fn type_url(&self) -> &str {
        self.type_url.as_str()
    }
}

/// The trailing segment of a type URL names the message type.
fn message_name(type_url: &str) -> &str {
    type_url.rsplit('/').next().unwrap_or(type_url)
}

/// Payload bytes render as base64 in human-readable encodings and as a
/// native binary blob otherwise.
mod encoded_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(value))
        } else {
            serde_bytes::serialize(value, serializer)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let encoded = String::deserialize(deserializer)?;
            BASE64.decode(encoded.as_bytes()).map_err(D::Error::custom)
        } else {
            serde_bytes::deserialize(deserializer)
        }
    }
}

/// Request envelope, sent to the plugin on stdin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The request payload; absent when the call carries no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnyValue>,
}

/// Response envelope, emitted by the plugin on stdout.
///
/// The protocol permits a payload, an error, neither, or both; in practice
/// a handler produces one or the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The response payload, if the call produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnyValue>,
    /// The structured error, if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// Structured error as it appears inside a [`Response`] envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Numeric status code, 1..=16.
    pub code: u32,
    /// Human-readable failure description. Never empty.
    pub message: String,
}

impl From<&RpcError> for WireError {
    fn from(error: &RpcError) -> Self {
        Self {
            code: error.code().as_u32(),
            message: error.message().to_owned(),
        }
    }
}

impl From<WireError> for RpcError {
    fn from(error: WireError) -> Self {
        Self::from_wire(error.code, error.message)
    }
}

/// Wire form of a [`Spec`], as printed by `--spec`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDescriptor {
    /// The advertised procedures, in declaration order.
    #[serde(default)]
    pub procedures: Vec<ProcedureDescriptor>,
}

/// Wire form of a [`Procedure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDescriptor {
    /// The procedure path.
    pub path: String,
    /// Optional args alias.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl From<&Procedure> for ProcedureDescriptor {
    fn from(procedure: &Procedure) -> Self {
        Self {
            path: procedure.path().to_owned(),
            args: procedure.args().to_vec(),
        }
    }
}

impl TryFrom<ProcedureDescriptor> for Procedure {
    type Error = crate::error::Error;

    fn try_from(descriptor: ProcedureDescriptor) -> Result<Self, Self::Error> {
        if descriptor.args.is_empty() {
            Self::new(descriptor.path)
        } else {
            Self::with_args(descriptor.path, descriptor.args)
        }
    }
}

impl From<&Spec> for SpecDescriptor {
    fn from(spec: &Spec) -> Self {
        Self {
            procedures: spec.procedures().iter().map(ProcedureDescriptor::from).collect(),
        }
    }
}

impl TryFrom<SpecDescriptor> for Spec {
    type Error = crate::error::Error;

    fn try_from(descriptor: SpecDescriptor) -> Result<Self, Self::Error> {
        let procedures = descriptor
            .procedures
            .into_iter()
            .map(Procedure::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(procedures)
    }
}

/// Encodes a request payload into envelope bytes. A `None` payload yields
/// empty bytes, meaning no envelope is emitted at all.
pub(crate) fn marshal_request<M: Message>(
    format: Format,
    request: Option<&M>,
) -> Result<Vec<u8>, Error> {
    let Some(request) = request else {
        return Ok(Vec::new());
    };
    let envelope = Request {
        value: Some(AnyValue::pack(format, request)?),
    };
    format.marshal("request", &envelope)
}

/// Decodes envelope bytes into a request payload. Empty bytes and an
/// envelope with no payload both leave the request at its default value.
pub(crate) fn unmarshal_request<M: Message + Default>(
    format: Format,
    data: &[u8],
) -> Result<M, Error> {
    if data.is_empty() {
        return Ok(M::default());
    }
    let envelope: Request = format.unmarshal("request", data)?;
    match envelope.value {
        Some(value) => value.unpack(format),
        None => Ok(M::default()),
    }
}

/// Encodes a response payload and/or error into envelope bytes.
pub(crate) fn marshal_response<M: Message>(
    format: Format,
    response: Option<&M>,
    error: Option<&RpcError>,
) -> Result<Vec<u8>, Error> {
    let envelope = Response {
        value: response
            .map(|response| AnyValue::pack(format, response))
            .transpose()?,
        error: error.map(WireError::from),
    };
    format.marshal("response", &envelope)
}

/// Decodes envelope bytes into a response payload, surfacing an embedded
/// error as [`Error::Rpc`]. Empty bytes leave the response at its default.
pub(crate) fn unmarshal_response<M: Message + Default>(
    format: Format,
    data: &[u8],
) -> Result<M, Error> {
    if data.is_empty() {
        return Ok(M::default());
    }
    let envelope: Response = format.unmarshal("response", data)?;
    if let Some(error) = envelope.error {
        return Err(Error::Rpc(RpcError::from(error)));
    }
    match envelope.value {
        Some(value) => value.unpack(format),
        None => Ok(M::default()),
    }
}

/// Extracts the structured error from response bytes, if the bytes hold a
/// decodable envelope that carries one. Used to prefer a structured failure
/// over a bare non-zero exit status.
pub(crate) fn embedded_response_error(format: Format, data: &[u8]) -> Option<RpcError> {
    if data.is_empty() {
        return None;
    }
    let envelope: Response = format.unmarshal("response", data).ok()?;
    envelope.error.map(RpcError::from)
}

/// Encodes a spec into descriptor bytes for `--spec` output.
pub(crate) fn marshal_spec(format: Format, spec: &Spec) -> Result<Vec<u8>, Error> {
    format.marshal("spec", &SpecDescriptor::from(spec))
}

/// Decodes descriptor bytes into a validated spec.
pub(crate) fn unmarshal_spec(format: Format, data: &[u8]) -> Result<Spec, Error> {
    let descriptor: SpecDescriptor = format.unmarshal("spec", data)?;
    Spec::try_from(descriptor)
}
