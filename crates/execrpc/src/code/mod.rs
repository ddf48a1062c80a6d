//! RPC status codes.
//!
//! There are no user-defined codes; in both name and semantics the codes
//! below match the gRPC status codes. The zero value (OK in gRPC) is not
//! representable: a success never carries a code, so an error code of zero
//! has nothing to mean.

use strum::{Display, EnumString, FromRepr};

/// Status code attached to an [`RpcError`](crate::error::RpcError).
///
/// Codes render and parse in snake_case (`deadline_exceeded`), matching
/// their wire-level names.
///
/// # Example
///
/// ```
/// use execrpc::Code;
///
/// assert_eq!(Code::DeadlineExceeded.to_string(), "deadline_exceeded");
/// assert_eq!(Code::from_wire(4), Some(Code::DeadlineExceeded));
/// assert_eq!(Code::from_wire(0), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u32)]
pub enum Code {
    /// The operation was canceled, typically by the caller.
    Canceled = 1,
    /// The operation failed for an unknown reason.
    Unknown = 2,
    /// The client supplied an invalid argument.
    InvalidArgument = 3,
    /// A deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// A requested entity was not found.
    NotFound = 5,
    /// The client attempted to create an entity that already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,
    /// Some resource has been exhausted, such as a per-user quota.
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation's execution.
    FailedPrecondition = 9,
    /// The operation was aborted, usually because of a concurrency issue.
    Aborted = 10,
    /// The operation was attempted past the valid range.
    OutOfRange = 11,
    /// The operation is not implemented, supported, or enabled.
    Unimplemented = 12,
    /// An invariant expected by the underlying system has been broken.
    /// Reserved for serious errors.
    Internal = 13,
    /// The service is currently unavailable; usually temporary.
    Unavailable = 14,
    /// The operation has resulted in unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl Code {
    /// Returns the code for the given wire value, or `None` when the value
    /// falls outside the defined range.
    #[must_use]
    pub fn from_wire(value: u32) -> Option<Self> {
        Self::from_repr(value)
    }

    /// Returns the numeric wire value of the code.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}
