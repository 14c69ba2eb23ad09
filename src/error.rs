use std::io;

use thiserror::Error;

/// Errors returned by every operation of this crate.
///
/// Input problems (`InvalidAddress`, `MissingField`, `EmptyMessage`, ...) are
/// detected before any system call is issued. Kernel failures are carried by
/// [`SctpError::SystemCall`] with the original `errno` untouched.
#[derive(Error, Debug)]
pub enum SctpError {
    #[error("address could not be translated: {0}")]
    InvalidAddress(String),

    #[error("invalid address at index {index}: {source}")]
    InvalidAddressAt {
        index: usize,
        #[source]
        source: Box<SctpError>,
    },

    #[error("unsupported address family {0}")]
    UnsupportedFamily(u16),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("address list must contain at least one address")]
    EmptyAddressList,

    #[error("empty messages are not allowed, except if coupled with the EOF flag")]
    EmptyMessage,

    #[error("{call} failed: {source}")]
    SystemCall {
        call: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to allocate {0} bytes")]
    AllocationFailed(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SctpError>;

impl SctpError {
    /// Returns a closure wrapping an `io::Error` from the named call, for use
    /// with `map_err`.
    pub(crate) fn syscall(call: &'static str) -> impl FnOnce(io::Error) -> SctpError {
        move |source| SctpError::SystemCall { call, source }
    }

    /// The raw OS error of a failed system call, if this is one.
    pub fn errno(&self) -> Option<i32> {
        match self {
            SctpError::SystemCall { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// `true` when the failure is a non-blocking socket reporting `EAGAIN`.
    pub fn is_would_block(&self) -> bool {
        matches!(self, SctpError::SystemCall { source, .. } if source.kind() == io::ErrorKind::WouldBlock)
    }

    /// `true` for errors caused by caller input rather than the kernel.
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            SctpError::SystemCall { .. } | SctpError::AllocationFailed(_)
        )
    }
}

impl From<SctpError> for io::Error {
    fn from(e: SctpError) -> Self {
        match e {
            SctpError::SystemCall { call, source } => {
                io::Error::new(source.kind(), WrappedIoErr(call, source))
            }
            SctpError::AllocationFailed(_) => io::Error::new(io::ErrorKind::OutOfMemory, e),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}

struct WrappedIoErr(&'static str, io::Error);

impl std::fmt::Display for WrappedIoErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::fmt::Debug for WrappedIoErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.0, self.1)
    }
}

impl std::error::Error for WrappedIoErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.1)
    }
}
