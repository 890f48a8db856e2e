//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while driving the command/response protocol.
///
/// A remote-reported failure (the script ran and hit its error path) is not
/// represented here — the protocol worked correctly in that case, so it is
/// surfaced as [`crate::ClassifiedResponse::RemoteError`] instead.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A command was issued while another was still in flight.
    #[error("a command is already in flight on this session")]
    Busy,

    /// The underlying channel failed for a reason other than a per-read
    /// timeout.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] std::io::Error),

    /// The overall deadline elapsed before the sentinel arrived. The
    /// partially-collected frame is discarded; without the sentinel there is
    /// no way to know whether it was complete.
    #[error("deadline elapsed waiting for the response sentinel")]
    Timeout,

    /// The sentinel was found but the preceding bytes did not parse per the
    /// command's expected encoding.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The response outgrew the configured ceiling before the sentinel
    /// appeared.
    #[error("response too large: maximum {max} bytes, got {actual}")]
    ResponseTooLarge {
        /// Maximum allowed frame size.
        max: usize,
        /// Buffered size when the ceiling was hit.
        actual: usize,
    },
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
