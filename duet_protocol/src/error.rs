// Protocol error types.

use thiserror::Error;

/// Errors raised while framing, encoding or decoding a message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Stream read/write failure, including a clean EOF mid-frame.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload is not valid JSON for the expected message type.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame length exceeds `MAX_MESSAGE_SIZE`.
    #[error("message too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: u32 },
}

impl ProtocolError {
    /// True when the peer closed the stream (or the read timed out) rather
    /// than sending bad data.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}
