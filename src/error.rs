use thiserror::Error;

/// Failures converting a captured frame to the wire PCM format.
///
/// These are per-frame and non-fatal: the coordinator logs and skips.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("frame carries no sample format metadata")]
    MissingFormat,

    #[error("no converter for planar (non-interleaved) frames")]
    NonInterleaved,

    #[error("payload is not a whole number of frames: {actual} bytes, frame size {frame_size}")]
    MalformedPayload { actual: usize, frame_size: usize },
}

/// Failures of the client-credentials token exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no token fetched yet")]
    NoToken,
}

/// Failures of the duplex transcription stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send session config: {0}")]
    Handshake(String),

    #[error("failed to send audio: {0}")]
    Send(String),

    #[error("stream already closed")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Send(e.to_string())
    }
}
