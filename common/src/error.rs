use thiserror::Error;

/// Errors raised while decoding values pushed in from outside the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown settings field: {0}")]
    UnknownField(String),

    #[error("unknown pump phase code: {0}")]
    UnknownPhase(u8),

    #[error("invalid pump phase payload: {0:?}")]
    InvalidPhasePayload(String),
}

/// Errors raised when an outbound action cannot be handed to the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
