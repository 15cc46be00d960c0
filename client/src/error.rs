use std::io;
use thiserror::Error;

/// Protocol violations while the server is still introducing the session.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("invalid player id token `{0}`")]
    InvalidPlayerId(String),
    #[error("invalid world size token `{0}`")]
    InvalidWorldSize(String),
    #[error("handshake token exceeds {0} bytes without a newline")]
    TokenTooLong(usize),
    #[error("stream ended before the handshake completed")]
    UnexpectedEof,
}

/// Errors that end a session. Each one is reported to the shell exactly once.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("server closed the connection")]
    ConnectionClosed,
    #[error("unterminated record exceeds {0} bytes")]
    RecordTooLarge(usize),
    #[error("failed to encode control commands: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to start the network runtime: {0}")]
    RuntimeStart(#[source] io::Error),
    #[error("a session has already been started")]
    AlreadyStarted,
    /// Local shutdown request; ends the session without being reported as a
    /// failure.
    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}
