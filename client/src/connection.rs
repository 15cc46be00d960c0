//! Connection lifecycle and the two-line handshake

use crate::error::HandshakeError;
use crate::framing::LineBuffer;
use std::fmt;

/// Longest handshake token accepted before a newline must appear.
pub const MAX_HANDSHAKE_TOKEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingPlayerId,
    AwaitingWorldSize,
    Streaming,
    Terminated,
}

impl ConnectionState {
    pub fn is_terminated(self) -> bool {
        self == ConnectionState::Terminated
    }

    pub fn is_streaming(self) -> bool {
        self == ConnectionState::Streaming
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingPlayerId => "awaiting player id",
            ConnectionState::AwaitingWorldSize => "awaiting world size",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Session constants assigned by the server during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub player_id: u32,
    /// Side length of the square world.
    pub world_size: u32,
}

/// Consumes the player ID and world size lines from the receive buffer.
///
/// Anything after the second line stays in the buffer; it belongs to the
/// record stream.
#[derive(Debug)]
pub struct Handshake {
    state: ConnectionState,
    player_id: Option<u32>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::AwaitingPlayerId,
            player_id: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Processes whatever complete tokens the buffer holds. Returns the
    /// session constants once both have arrived; after that the buffer is left
    /// alone.
    pub fn advance(
        &mut self,
        buffer: &mut LineBuffer,
    ) -> Result<Option<SessionInfo>, HandshakeError> {
        while !self.state.is_streaming() {
            let Some(line) = buffer.next_line() else {
                break;
            };
            let token = String::from_utf8_lossy(line).trim().to_string();

            match self.player_id {
                None => {
                    let player_id = token
                        .parse::<u32>()
                        .map_err(|_| HandshakeError::InvalidPlayerId(token.clone()))?;
                    self.player_id = Some(player_id);
                    self.state = ConnectionState::AwaitingWorldSize;
                }
                Some(player_id) => {
                    let world_size = token
                        .parse::<u32>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| HandshakeError::InvalidWorldSize(token.clone()))?;
                    self.state = ConnectionState::Streaming;
                    return Ok(Some(SessionInfo {
                        player_id,
                        world_size,
                    }));
                }
            }
        }

        if !self.state.is_streaming() && buffer.pending_len() > MAX_HANDSHAKE_TOKEN {
            return Err(HandshakeError::TokenTooLong(MAX_HANDSHAKE_TOKEN));
        }
        Ok(None)
    }
}
