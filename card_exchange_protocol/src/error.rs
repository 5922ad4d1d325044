// Errors raised while exchanging protocol messages.
//
// `ProtocolError` covers both transport faults (I/O, undecodable JSON, wrong
// protocol version) and protocol misuse by the peer (wrong response type,
// refusal, wrong number of cards). The server treats every variant as a
// connection fault for that player.

use std::io;

use thiserror::Error;

use crate::message::CommandTag;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol version mismatch: expected {expected}, got {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("{command} answered with an unexpected {response} response")]
    UnexpectedResponse {
        command: CommandTag,
        response: &'static str,
    },

    #[error("{command} refused by client: {reason}")]
    Refused { command: CommandTag, reason: String },

    #[error("{command} returned {actual} cards, expected {expected}")]
    CardCount {
        command: CommandTag,
        expected: usize,
        actual: usize,
    },
}

impl ProtocolError {
    /// True when the peer hung up rather than misbehaving.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}
