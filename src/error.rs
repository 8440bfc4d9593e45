//! Error types for the message boundary

use thiserror::Error;

use crate::protocol::ConnectionId;

/// A message that cannot be acted on. Logged and dropped; never answered.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("connection {0:?} is not in a session")]
    NotInSession(ConnectionId),

    #[error("no session with code {0}")]
    UnknownSession(String),
}

/// Why a join request was refused. The `Display` text is sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Room not found")]
    NotFound,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Room is full (max {max})")]
    Full { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_error_text_matches_client() {
        assert_eq!(JoinError::NotFound.to_string(), "Room not found");
        assert_eq!(JoinError::AlreadyStarted.to_string(), "Game already started");
        assert_eq!(JoinError::Full { max: 4 }.to_string(), "Room is full (max 4)");
    }
}
