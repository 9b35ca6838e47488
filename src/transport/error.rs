//! Transport layer error types.

use std::io;

use thiserror::Error;

use super::connection::{ConnectionEvent, ConnectionPhase};
use super::frame::FrameError;
use super::handshake::HandshakeError;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Frame parsing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Handshake parsing error.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Connection is closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Operation needs an established connection.
    #[error("not connected")]
    NotConnected,

    /// Event is not valid in the current phase.
    #[error("invalid transition: {event:?} while {phase:?}")]
    InvalidTransition {
        /// Phase the connection was in.
        phase: ConnectionPhase,
        /// Rejected event.
        event: ConnectionEvent,
    },
}

impl TransportError {
    /// Check if this error means the agent was not (yet) reachable.
    ///
    /// Before the handshake these are treated like a closed socket and the
    /// connect loop tries again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => is_transient_io(e),
            Self::ConnectionClosed => true,
            _ => false,
        }
    }
}

pub(crate) fn is_transient_io(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
