//! Connection state management for the LiveSync transport layer.
//!
//! The lifecycle is an explicit state machine:
//!
//! ```text
//!            Connect            HandshakeReceived
//!   Idle ──────────────► Connecting ─────────────► Connected
//!    ▲                    │    ▲                       │
//!    │                    │    │ SocketClosed (retry)  │
//!    │                    │    └───┘                   │
//!    │                    │ TimerExpired,              │ SocketClosed,
//!    │                    │ TransportFailed, End       │ TransportFailed, End
//!    │                    ▼                            ▼
//!    └──── (Connect) ── Closed ◄────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::RECONNECT_DELAY;

use super::error::{TransportError, TransportResult};
use super::handshake::{Echo, Handshake, read_handshake};
use super::socket::Connector;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Never connected.
    #[default]
    Idle,
    /// Waiting for the agent's handshake, possibly across several sockets.
    Connecting,
    /// Handshake done, frames may be written.
    Connected,
    /// Torn down. A new connect may start from here.
    Closed,
}

/// Events that drive the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Caller asked to connect.
    Connect,
    /// A complete handshake was read.
    HandshakeReceived,
    /// The socket closed (or was refused) by the peer.
    SocketClosed,
    /// The connect budget ran out.
    TimerExpired,
    /// Unrecoverable socket error.
    TransportFailed,
    /// Caller asked to close.
    End,
}

impl ConnectionPhase {
    /// Compute the phase after `event`.
    pub fn on(self, event: ConnectionEvent) -> TransportResult<Self> {
        use ConnectionEvent as E;
        use ConnectionPhase as P;

        match (self, event) {
            (P::Idle | P::Closed, E::Connect) => Ok(P::Connecting),
            (P::Connecting, E::SocketClosed) => Ok(P::Connecting),
            (P::Connecting, E::HandshakeReceived) => Ok(P::Connected),
            (P::Connecting, E::TimerExpired) => Ok(P::Closed),
            (P::Connecting | P::Connected, E::TransportFailed) => Ok(P::Closed),
            (P::Connected, E::SocketClosed) => Ok(P::Closed),
            (P::Closed, E::SocketClosed | E::TransportFailed) => Ok(P::Closed),
            (_, E::End) => Ok(P::Closed),
            (phase, event) => Err(TransportError::InvalidTransition { phase, event }),
        }
    }

    /// Check if a connection is in flight or established.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// Identity of one connect session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Application the agent runs in.
    pub app_identifier: String,
    /// Device the application runs on.
    pub device_identifier: String,
    /// Absolute base directory of synced files.
    pub sync_root: PathBuf,
}

/// Handle held by whoever drives one connect attempt.
///
/// Dropping it abandons the attempt: the connection no longer counts as
/// connecting and [`Connection::reclaim_abandoned`] closes it.
#[derive(Debug)]
pub struct PendingConnect {
    id: u64,
    _alive: Arc<()>,
}

/// A single LiveSync connection.
///
/// Owns the socket exclusively. The only way to put bytes on the wire is
/// [`write_frame`](Self::write_frame).
#[derive(Debug)]
pub struct Connection<S> {
    phase: ConnectionPhase,
    stream: Option<S>,
    protocol_version: Option<String>,
    app_echo: Option<String>,
    session: Option<SessionInfo>,
    attempt: u64,
    pending: Weak<()>,
}

impl<S> Default for Connection<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Connection<S> {
    /// Create an idle connection.
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            stream: None,
            protocol_version: None,
            app_echo: None,
            session: None,
            attempt: 0,
            pending: Weak::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Protocol version from the last successful handshake.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Application identifier echoed in the last successful handshake.
    pub fn echoed_app_identifier(&self) -> Option<&str> {
        self.app_echo.as_deref()
    }

    /// Session this connection was opened for.
    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    /// Sync root of the current session.
    pub fn sync_root(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.sync_root.as_path())
    }

    /// Apply `event`, dropping the socket whenever the result is `Closed`.
    pub fn apply(&mut self, event: ConnectionEvent) -> TransportResult<ConnectionPhase> {
        let next = self.phase.on(event)?;
        if next != self.phase {
            debug!(from = ?self.phase, to = ?next, ?event, "connection transition");
        }
        self.phase = next;
        if next == ConnectionPhase::Closed {
            self.stream = None;
        }
        Ok(next)
    }

    /// Reserve this connection for a new connect session.
    ///
    /// An abandoned attempt is closed first. The returned handle must be kept
    /// until the attempt is completed or given up.
    pub fn begin(&mut self, session: SessionInfo) -> TransportResult<PendingConnect> {
        self.reclaim_abandoned();
        self.apply(ConnectionEvent::Connect)?;
        self.attempt += 1;
        self.protocol_version = None;
        self.app_echo = None;
        self.session = Some(session);

        let alive = Arc::new(());
        self.pending = Arc::downgrade(&alive);
        Ok(PendingConnect {
            id: self.attempt,
            _alive: alive,
        })
    }

    /// Check if `attempt` is still the connect in progress.
    ///
    /// False once the connection was ended, or ended and re-begun, while the
    /// attempt was waiting for its handshake.
    pub fn is_pending(&self, attempt: &PendingConnect) -> bool {
        self.attempt == attempt.id && self.phase == ConnectionPhase::Connecting
    }

    /// Close the connection if it is connecting for an attempt whose
    /// [`PendingConnect`] was dropped. Returns true if it did.
    pub fn reclaim_abandoned(&mut self) -> bool {
        if self.phase != ConnectionPhase::Connecting || self.pending.strong_count() > 0 {
            return false;
        }
        debug!(attempt = self.attempt, "connect attempt abandoned");
        self.apply(ConnectionEvent::End).is_ok()
    }

    /// Install the stream that delivered `handshake` for `attempt`.
    ///
    /// The echoed application identifier is recorded and checked against the
    /// session; a mismatch is only logged.
    ///
    /// Fails with [`TransportError::ConnectionClosed`] if the attempt is no
    /// longer pending; the stream is dropped.
    pub fn complete(
        &mut self,
        attempt: &PendingConnect,
        stream: S,
        handshake: Handshake,
    ) -> TransportResult<()> {
        if !self.is_pending(attempt) {
            return Err(TransportError::ConnectionClosed);
        }

        if let Some(session) = &self.session {
            match handshake.echo(&session.app_identifier) {
                Echo::Matches => {}
                Echo::Partial => debug!(
                    expected = %session.app_identifier,
                    received = %handshake.app_identifier,
                    "agent echo incomplete"
                ),
                Echo::Differs => warn!(
                    expected = %session.app_identifier,
                    received = %handshake.app_identifier,
                    device = %session.device_identifier,
                    "agent echoed a different application identifier"
                ),
            }
        }

        self.apply(ConnectionEvent::HandshakeReceived)?;
        self.stream = Some(stream);
        self.protocol_version = Some(handshake.protocol_version);
        self.app_echo = Some(handshake.app_identifier);
        Ok(())
    }
}

impl<S: AsyncWrite + Unpin> Connection<S> {
    /// Write one encoded frame and flush it.
    ///
    /// A failed write closes the connection.
    pub async fn write_frame(&mut self, frame: &[u8]) -> TransportResult<()> {
        let stream = match (self.phase, self.stream.as_mut()) {
            (ConnectionPhase::Connected, Some(stream)) => stream,
            _ => return Err(TransportError::NotConnected),
        };

        let result = async {
            stream.write_all(frame).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "frame write failed, closing connection");
            self.apply(ConnectionEvent::TransportFailed)?;
            return Err(e.into());
        }
        Ok(())
    }

    /// Shut the socket down and move to `Closed`.
    pub async fn close(&mut self) -> TransportResult<()> {
        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "socket shutdown failed");
            }
        }
        self.apply(ConnectionEvent::End)?;
        Ok(())
    }
}

/// Open sockets to `addr` until the agent's handshake arrives.
///
/// A socket that closes (or is refused) before the handshake is replaced by a
/// new one. There is no attempt counter; the caller bounds the loop with a
/// single timer covering every retry. The phase is not touched here: the
/// owner of the [`Connection`] installs the result with
/// [`complete`](Connection::complete).
pub async fn establish<C: Connector>(
    connector: &C,
    addr: SocketAddr,
    app_identifier: &str,
) -> TransportResult<(C::Stream, Handshake)> {
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        debug!(%addr, attempt, "opening livesync socket");

        let closed = match connector.connect(addr).await {
            Ok(mut stream) => match read_handshake(&mut stream, app_identifier).await {
                Ok(Some(handshake)) => {
                    info!(
                        %addr,
                        attempt,
                        protocol_version = %handshake.protocol_version,
                        "livesync handshake received"
                    );
                    return Ok((stream, handshake));
                }
                Ok(None) => TransportError::ConnectionClosed,
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            },
            Err(e) => {
                let e = TransportError::from(e);
                if !e.is_transient() {
                    return Err(e);
                }
                e
            }
        };

        debug!(%addr, attempt, reason = %closed, "socket closed before handshake, retrying");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
