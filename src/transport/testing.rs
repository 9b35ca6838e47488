//! In-memory connectors for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncWriteExt, DuplexStream};

use super::socket::Connector;

const DUPLEX_CAPACITY: usize = 64 * 1024;

/// Encode a handshake the way the agent sends it.
pub fn handshake_bytes(version: &str, app_identifier: &str) -> Vec<u8> {
    let mut buf = vec![version.len() as u8];
    buf.extend_from_slice(version.as_bytes());
    buf.extend_from_slice(app_identifier.as_bytes());
    buf
}

/// What the fake agent does on one connection attempt.
#[derive(Debug, Clone)]
pub enum Step {
    /// Accept and send these handshake bytes.
    Handshake(Vec<u8>),
    /// Accept and close immediately.
    Close,
    /// Refuse the connection.
    Refuse,
    /// Accept and never send anything.
    Silent,
}

/// Connector that plays back a script of agent behaviours.
///
/// Attempts beyond the script behave like [`Step::Silent`].
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicUsize,
    peers: Mutex<Vec<DuplexStream>>,
}

impl ScriptedConnector {
    /// Play `steps` in order, one per connection attempt.
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    /// Number of sockets opened so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Agent side of the most recent accepted socket.
    pub fn take_peer(&self) -> Option<DuplexStream> {
        self.peers.lock().unwrap().pop()
    }
}

impl Connector for ScriptedConnector {
    type Stream = DuplexStream;

    fn connect(&self, _addr: SocketAddr) -> impl Future<Output = io::Result<DuplexStream>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Silent);
        let peers = &self.peers;

        async move {
            let (local, mut remote) = tokio::io::duplex(DUPLEX_CAPACITY);
            match step {
                Step::Refuse => return Err(io::ErrorKind::ConnectionRefused.into()),
                Step::Close => drop(remote),
                Step::Silent => peers.lock().unwrap().push(remote),
                Step::Handshake(bytes) => {
                    remote.write_all(&bytes).await?;
                    peers.lock().unwrap().push(remote);
                }
            }
            Ok(local)
        }
    }
}
