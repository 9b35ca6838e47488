//! High-level LiveSync API.
//!
//! Provides [`SyncTool`], which connects to the agent running inside an
//! application and pushes file creates, updates, and deletes to it.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::{EncodingError, FileReader, PortForwarder, abstract_socket_name, relative_path};
use crate::transport::{
    Connection, ConnectionEvent, ConnectionPhase, Connector, Frame, Handshake, SessionInfo,
    TcpConnector, TransportError, establish,
};

use super::config::ConnectOptions;
use super::files::{FsFileReader, collect_files};

/// Errors returned by [`SyncTool`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// No handshake arrived within the connect timeout.
    #[error("no livesync handshake within {0:?}")]
    ConnectTimeout(Duration),

    /// A connection is already being established or is established.
    #[error("a livesync connection is already active")]
    AlreadyConnected,

    /// The operation needs an established connection.
    #[error("not connected")]
    NotConnected,

    /// Socket or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Path or content could not be turned into a frame.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The port forwarding collaborator failed.
    #[error("port forwarding failed: {0}")]
    PortForward(#[source] io::Error),
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotConnected => Self::NotConnected,
            other => Self::Transport(other),
        }
    }
}

/// Pushes file changes to a running application.
///
/// All writes share one socket. Every operation takes the connection lock for
/// the whole read-encode-write sequence, so frames never interleave and are
/// written in call order.
///
/// # Example
///
/// ```ignore
/// use livesync_protocol::client::{ConnectOptions, SyncTool};
///
/// let tool = SyncTool::new(adb_forwarder);
/// tool.connect(
///     ConnectOptions::builder()
///         .app_identifier("org.comp.test")
///         .device_identifier("emulator-5554")
///         .sync_root(platform_assets_dir)
///         .build(),
/// )
/// .await?;
///
/// tool.send_files(&changed).await?;
/// tool.remove_file(&deleted).await?;
/// tool.end().await?;
/// ```
pub struct SyncTool<F, C = TcpConnector, R = FsFileReader>
where
    C: Connector,
{
    forwarder: F,
    connector: C,
    reader: R,
    connection: Mutex<Connection<C::Stream>>,
}

impl<F: PortForwarder> SyncTool<F> {
    /// Create a tool that dials TCP and reads files from disk.
    pub fn new(forwarder: F) -> Self {
        Self::with_parts(forwarder, TcpConnector::new(), FsFileReader)
    }
}

impl<F, C, R> SyncTool<F, C, R>
where
    F: PortForwarder,
    C: Connector,
    R: FileReader,
{
    /// Create a tool from explicit collaborators.
    pub fn with_parts(forwarder: F, connector: C, reader: R) -> Self {
        Self {
            forwarder,
            connector,
            reader,
            connection: Mutex::new(Connection::new()),
        }
    }

    /// The connector used to open sockets.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Connect to the agent and wait for its handshake.
    ///
    /// Fails with [`SyncError::AlreadyConnected`] if another connect is in
    /// flight or a connection is established; that connection is untouched.
    /// Dropping the returned future abandons the attempt and the next call
    /// may connect again.
    pub async fn connect(&self, options: ConnectOptions) -> Result<(), SyncError> {
        let attempt = {
            let mut conn = self.connection.lock().await;
            conn.reclaim_abandoned();
            if conn.phase().is_active() {
                warn!(phase = ?conn.phase(), "connect rejected, connection already active");
                return Err(SyncError::AlreadyConnected);
            }
            conn.begin(SessionInfo {
                app_identifier: options.app_identifier.clone(),
                device_identifier: options.device_identifier.clone(),
                sync_root: options.sync_root.clone(),
            })?
        };

        let timeout = options.connect_timeout;
        let outcome = tokio::time::timeout(timeout, self.open(&options)).await;

        let mut conn = self.connection.lock().await;
        let still_connecting = conn.is_pending(&attempt);
        match outcome {
            Ok(Ok((stream, handshake))) => {
                conn.complete(&attempt, stream, handshake)?;
                if let Some(session) = conn.session() {
                    info!(
                        app = %session.app_identifier,
                        device = %session.device_identifier,
                        protocol_version = conn.protocol_version().unwrap_or_default(),
                        "livesync connected"
                    );
                }
                Ok(())
            }
            Ok(Err(e)) => {
                if still_connecting {
                    conn.apply(ConnectionEvent::TransportFailed)?;
                }
                Err(e)
            }
            Err(_) => {
                if still_connecting {
                    conn.apply(ConnectionEvent::TimerExpired)?;
                }
                warn!(?timeout, "no livesync handshake before timeout");
                Err(SyncError::ConnectTimeout(timeout))
            }
        }
    }

    /// Forward the port and dial until the handshake arrives.
    async fn open(&self, options: &ConnectOptions) -> Result<(C::Stream, Handshake), SyncError> {
        let socket_name = abstract_socket_name(&options.app_identifier);
        let port = self
            .forwarder
            .forward(&options.device_identifier, &socket_name)
            .await
            .map_err(SyncError::PortForward)?;

        let addr = SocketAddr::new(options.host, port);
        debug!(%addr, socket = %socket_name, "port forwarded");

        Ok(establish(&self.connector, addr, &options.app_identifier).await?)
    }

    /// Send the current content of `path` as a create/update frame.
    pub async fn send_file(&self, path: impl AsRef<Path>) -> Result<(), SyncError> {
        let path = path.as_ref();
        let mut conn = self.connection.lock().await;
        let relative = relative_to_root(&conn, path)?;

        let content = self
            .reader
            .read(path)
            .await
            .map_err(|source| EncodingError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        write(&mut conn, Frame::create(relative, content)).await
    }

    /// Send each file in order, stopping at the first failure.
    pub async fn send_files<I, P>(&self, paths: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.send_file(path).await?;
        }
        Ok(())
    }

    /// Send every regular file below `dir`.
    ///
    /// Files go out depth first with siblings ordered by name; the first
    /// failure stops the walk.
    pub async fn send_directory(&self, dir: impl AsRef<Path>) -> Result<(), SyncError> {
        self.ensure_connected().await?;

        let dir = dir.as_ref().to_path_buf();
        let walk_root = dir.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&walk_root))
            .await
            .map_err(|e| EncodingError::Read {
                path: dir.clone(),
                source: io::Error::other(e),
            })??;

        debug!(dir = %dir.display(), count = files.len(), "sending directory");
        self.send_files(&files).await
    }

    /// Tell the agent to delete `path`.
    pub async fn remove_file(&self, path: impl AsRef<Path>) -> Result<(), SyncError> {
        let path = path.as_ref();
        let mut conn = self.connection.lock().await;
        let relative = relative_to_root(&conn, path)?;

        write(&mut conn, Frame::delete(relative)).await
    }

    /// Remove each file in order, stopping at the first failure.
    pub async fn remove_files<I, P>(&self, paths: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.remove_file(path).await?;
        }
        Ok(())
    }

    /// Close the connection. A later [`connect`](Self::connect) may proceed.
    pub async fn end(&self) -> Result<(), SyncError> {
        let mut conn = self.connection.lock().await;
        let was = conn.phase();
        conn.close().await?;
        if was != ConnectionPhase::Closed {
            info!(from = ?was, "livesync connection ended");
        }
        Ok(())
    }

    /// Protocol version announced by the agent, once connected.
    pub async fn protocol_version(&self) -> Option<String> {
        let conn = self.connection.lock().await;
        conn.protocol_version().map(str::to_owned)
    }

    /// Application identifier the agent echoed in its handshake.
    pub async fn echoed_app_identifier(&self) -> Option<String> {
        let conn = self.connection.lock().await;
        conn.echoed_app_identifier().map(str::to_owned)
    }

    /// Current connection phase.
    pub async fn state(&self) -> ConnectionPhase {
        let mut conn = self.connection.lock().await;
        conn.reclaim_abandoned();
        conn.phase()
    }

    /// Check if frames can be written.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionPhase::Connected
    }

    /// Sync root of the current or last session.
    pub async fn sync_root(&self) -> Option<PathBuf> {
        let conn = self.connection.lock().await;
        conn.sync_root().map(Path::to_path_buf)
    }

    async fn ensure_connected(&self) -> Result<(), SyncError> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(SyncError::NotConnected)
        }
    }
}

fn relative_to_root<S>(conn: &Connection<S>, path: &Path) -> Result<String, SyncError> {
    if conn.phase() != ConnectionPhase::Connected {
        return Err(SyncError::NotConnected);
    }
    let root = conn.sync_root().ok_or(SyncError::NotConnected)?;
    Ok(relative_path(path, root)?)
}

async fn write<S>(conn: &mut Connection<S>, frame: Frame) -> Result<(), SyncError>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    let bytes = frame.encode();
    conn.write_frame(&bytes).await?;
    debug!(
        operation = ?frame.operation(),
        path = frame.path(),
        bytes = bytes.len(),
        "frame written"
    );
    Ok(())
}
