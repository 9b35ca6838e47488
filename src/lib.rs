//! # LiveSync Protocol
//!
//! Client side of the LiveSync protocol: pushes source file changes into a
//! running mobile application without rebuilding it.
//!
//! An agent inside the application listens on a device-local abstract socket
//! (`localabstract:<app identifier>-livesync`). A port forwarder exposes that
//! socket on a local TCP port; the sync tool dials it, waits for the agent's
//! handshake and then streams framed create and delete operations, each
//! protected by MD5 digests.
//!
//! ## Feature Flags
//!
//! - `transport` (default): Frames, handshake, connection state machine, sockets
//! - `client` (default): [`SyncTool`](client::SyncTool) and filesystem access
//!
//! ## Modules
//!
//! - [`core`]: Constants, collaborator traits, and path encoding (always included)
//! - [`transport`]: Transport layer (requires `transport` feature)
//! - [`client`]: Sync tool (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use livesync_protocol::prelude::*;
//!
//! let frame = Frame::create("test.js", b"Test js content".to_vec());
//! let bytes = frame.encode();
//! assert_eq!(bytes[0], b'0');
//!
//! let (decoded, used) = Frame::decode(&bytes).unwrap();
//! assert_eq!(decoded, frame);
//! assert_eq!(used, bytes.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Sync tool (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        Connection, ConnectionEvent, ConnectionPhase, Connector, Echo, Frame, FrameError,
        Handshake, HandshakeError, Operation, PendingConnect, TcpConnector, TransportError,
        TransportResult,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{ConnectOptions, ConnectOptionsBuilder, FsFileReader, SyncError, SyncTool};
}

// Re-export commonly used items at crate root
pub use crate::core::{EncodingError, FileReader, FixedPort, PortForwarder};

#[cfg(feature = "transport")]
pub use transport::{ConnectionPhase, Frame, Handshake, TransportError};

#[cfg(feature = "client")]
pub use client::{ConnectOptions, SyncError, SyncTool};
