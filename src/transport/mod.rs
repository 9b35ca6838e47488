//! LiveSync Protocol - Transport Layer
//!
//! This module implements everything between a file operation and the bytes
//! on the forwarded socket:
//!
//! - **Frame encoding/decoding**: [`Frame`] and its field schema
//! - **Handshake parsing**: [`Handshake`] and [`read_handshake`]
//! - **Connection state machine**: [`ConnectionPhase`] and [`Connection`]
//! - **Socket opening**: the [`Connector`] trait and [`TcpConnector`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            SyncTool (client)            │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   frames, handshake, connection         │
//! ├─────────────────────────────────────────┤
//! │     forwarded TCP port → device agent   │
//! └─────────────────────────────────────────┘
//! ```

mod connection;
mod error;
mod frame;
mod handshake;
mod socket;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::*;
pub use error::{TransportError, TransportResult};
pub use frame::*;
pub use handshake::*;
pub use socket::*;
