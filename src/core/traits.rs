//! Collaborator traits.
//!
//! The engine consumes these services but does not implement device
//! discovery or port forwarding itself. The client module ships a
//! filesystem-backed [`FileReader`]; port forwarding is always supplied by
//! the caller.

use std::future::Future;
use std::io;
use std::path::Path;

/// Source of raw file bytes for create frames.
///
/// # Example
///
/// ```ignore
/// struct InMemory(HashMap<PathBuf, Vec<u8>>);
///
/// impl FileReader for InMemory {
///     fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send {
///         let found = self.0.get(path).cloned();
///         async move { found.ok_or_else(|| io::ErrorKind::NotFound.into()) }
///     }
/// }
/// ```
pub trait FileReader: Send + Sync {
    /// Read the whole file at `path`.
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Forwards a local TCP port to an abstract socket on a device.
///
/// Implementations typically shell out to the platform's debug bridge.
pub trait PortForwarder: Send + Sync {
    /// Forward a free local port to `abstract_socket` on `device_identifier`.
    ///
    /// Returns the local port that now reaches the device.
    fn forward(
        &self,
        device_identifier: &str,
        abstract_socket: &str,
    ) -> impl Future<Output = io::Result<u16>> + Send;
}

/// A forwarder for endpoints that are already reachable on a fixed port.
///
/// Useful for emulators with a static forward and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPort(pub u16);

impl PortForwarder for FixedPort {
    fn forward(
        &self,
        _device_identifier: &str,
        _abstract_socket: &str,
    ) -> impl Future<Output = io::Result<u16>> + Send {
        let port = self.0;
        async move { Ok(port) }
    }
}
