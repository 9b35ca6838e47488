//! Connect options.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOCAL_HOST_ADDRESS};

/// Options for one connect session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Application the agent runs in. Also names the device-side socket.
    pub app_identifier: String,

    /// Device to forward the port to.
    pub device_identifier: String,

    /// Absolute directory that synced paths are made relative to
    /// (the application's platform assets directory).
    pub sync_root: PathBuf,

    /// Budget for the whole connect attempt, forwarding and retries included.
    pub connect_timeout: Duration,

    /// Local address the forwarded port is reachable on.
    pub host: IpAddr,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            app_identifier: String::new(),
            device_identifier: String::new(),
            sync_root: PathBuf::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host: DEFAULT_LOCAL_HOST_ADDRESS,
        }
    }
}

impl ConnectOptions {
    /// Start building connect options.
    pub fn builder() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new()
    }
}

/// Builder for [`ConnectOptions`].
#[derive(Debug, Default)]
pub struct ConnectOptionsBuilder {
    options: ConnectOptions,
}

impl ConnectOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application identifier.
    pub fn app_identifier(mut self, app_identifier: impl Into<String>) -> Self {
        self.options.app_identifier = app_identifier.into();
        self
    }

    /// Set the device identifier.
    pub fn device_identifier(mut self, device_identifier: impl Into<String>) -> Self {
        self.options.device_identifier = device_identifier.into();
        self
    }

    /// Set the sync root.
    pub fn sync_root(mut self, sync_root: impl Into<PathBuf>) -> Self {
        self.options.sync_root = sync_root.into();
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the local host address.
    pub fn host(mut self, host: IpAddr) -> Self {
        self.options.host = host;
        self
    }

    /// Build the options.
    pub fn build(self) -> ConnectOptions {
        self.options
    }
}
