//! Protocol constants shared with the device-side agent.
//!
//! The wire values here MUST match the agent running inside the application.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

// =============================================================================
// OPERATION CODES
// =============================================================================

/// Create or update a file. Updates use the same frame as creates.
pub const CREATE_FILE_OPERATION: u8 = 0;

/// Delete a file.
pub const DELETE_FILE_OPERATION: u8 = 1;

// =============================================================================
// FRAME SIZES
// =============================================================================

/// Operation code field size (one ASCII digit).
pub const OPERATION_SIZE: usize = 1;

/// Size of the digit-count byte preceding every decimal length field.
pub const SIZE_OF_SIZE_BYTES: usize = 1;

/// MD5 digest size.
pub const DIGEST_SIZE: usize = 16;

/// Smallest possible delete frame: operation, one-digit length, one-byte name, digest.
pub const MIN_DELETE_FRAME_SIZE: usize = OPERATION_SIZE + SIZE_OF_SIZE_BYTES + 1 + 1 + DIGEST_SIZE;

// =============================================================================
// HANDSHAKE
// =============================================================================

/// Size of the protocol version length prefix in the handshake message.
pub const PROTOCOL_VERSION_LENGTH_SIZE: usize = 1;

/// Read buffer used while waiting for the handshake.
pub const HANDSHAKE_READ_BUFFER_SIZE: usize = 512;

/// How long to wait for the rest of a partially received identifier echo.
pub const HANDSHAKE_ECHO_GRACE: Duration = Duration::from_millis(100);

// =============================================================================
// CONNECTION
// =============================================================================

/// Default budget for a whole connect attempt, retries included.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between reconnect attempts while the agent is not yet listening.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(10);

/// Address the forwarded port is bound on.
pub const DEFAULT_LOCAL_HOST_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Prefix of the device-side abstract socket name.
pub const ABSTRACT_SOCKET_PREFIX: &str = "localabstract:";

/// Suffix appended to the application identifier to form the abstract socket name.
pub const ABSTRACT_SOCKET_SUFFIX: &str = "-livesync";

/// Abstract socket name the agent inside `app_identifier` listens on.
pub fn abstract_socket_name(app_identifier: &str) -> String {
    format!("{ABSTRACT_SOCKET_PREFIX}{app_identifier}{ABSTRACT_SOCKET_SUFFIX}")
}
