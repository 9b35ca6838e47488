//! Handshake message sent by the device-side agent.
//!
//! Wire format:
//! ```text
//! +----------------+------------------+----------------------------+
//! | Version Length | Protocol Version | Application Identifier     |
//! | 1 byte         | ASCII            | remaining bytes (echo)     |
//! +----------------+------------------+----------------------------+
//! ```

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::core::{HANDSHAKE_ECHO_GRACE, HANDSHAKE_READ_BUFFER_SIZE, PROTOCOL_VERSION_LENGTH_SIZE};

use super::error::TransportError;

/// Parsed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Protocol version announced by the agent.
    pub protocol_version: String,
    /// Application identifier echoed back by the agent.
    pub app_identifier: String,
}

impl Handshake {
    /// Parse a handshake from the bytes received so far.
    ///
    /// Returns [`HandshakeError::Incomplete`] while the version string has not
    /// fully arrived; the caller should read more and try again.
    pub fn parse(data: &[u8]) -> Result<Self, HandshakeError> {
        let Some(&version_len) = data.first() else {
            return Err(HandshakeError::Incomplete {
                expected: PROTOCOL_VERSION_LENGTH_SIZE,
                actual: 0,
            });
        };

        let version_end = PROTOCOL_VERSION_LENGTH_SIZE + version_len as usize;
        let version = data
            .get(PROTOCOL_VERSION_LENGTH_SIZE..version_end)
            .ok_or(HandshakeError::Incomplete {
                expected: version_end,
                actual: data.len(),
            })?;

        if version.is_empty() || !version.is_ascii() {
            return Err(HandshakeError::InvalidVersion);
        }

        Ok(Self {
            protocol_version: String::from_utf8_lossy(version).into_owned(),
            app_identifier: String::from_utf8_lossy(&data[version_end..]).into_owned(),
        })
    }

    /// Compare the echoed application identifier with `expected`.
    pub fn echo(&self, expected: &str) -> Echo {
        if self.app_identifier == expected {
            Echo::Matches
        } else if expected.starts_with(&self.app_identifier) {
            Echo::Partial
        } else {
            Echo::Differs
        }
    }
}

/// How the echoed application identifier relates to the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// Echo equals the expected identifier.
    Matches,
    /// Echo is a strict prefix (possibly empty) of the expected identifier.
    Partial,
    /// Echo names another application.
    Differs,
}

/// Errors that can occur while parsing a handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Not enough bytes yet.
    #[error("incomplete handshake: expected at least {expected} bytes, got {actual}")]
    Incomplete {
        /// Bytes needed.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Version string is empty or not ASCII.
    #[error("invalid protocol version")]
    InvalidVersion,
}

/// Wait for the agent's handshake on a freshly opened stream.
///
/// The echo has no length prefix. Once the version is complete, reading
/// continues while the echo is still a strict prefix of `expected_echo`,
/// for at most [`HANDSHAKE_ECHO_GRACE`] per read. A handshake whose echo
/// stays partial after that is returned as is.
///
/// Returns `Ok(None)` if the peer closes the stream before the handshake
/// (echo included) arrived.
pub async fn read_handshake<S>(
    stream: &mut S,
    expected_echo: &str,
) -> Result<Option<Handshake>, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut received = Vec::with_capacity(HANDSHAKE_READ_BUFFER_SIZE);
    let mut chunk = [0u8; HANDSHAKE_READ_BUFFER_SIZE];

    let mut handshake = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        received.extend_from_slice(&chunk[..n]);

        match Handshake::parse(&received) {
            Ok(handshake) => break handshake,
            Err(HandshakeError::Incomplete { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    };

    while handshake.echo(expected_echo) == Echo::Partial {
        let n = match tokio::time::timeout(HANDSHAKE_ECHO_GRACE, stream.read(&mut chunk)).await {
            Ok(read) => read?,
            Err(_) => break,
        };
        if n == 0 {
            return Ok(None);
        }
        received.extend_from_slice(&chunk[..n]);
        handshake = Handshake::parse(&received)?;
    }

    Ok(Some(handshake))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    use crate::transport::testing::handshake_bytes;

    #[test]
    fn test_parse_handshake() {
        let hs = Handshake::parse(&handshake_bytes("0.2.0", "org.comp.test")).unwrap();
        assert_eq!(hs.protocol_version, "0.2.0");
        assert_eq!(hs.app_identifier, "org.comp.test");
    }

    #[test]
    fn test_parse_without_echo() {
        let hs = Handshake::parse(&handshake_bytes("0.2.0", "")).unwrap();
        assert_eq!(hs.protocol_version, "0.2.0");
        assert!(hs.app_identifier.is_empty());
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(
            Handshake::parse(&[]),
            Err(HandshakeError::Incomplete {
                expected: 1,
                actual: 0
            })
        );
        assert_eq!(
            Handshake::parse(&[5, b'0', b'.']),
            Err(HandshakeError::Incomplete {
                expected: 6,
                actual: 3
            })
        );
    }

    #[test]
    fn test_parse_invalid_version() {
        assert_eq!(Handshake::parse(&[0]), Err(HandshakeError::InvalidVersion));
        assert_eq!(
            Handshake::parse(&[2, 0xC3, 0xBC]),
            Err(HandshakeError::InvalidVersion)
        );
    }

    #[tokio::test]
    async fn test_read_handshake_split_across_writes() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        let bytes = handshake_bytes("0.2.0", "org.comp.test");

        let writer = tokio::spawn(async move {
            remote.write_all(&bytes[..3]).await.unwrap();
            tokio::task::yield_now().await;
            remote.write_all(&bytes[3..]).await.unwrap();
            remote
        });

        let hs = read_handshake(&mut local, "org.comp.test").await.unwrap().unwrap();
        assert_eq!(hs.protocol_version, "0.2.0");
        assert_eq!(hs.app_identifier, "org.comp.test");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_handshake_split_mid_echo() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        let bytes = handshake_bytes("0.2.0", "org.comp.test");

        let writer = tokio::spawn(async move {
            remote.write_all(&bytes[..10]).await.unwrap();
            tokio::task::yield_now().await;
            remote.write_all(&bytes[10..]).await.unwrap();
            remote
        });

        let hs = read_handshake(&mut local, "org.comp.test").await.unwrap().unwrap();
        assert_eq!(hs.app_identifier, "org.comp.test");
        assert_eq!(hs.echo("org.comp.test"), Echo::Matches);
        drop(writer.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_handshake_partial_echo_gives_up() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        remote
            .write_all(&handshake_bytes("0.2.0", "org.comp"))
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        let hs = read_handshake(&mut local, "org.comp.test").await.unwrap().unwrap();

        assert_eq!(hs.app_identifier, "org.comp");
        assert_eq!(hs.echo("org.comp.test"), Echo::Partial);
        assert!(started.elapsed() >= HANDSHAKE_ECHO_GRACE);
        drop(remote);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_handshake_different_echo_returns_at_once() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        remote
            .write_all(&handshake_bytes("0.2.0", "com.other.app"))
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        let hs = read_handshake(&mut local, "org.comp.test").await.unwrap().unwrap();

        assert_eq!(hs.echo("org.comp.test"), Echo::Differs);
        assert!(started.elapsed() < HANDSHAKE_ECHO_GRACE);
        drop(remote);
    }

    #[tokio::test]
    async fn test_read_handshake_closed_mid_echo() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        remote
            .write_all(&handshake_bytes("0.2.0", "org.comp"))
            .await
            .unwrap();
        drop(remote);

        assert_eq!(read_handshake(&mut local, "org.comp.test").await.unwrap(), None);
    }

    #[test]
    fn test_echo_classification() {
        let hs = |echo: &str| Handshake {
            protocol_version: "0.2.0".into(),
            app_identifier: echo.into(),
        };
        assert_eq!(hs("org.comp.test").echo("org.comp.test"), Echo::Matches);
        assert_eq!(hs("org.").echo("org.comp.test"), Echo::Partial);
        assert_eq!(hs("").echo("org.comp.test"), Echo::Partial);
        assert_eq!(hs("test").echo("org.comp.test"), Echo::Differs);
        assert_eq!(hs("org.comp.test.x").echo("org.comp.test"), Echo::Differs);
    }

    #[tokio::test]
    async fn test_read_handshake_peer_closed() {
        let (mut local, remote) = tokio::io::duplex(64);
        drop(remote);

        assert_eq!(read_handshake(&mut local, "org.comp.test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_handshake_closed_mid_version() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        remote.write_all(&[5, b'0']).await.unwrap();
        drop(remote);

        assert_eq!(read_handshake(&mut local, "org.comp.test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_handshake_invalid() {
        let (mut local, mut remote) = tokio::io::duplex(64);
        remote.write_all(&[0, b'x']).await.unwrap();

        let err = read_handshake(&mut local, "org.comp.test").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Handshake(HandshakeError::InvalidVersion)
        ));
    }
}
