//! Input validation errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning a local file into frame input.
///
/// These are always reported before anything is written to the socket.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The path does not live under the sync root.
    #[error("{} is outside the sync root {}", path.display(), root.display())]
    OutsideSyncRoot {
        /// Offending path.
        path: PathBuf,
        /// Configured sync root.
        root: PathBuf,
    },

    /// The relative path is not valid UTF-8.
    #[error("{} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),

    /// The path resolves to the sync root itself.
    #[error("{} does not name a file below the sync root", .0.display())]
    EmptyPath(PathBuf),

    /// File content could not be read.
    #[error("failed to read {}: {}", path.display(), source)]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}
