//! LiveSync Protocol - Core types, constants, and collaborator traits.
//!
//! This module has no async or hashing dependencies. It defines the wire
//! constants, the path translation rules, and the boundaries to the services
//! the engine consumes but does not implement.

mod constants;
mod error;
mod path;
mod traits;

pub use constants::*;
pub use error::*;
pub use path::*;
pub use traits::*;
