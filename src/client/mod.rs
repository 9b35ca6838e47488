//! LiveSync Protocol - Sync Tool
//!
//! High-level API for pushing file changes to a running application.

mod config;
mod files;
mod tool;

pub use config::*;
pub use files::*;
pub use tool::*;
