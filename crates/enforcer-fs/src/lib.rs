//! Filesystem abstraction for the Enforcer watchdog
//!
//! Provides read-only existence checks used by the installation probe and
//! format-agnostic loading and saving of the watchdog configuration.

pub mod config;
pub mod error;
pub mod filesystem;
pub mod io;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use filesystem::{FileSystem, LocalFs};
