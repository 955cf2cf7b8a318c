//! Shared test fakes for the Enforcer workspace.
//!
//! Every collaborator trait the engine depends on has an in-memory fake here
//! that records the calls made against it. It is a dev-dependency only,
//! never published.
//!
//! # Modules
//!
//! - [`host`]: elevation, filesystem and process-table fakes
//! - [`services`]: [`FakeServiceManager`] with handle-release tracking
//! - [`commands`]: [`FakeCommandRunner`] with scripted output per command line

pub mod commands;
pub mod host;
pub mod services;

pub use commands::FakeCommandRunner;
pub use host::{FakeElevation, FakeFs, FakeProcessTable};
pub use services::{FakeServiceManager, sample_config};
