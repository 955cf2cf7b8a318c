//! Service-manager access: value types, handle traits and the `sc.exe` backend
//!
//! Handles are released by dropping them. A [`ServiceHandle`] must be dropped
//! before the [`ManagerConnection`] it was opened from.

mod sc;
mod types;

pub use sc::{ScConnection, ScService, ScServiceManager, parse_description, parse_qc, parse_state};
pub use types::{ErrorControl, ServiceConfig, ServiceState, ServiceType, StartType};

use crate::error::Result;

/// Entry point to the system service manager
pub trait ServiceManager {
    /// Open a connection to the service manager
    fn connect(&self) -> Result<Box<dyn ManagerConnection>>;
}

/// An open service-manager connection; dropping it disconnects
pub trait ManagerConnection {
    /// Open one named service. A missing service is
    /// [`Error::ServiceNotFound`](crate::Error::ServiceNotFound).
    fn open_service(&self, name: &str) -> Result<Box<dyn ServiceHandle>>;
}

/// An open handle to one service; dropping it closes the handle
pub trait ServiceHandle {
    fn name(&self) -> &str;

    /// Persisted configuration of the service
    fn config(&self) -> Result<ServiceConfig>;

    /// Persist `config` as the service's new configuration
    fn update_config(&self, config: &ServiceConfig) -> Result<()>;

    /// Current run state
    fn query(&self) -> Result<ServiceState>;

    /// Issue a start command; does not wait for the service to run
    fn start(&self) -> Result<()>;
}
