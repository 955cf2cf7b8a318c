//! Scoped access to the managed system service

use std::cell::RefCell;

use enforcer_sys::{ManagerConnection, ServiceHandle, ServiceManager};

use crate::error::Result;

// Field order matters: the service handle drops before its connection.
struct OpenService {
    service: Box<dyn ServiceHandle>,
    _connection: Box<dyn ManagerConnection>,
}

/// Lazily opened service-manager connection plus one service handle
///
/// Nothing is opened until the first call to [`ServiceSession::with`], so a
/// session for a run that aborts before any service stage never touches the
/// service manager. The handle and connection are released on [`close`] or
/// when the session is dropped, whichever comes first.
///
/// [`close`]: ServiceSession::close
pub struct ServiceSession<'a> {
    manager: &'a dyn ServiceManager,
    name: &'a str,
    open: RefCell<Option<OpenService>>,
}

impl<'a> ServiceSession<'a> {
    pub fn new(manager: &'a dyn ServiceManager, name: &'a str) -> Self {
        Self {
            manager,
            name,
            open: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn is_open(&self) -> bool {
        self.open.borrow().is_some()
    }

    /// Run `f` against the service handle, opening it first if needed
    pub fn with<T>(&self, f: impl FnOnce(&dyn ServiceHandle) -> Result<T>) -> Result<T> {
        let mut slot = self.open.borrow_mut();
        if let Some(open) = slot.as_ref() {
            return f(open.service.as_ref());
        }
        let open = slot.insert(self.connect()?);
        f(open.service.as_ref())
    }

    /// Release the handle and disconnect; a later [`with`](Self::with) reopens
    pub fn close(&self) {
        if self.open.borrow_mut().take().is_some() {
            tracing::debug!(service = self.name, "Released service session");
        }
    }

    fn connect(&self) -> Result<OpenService> {
        let connection = self.manager.connect()?;
        let service = connection.open_service(self.name)?;
        tracing::debug!(service = self.name, "Opened service session");
        Ok(OpenService {
            service,
            _connection: connection,
        })
    }
}

impl std::fmt::Debug for ServiceSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSession")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
