//! In-memory service manager

use std::cell::RefCell;
use std::rc::Rc;

use enforcer_sys::{
    ErrorControl, ManagerConnection, Result, ServiceConfig, ServiceHandle, ServiceManager,
    ServiceState, ServiceType, StartType,
};

#[derive(Debug)]
struct Shared {
    name: String,
    exists: bool,
    config: ServiceConfig,
    state: ServiceState,
    refuse_updates: bool,
    refuse_start: bool,
    start_delay: u32,
    pending_queries: Option<u32>,
    config_updates: Vec<ServiceConfig>,
    starts: u32,
    open_connections: u32,
    open_handles: u32,
    events: Vec<String>,
}

/// A single fake service behind a fake service manager
///
/// Connections and handles share state with the manager, so a test can keep
/// the manager and inspect what the engine did after the run. Every connect,
/// open, close and disconnect is appended to [`events`](Self::events).
#[derive(Debug, Clone)]
pub struct FakeServiceManager {
    shared: Rc<RefCell<Shared>>,
}

/// A realistic configuration for the default service, set to automatic start
pub fn sample_config() -> ServiceConfig {
    ServiceConfig {
        service_type: ServiceType::OWN_PROCESS,
        start_type: StartType::Automatic,
        error_control: ErrorControl::Normal,
        binary_path: r#""C:\Program Files\Cloudflare\Cloudflare WARP\warp-svc.exe""#.to_string(),
        load_order_group: String::new(),
        dependencies: vec!["nsi".to_string(), "Tcpip".to_string()],
        account: "LocalSystem".to_string(),
        display_name: "Cloudflare WARP".to_string(),
        description: "Cloudflare Zero Trust Windows Service".to_string(),
        delayed_auto_start: false,
    }
}

impl FakeServiceManager {
    /// An existing, automatic-start, running service
    pub fn new(name: &str) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                name: name.to_string(),
                exists: true,
                config: sample_config(),
                state: ServiceState::Running,
                refuse_updates: false,
                refuse_start: false,
                start_delay: 0,
                pending_queries: None,
                config_updates: Vec::new(),
                starts: 0,
                open_connections: 0,
                open_handles: 0,
                events: Vec::new(),
            })),
        }
    }

    /// A manager that has no service of any name
    pub fn missing() -> Self {
        let manager = Self::new("");
        manager.shared.borrow_mut().exists = false;
        manager
    }

    pub fn with_config(self, config: ServiceConfig) -> Self {
        self.shared.borrow_mut().config = config;
        self
    }

    pub fn with_start_type(self, start_type: StartType) -> Self {
        self.shared.borrow_mut().config.start_type = start_type;
        self
    }

    pub fn with_state(self, state: ServiceState) -> Self {
        self.shared.borrow_mut().state = state;
        self
    }

    /// After a start request, report `StartPending` for this many queries
    pub fn with_start_delay(self, queries: u32) -> Self {
        self.shared.borrow_mut().start_delay = queries;
        self
    }

    /// Reject every configuration update
    pub fn refuse_updates(self) -> Self {
        self.shared.borrow_mut().refuse_updates = true;
        self
    }

    /// Accept start requests without the service ever reaching `Running`
    pub fn refuse_start(self) -> Self {
        self.shared.borrow_mut().refuse_start = true;
        self
    }

    pub fn config(&self) -> ServiceConfig {
        self.shared.borrow().config.clone()
    }

    pub fn config_updates(&self) -> Vec<ServiceConfig> {
        self.shared.borrow().config_updates.clone()
    }

    pub fn starts(&self) -> u32 {
        self.shared.borrow().starts
    }

    pub fn open_connections(&self) -> u32 {
        self.shared.borrow().open_connections
    }

    pub fn open_handles(&self) -> u32 {
        self.shared.borrow().open_handles
    }

    pub fn events(&self) -> Vec<String> {
        self.shared.borrow().events.clone()
    }
}

impl ServiceManager for FakeServiceManager {
    fn connect(&self) -> Result<Box<dyn ManagerConnection>> {
        let mut shared = self.shared.borrow_mut();
        shared.open_connections += 1;
        shared.events.push("connect".to_string());
        Ok(Box::new(FakeConnection {
            shared: Rc::clone(&self.shared),
        }))
    }
}

struct FakeConnection {
    shared: Rc<RefCell<Shared>>,
}

impl ManagerConnection for FakeConnection {
    fn open_service(&self, name: &str) -> Result<Box<dyn ServiceHandle>> {
        let mut shared = self.shared.borrow_mut();
        if !shared.exists || shared.name != name {
            return Err(enforcer_sys::Error::ServiceNotFound {
                name: name.to_string(),
            });
        }
        shared.open_handles += 1;
        shared.events.push(format!("open {name}"));
        Ok(Box::new(FakeService {
            name: name.to_string(),
            shared: Rc::clone(&self.shared),
        }))
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.open_connections -= 1;
        shared.events.push("disconnect".to_string());
    }
}

struct FakeService {
    name: String,
    shared: Rc<RefCell<Shared>>,
}

impl FakeService {
    fn rejected(&self, operation: &str) -> enforcer_sys::Error {
        enforcer_sys::Error::ServiceControl {
            name: self.name.clone(),
            operation: operation.to_string(),
            code: 5,
            message: "Access is denied.".to_string(),
        }
    }
}

impl ServiceHandle for FakeService {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Result<ServiceConfig> {
        Ok(self.shared.borrow().config.clone())
    }

    fn update_config(&self, config: &ServiceConfig) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.refuse_updates {
            return Err(self.rejected("config"));
        }
        shared.config = config.clone();
        shared.config_updates.push(config.clone());
        Ok(())
    }

    fn query(&self) -> Result<ServiceState> {
        let mut shared = self.shared.borrow_mut();
        if let Some(remaining) = shared.pending_queries {
            if remaining == 0 {
                shared.pending_queries = None;
                shared.state = ServiceState::Running;
            } else {
                shared.pending_queries = Some(remaining - 1);
            }
        }
        Ok(shared.state)
    }

    fn start(&self) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        shared.starts += 1;
        if shared.refuse_start {
            return Ok(());
        }
        if shared.start_delay == 0 {
            shared.state = ServiceState::Running;
        } else {
            shared.state = ServiceState::StartPending;
            shared.pending_queries = Some(shared.start_delay);
        }
        Ok(())
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.open_handles -= 1;
        shared.events.push(format!("close {}", self.name));
    }
}
