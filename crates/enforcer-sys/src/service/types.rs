//! Service configuration and state values

use serde::{Deserialize, Serialize};

/// How the service manager starts a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartType {
    Boot,
    System,
    Automatic,
    Manual,
    Disabled,
}

impl StartType {
    /// Numeric code used by the service manager (`SERVICE_*_START`)
    pub fn code(self) -> u32 {
        match self {
            Self::Boot => 0,
            Self::System => 1,
            Self::Automatic => 2,
            Self::Manual => 3,
            Self::Disabled => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Boot),
            1 => Some(Self::System),
            2 => Some(Self::Automatic),
            3 => Some(Self::Manual),
            4 => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for StartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boot => "boot",
            Self::System => "system",
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Severity of a start failure, as the service manager handles it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorControl {
    Ignore,
    Normal,
    Severe,
    Critical,
}

impl ErrorControl {
    pub fn code(self) -> u32 {
        match self {
            Self::Ignore => 0,
            Self::Normal => 1,
            Self::Severe => 2,
            Self::Critical => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Ignore),
            1 => Some(Self::Normal),
            2 => Some(Self::Severe),
            3 => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Raw `SERVICE_*` type bit flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceType(pub u32);

impl ServiceType {
    pub const KERNEL_DRIVER: Self = Self(0x1);
    pub const FILE_SYSTEM_DRIVER: Self = Self(0x2);
    pub const OWN_PROCESS: Self = Self(0x10);
    pub const SHARE_PROCESS: Self = Self(0x20);
    pub const INTERACTIVE_PROCESS: u32 = 0x100;

    pub fn is_interactive(self) -> bool {
        self.0 & Self::INTERACTIVE_PROCESS != 0
    }
}

/// Current run state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

impl ServiceState {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Stopped),
            2 => Some(Self::StartPending),
            3 => Some(Self::StopPending),
            4 => Some(Self::Running),
            5 => Some(Self::ContinuePending),
            6 => Some(Self::PausePending),
            7 => Some(Self::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::StartPending => "start pending",
            Self::StopPending => "stop pending",
            Self::Running => "running",
            Self::ContinuePending => "continue pending",
            Self::PausePending => "pause pending",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Persisted configuration of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_type: ServiceType,
    pub start_type: StartType,
    pub error_control: ErrorControl,
    pub binary_path: String,
    pub load_order_group: String,
    pub dependencies: Vec<String>,
    /// Account the service runs as (`SERVICE_START_NAME`)
    pub account: String,
    pub display_name: String,
    pub description: String,
    pub delayed_auto_start: bool,
}

impl ServiceConfig {
    /// A copy of this configuration with only the start type replaced
    pub fn with_start_type(&self, start_type: StartType) -> Self {
        Self {
            start_type,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_type_codes_round_trip() {
        for start in [
            StartType::Boot,
            StartType::System,
            StartType::Automatic,
            StartType::Manual,
            StartType::Disabled,
        ] {
            assert_eq!(StartType::from_code(start.code()), Some(start));
        }
        assert_eq!(StartType::from_code(9), None);
    }

    #[test]
    fn test_interactive_flag() {
        assert!(ServiceType(0x110).is_interactive());
        assert!(!ServiceType::OWN_PROCESS.is_interactive());
    }

    #[test]
    fn test_unknown_state_code() {
        assert_eq!(ServiceState::from_code(4), Some(ServiceState::Running));
        assert_eq!(ServiceState::from_code(0), None);
    }
}
