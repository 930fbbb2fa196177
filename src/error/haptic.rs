// Haptic dispatch error types and constants

use crate::error::ErrorCode;
use crate::haptic::Zone;
use log::error;
use std::fmt;

/// Haptic error code constants
///
/// Error code range: 5001-5002
pub struct HapticErrorCodes {}

impl HapticErrorCodes {
    /// Actuator reported an unsafe condition
    pub const MOTOR_FAULT: i32 = 5001;

    /// Command failed validation (zero duration)
    pub const INVALID_COMMAND: i32 = 5002;
}

/// Log a haptic error with structured context
pub fn log_haptic_error(err: &HapticError, context: &str) {
    error!(
        "Haptic error in {}: code={}, component=HapticDispatcher, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Haptic scheduling errors
#[derive(Debug, Clone, PartialEq)]
pub enum HapticError {
    /// Zone is faulted; commands are rejected until the fault is cleared
    MotorFault { zone: Zone },

    /// Command cannot be scheduled
    InvalidCommand { reason: String },
}

impl ErrorCode for HapticError {
    fn code(&self) -> i32 {
        match self {
            HapticError::MotorFault { .. } => HapticErrorCodes::MOTOR_FAULT,
            HapticError::InvalidCommand { .. } => HapticErrorCodes::INVALID_COMMAND,
        }
    }

    fn message(&self) -> String {
        match self {
            HapticError::MotorFault { zone } => {
                format!("Motor fault on {:?}; zone idle until cleared", zone)
            }
            HapticError::InvalidCommand { reason } => format!("Invalid haptic command: {}", reason),
        }
    }
}

impl fmt::Display for HapticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HapticError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for HapticError {}
