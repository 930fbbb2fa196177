// Configuration error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 6001-6002
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Single option outside its valid range
    pub const OUT_OF_RANGE: i32 = 6001;

    /// Options that are individually valid but contradict each other
    pub const INCONSISTENT: i32 = 6002;
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    OutOfRange {
        option: String,
        value: f64,
        expected: String,
    },

    Inconsistent { reason: String },
}

impl ConfigError {
    pub(crate) fn out_of_range(option: &str, value: f64, expected: &str) -> Self {
        ConfigError::OutOfRange {
            option: option.to_string(),
            value,
            expected: expected.to_string(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::OutOfRange { .. } => ConfigErrorCodes::OUT_OF_RANGE,
            ConfigError::Inconsistent { .. } => ConfigErrorCodes::INCONSISTENT,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::OutOfRange {
                option,
                value,
                expected,
            } => format!("{} = {} is out of range (expected {})", option, value, expected),
            ConfigError::Inconsistent { reason } => format!("Inconsistent config: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
