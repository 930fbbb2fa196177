// Signal conditioning error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Signal error code constants
///
/// Error code range: 1001-1002
pub struct SignalErrorCodes {}

impl SignalErrorCodes {
    /// Sensor value non-finite or outside the physical range
    pub const INVALID_SAMPLE: i32 = 1001;

    /// Sample timestamp did not advance
    pub const NON_MONOTONIC_TIMESTAMP: i32 = 1002;
}

/// Log a dropped sample with structured context
///
/// Dropped samples are routine (sensor glitches), so this logs at warn level.
pub fn log_signal_error(err: &SignalError, context: &str) {
    warn!(
        "Signal error in {}: code={}, component=SignalConditioner, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while conditioning a raw sample
///
/// Either variant means the sample was dropped and filter state is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalError {
    /// Non-finite or out-of-range sensor value
    InvalidSample { reason: String },

    /// Timestamp not strictly greater than the previous accepted sample
    NonMonotonicTimestamp { previous_ms: u64, timestamp_ms: u64 },
}

impl ErrorCode for SignalError {
    fn code(&self) -> i32 {
        match self {
            SignalError::InvalidSample { .. } => SignalErrorCodes::INVALID_SAMPLE,
            SignalError::NonMonotonicTimestamp { .. } => {
                SignalErrorCodes::NON_MONOTONIC_TIMESTAMP
            }
        }
    }

    fn message(&self) -> String {
        match self {
            SignalError::InvalidSample { reason } => format!("Invalid sample: {}", reason),
            SignalError::NonMonotonicTimestamp {
                previous_ms,
                timestamp_ms,
            } => format!(
                "Invalid sample: timestamp {} ms does not advance past {} ms",
                timestamp_ms, previous_ms
            ),
        }
    }
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignalError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SignalError {}
