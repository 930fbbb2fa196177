// Error types for the free-throw trainer
//
// This module defines custom error types for every pipeline stage, providing
// structured error handling with numeric codes so collaborators (loggers,
// status displays) can react without matching on message text.
//
// None of these errors are fatal inside the core: each one describes a
// sample, shot or command that was set aside while the pipeline keeps running.

mod calibration;
mod config;
mod haptic;
mod scoring;
mod signal;
mod trajectory;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use haptic::{log_haptic_error, HapticError, HapticErrorCodes};
pub use scoring::{log_scoring_error, ScoringError, ScoringErrorCodes};
pub use signal::{log_signal_error, SignalError, SignalErrorCodes};
pub use trajectory::{TrajectoryError, TrajectoryErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// collaborator boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
