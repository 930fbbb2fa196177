// Calibration error types and constants

use crate::error::{ErrorCode, TrajectoryError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// finalize() called before the required shot count was accepted
    pub const INCOMPLETE: i32 = 2001;

    /// Shot duration outside the plausibility window
    pub const IMPLAUSIBLE_DURATION: i32 = 2002;

    /// Shot trajectory too short to compare
    pub const INVALID_TRAJECTORY: i32 = 2003;

    /// Required shot count already reached
    pub const ALREADY_COMPLETE: i32 = 2004;

    /// Persisted record failed validation
    pub const INVALID_RECORD: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationProfile, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Rejections from `add_sample` leave the accumulated baseline untouched;
/// `Incomplete` from `finalize` lets accumulation continue.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Not enough accepted shots to build a baseline
    Incomplete { required: usize, collected: usize },

    /// Shot duration outside the physical plausibility window
    ImplausibleDuration {
        duration_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },

    /// Shot trajectory has fewer than two points
    InvalidTrajectory { points: usize },

    /// The profile already holds the required number of shots
    AlreadyComplete { required: usize },

    /// A persisted calibration record is inconsistent
    InvalidRecord { reason: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::Incomplete { .. } => CalibrationErrorCodes::INCOMPLETE,
            CalibrationError::ImplausibleDuration { .. } => {
                CalibrationErrorCodes::IMPLAUSIBLE_DURATION
            }
            CalibrationError::InvalidTrajectory { .. } => CalibrationErrorCodes::INVALID_TRAJECTORY,
            CalibrationError::AlreadyComplete { .. } => CalibrationErrorCodes::ALREADY_COMPLETE,
            CalibrationError::InvalidRecord { .. } => CalibrationErrorCodes::INVALID_RECORD,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::Incomplete {
                required,
                collected,
            } => {
                format!(
                    "Calibration incomplete: need {}, got {}",
                    required, collected
                )
            }
            CalibrationError::ImplausibleDuration {
                duration_ms,
                min_ms,
                max_ms,
            } => format!(
                "Shot duration {} ms outside plausible range [{}, {}]",
                duration_ms, min_ms, max_ms
            ),
            CalibrationError::InvalidTrajectory { points } => {
                format!("Shot trajectory has {} points, need at least 2", points)
            }
            CalibrationError::AlreadyComplete { required } => {
                format!("Calibration already has all {} shots", required)
            }
            CalibrationError::InvalidRecord { reason } => {
                format!("Invalid calibration record: {}", reason)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

impl From<TrajectoryError> for CalibrationError {
    fn from(err: TrajectoryError) -> Self {
        match err {
            TrajectoryError::InvalidTrajectory { points } => {
                CalibrationError::InvalidTrajectory { points }
            }
            TrajectoryError::InvalidResolution { points } => CalibrationError::InvalidRecord {
                reason: format!("resample resolution {} is below 2", points),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::Incomplete {
                required: 10,
                collected: 9
            }
            .code(),
            CalibrationErrorCodes::INCOMPLETE
        );
        assert_eq!(
            CalibrationError::ImplausibleDuration {
                duration_ms: 50,
                min_ms: 200,
                max_ms: 2500
            }
            .code(),
            CalibrationErrorCodes::IMPLAUSIBLE_DURATION
        );
        assert_eq!(
            CalibrationError::InvalidTrajectory { points: 1 }.code(),
            CalibrationErrorCodes::INVALID_TRAJECTORY
        );
        assert_eq!(
            CalibrationError::AlreadyComplete { required: 10 }.code(),
            CalibrationErrorCodes::ALREADY_COMPLETE
        );
        assert_eq!(
            CalibrationError::InvalidRecord {
                reason: "test".to_string()
            }
            .code(),
            CalibrationErrorCodes::INVALID_RECORD
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::Incomplete {
            required: 10,
            collected: 9,
        };
        assert_eq!(err.message(), "Calibration incomplete: need 10, got 9");

        let err = CalibrationError::ImplausibleDuration {
            duration_ms: 50,
            min_ms: 200,
            max_ms: 2500,
        };
        assert!(err.message().contains("50 ms"));
        assert!(err.message().contains("[200, 2500]"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::AlreadyComplete { required: 10 };
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_trajectory_error_conversion() {
        let err: CalibrationError = TrajectoryError::InvalidTrajectory { points: 1 }.into();
        assert_eq!(err, CalibrationError::InvalidTrajectory { points: 1 });
    }
}
