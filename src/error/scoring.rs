// Form scoring error types and constants

use crate::error::{ErrorCode, TrajectoryError};
use log::warn;
use std::fmt;

/// Scoring error code constants
///
/// Error code range: 3001-3002
pub struct ScoringErrorCodes {}

impl ScoringErrorCodes {
    /// Profile is not a valid baseline yet
    pub const NOT_CALIBRATED: i32 = 3001;

    /// Shot or reference trajectory cannot be compared
    pub const INVALID_TRAJECTORY: i32 = 3002;
}

/// Log a scoring error with structured context
pub fn log_scoring_error(err: &ScoringError, context: &str) {
    warn!(
        "Scoring error in {}: code={}, component=FormScorer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while scoring a shot against the baseline
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// Scoring requested before the profile became valid
    NotCalibrated,

    /// A trajectory involved in the comparison has fewer than two points
    InvalidTrajectory { points: usize },
}

impl ErrorCode for ScoringError {
    fn code(&self) -> i32 {
        match self {
            ScoringError::NotCalibrated => ScoringErrorCodes::NOT_CALIBRATED,
            ScoringError::InvalidTrajectory { .. } => ScoringErrorCodes::INVALID_TRAJECTORY,
        }
    }

    fn message(&self) -> String {
        match self {
            ScoringError::NotCalibrated => {
                "Not calibrated. Complete a calibration session first.".to_string()
            }
            ScoringError::InvalidTrajectory { points } => {
                format!("Cannot score trajectory with {} points", points)
            }
        }
    }
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScoringError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ScoringError {}

impl From<TrajectoryError> for ScoringError {
    fn from(err: TrajectoryError) -> Self {
        match err {
            TrajectoryError::InvalidTrajectory { points }
            | TrajectoryError::InvalidResolution { points } => {
                ScoringError::InvalidTrajectory { points }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_error_codes() {
        assert_eq!(ScoringError::NotCalibrated.code(), 3001);
        assert_eq!(ScoringError::InvalidTrajectory { points: 0 }.code(), 3002);
    }

    #[test]
    fn test_not_calibrated_message() {
        assert!(ScoringError::NotCalibrated
            .message()
            .contains("calibration"));
    }
}
