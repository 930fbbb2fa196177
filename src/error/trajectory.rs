// Trajectory comparison error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Trajectory error code constants
///
/// Error code range: 4001-4002
pub struct TrajectoryErrorCodes {}

impl TrajectoryErrorCodes {
    /// Path has fewer than two points
    pub const INVALID_TRAJECTORY: i32 = 4001;

    /// Resample resolution below two points
    pub const INVALID_RESOLUTION: i32 = 4002;
}

/// Errors raised by trajectory resampling and similarity
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// A path needs at least two points to be resampled
    InvalidTrajectory { points: usize },

    /// Resampling to fewer than two points is meaningless
    InvalidResolution { points: usize },
}

impl ErrorCode for TrajectoryError {
    fn code(&self) -> i32 {
        match self {
            TrajectoryError::InvalidTrajectory { .. } => TrajectoryErrorCodes::INVALID_TRAJECTORY,
            TrajectoryError::InvalidResolution { .. } => TrajectoryErrorCodes::INVALID_RESOLUTION,
        }
    }

    fn message(&self) -> String {
        match self {
            TrajectoryError::InvalidTrajectory { points } => {
                format!("Invalid trajectory: need at least 2 points, got {}", points)
            }
            TrajectoryError::InvalidResolution { points } => {
                format!("Invalid resample resolution: need at least 2, got {}", points)
            }
        }
    }
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrajectoryError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TrajectoryError {}
