// Progress tracking for calibration shot collection

use serde::{Deserialize, Serialize};

/// Progress through baseline collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    /// Shots accepted so far
    pub accepted: usize,
    /// Shots needed for a valid baseline
    pub required: usize,
}

impl CalibrationProgress {
    /// All required shots have been accepted
    pub fn is_complete(&self) -> bool {
        self.accepted >= self.required
    }

    pub fn remaining(&self) -> usize {
        self.required.saturating_sub(self.accepted)
    }

    /// Completion percentage (0-100)
    pub fn percent(&self) -> u8 {
        if self.required == 0 {
            return 100;
        }
        ((self.accepted.min(self.required) * 100) / self.required) as u8
    }
}
