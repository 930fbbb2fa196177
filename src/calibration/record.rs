// CalibrationRecord - persistence boundary for a finished baseline
//
// The storage format itself belongs to a collaborator; this crate only
// guarantees that the record round-trips through serde and that a restored
// record is internally consistent.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::motion::Vector3;

/// Serializable snapshot of a calibration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub accepted_count: usize,
    pub mean_peak: f64,
    pub mean_duration: f64,
    pub std_dev_peak: f64,
    pub std_dev_duration: f64,
    #[serde(default)]
    pub reference_trajectory: Vec<Vector3>,
    pub is_valid: bool,
}

impl CalibrationRecord {
    /// Check that a record marked valid can back a scoring baseline
    pub fn validate(&self, required: usize) -> Result<(), CalibrationError> {
        if self.accepted_count != required {
            return Err(CalibrationError::InvalidRecord {
                reason: format!(
                    "accepted_count {} does not match required {}",
                    self.accepted_count, required
                ),
            });
        }
        if self.reference_trajectory.len() < 2 {
            return Err(CalibrationError::InvalidRecord {
                reason: format!(
                    "reference trajectory has {} points",
                    self.reference_trajectory.len()
                ),
            });
        }
        if self
            .reference_trajectory
            .iter()
            .any(|point| !point.is_finite())
        {
            return Err(CalibrationError::InvalidRecord {
                reason: "reference trajectory contains non-finite points".to_string(),
            });
        }

        let stats = [
            ("mean_peak", self.mean_peak),
            ("mean_duration", self.mean_duration),
            ("std_dev_peak", self.std_dev_peak),
            ("std_dev_duration", self.std_dev_duration),
        ];
        for (name, value) in stats {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::InvalidRecord {
                    reason: format!("{} = {} must be finite and non-negative", name, value),
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
