// FormScorer - compares a shot against the calibrated baseline
//
// Error terms:
// - acceleration: (peak - mean_peak) / max(std_peak, floor), signed
// - duration:     (duration - mean_duration) / max(std_duration, floor), signed
// - trajectory:   similarity(shot, reference) / trajectory_scale, >= 0
//
// Composite score = 100 - clamp(weighted sum of |terms|, 0, 100).

use serde::{Deserialize, Serialize};

use super::trajectory::similarity;
use super::Shot;
use crate::calibration::CalibrationProfile;
use crate::config::ScoringConfig;
use crate::error::ScoringError;

/// Form fault categories, in reporting precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFault {
    Acceleration,
    Duration,
    Trajectory,
}

/// Per-term deviation of one shot from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorVector {
    /// Positive: more forceful than baseline
    pub acceleration: f64,
    /// Positive: slower than baseline
    pub duration: f64,
    pub trajectory: f64,
    /// First term over its tolerance, if any
    pub dominant_fault: Option<FormFault>,
}

impl ErrorVector {
    /// Signed error of the given term
    pub fn term(&self, fault: FormFault) -> f64 {
        match fault {
            FormFault::Acceleration => self.acceleration,
            FormFault::Duration => self.duration,
            FormFault::Trajectory => self.trajectory,
        }
    }
}

/// Result of scoring one shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormAssessment {
    /// Composite score in [0, 100]
    pub score: f64,
    pub errors: ErrorVector,
}

impl FormAssessment {
    pub fn is_good_form(&self) -> bool {
        self.errors.dominant_fault.is_none()
    }
}

/// Stateless scorer holding only its configuration
#[derive(Debug, Clone)]
pub struct FormScorer {
    config: ScoringConfig,
}

impl FormScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a shot against a valid profile
    ///
    /// # Returns
    /// * `Ok(FormAssessment)` - error vector and composite score
    /// * `Err(ScoringError::NotCalibrated)` - profile has no baseline yet
    /// * `Err(ScoringError::InvalidTrajectory)` - shot path has < 2 points
    pub fn score(
        &self,
        shot: &Shot,
        profile: &CalibrationProfile,
    ) -> Result<FormAssessment, ScoringError> {
        let baseline = profile.baseline().ok_or(ScoringError::NotCalibrated)?;
        if shot.trajectory.len() < 2 {
            return Err(ScoringError::InvalidTrajectory {
                points: shot.trajectory.len(),
            });
        }

        let acceleration = (shot.peak_magnitude - baseline.mean_peak)
            / baseline.std_dev_peak.max(self.config.peak_std_floor);
        let duration = (shot.duration_ms as f64 - baseline.mean_duration)
            / baseline
                .std_dev_duration
                .max(self.config.duration_std_floor_ms);
        let trajectory = similarity(
            &shot.trajectory,
            &baseline.reference_trajectory,
            self.config.resample_points,
        )? / self.config.trajectory_scale;

        let weights = &self.config.weights;
        let penalty = weights.acceleration * acceleration.abs()
            + weights.duration * duration.abs()
            + weights.trajectory * trajectory;
        let score = 100.0 - penalty.clamp(0.0, 100.0);

        let tolerances = &self.config.tolerances;
        let dominant_fault = if acceleration.abs() > tolerances.acceleration {
            Some(FormFault::Acceleration)
        } else if duration.abs() > tolerances.duration {
            Some(FormFault::Duration)
        } else if trajectory > tolerances.trajectory {
            Some(FormFault::Trajectory)
        } else {
            None
        };

        Ok(FormAssessment {
            score,
            errors: ErrorVector {
                acceleration,
                duration,
                trajectory,
                dominant_fault,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ShotTermination;
    use crate::calibration::CalibrationRecord;
    use crate::config::CalibrationConfig;
    use crate::motion::Vector3;

    fn reference() -> Vec<Vector3> {
        (0..10)
            .map(|i| Vector3::new(i as f64 * 1000.0, (i * i) as f64 * 50.0, 0.0))
            .collect()
    }

    fn profile() -> CalibrationProfile {
        let record = CalibrationRecord {
            accepted_count: 10,
            mean_peak: 20000.0,
            mean_duration: 600.0,
            std_dev_peak: 1000.0,
            std_dev_duration: 50.0,
            reference_trajectory: reference(),
            is_valid: true,
        };
        CalibrationProfile::from_record(&record, CalibrationConfig::default()).unwrap()
    }

    fn shot(peak: f64, duration_ms: u64, trajectory: Vec<Vector3>) -> Shot {
        Shot {
            start_ms: 0,
            end_ms: duration_ms,
            peak_magnitude: peak,
            duration_ms,
            trajectory,
            dropped_points: 0,
            termination: ShotTermination::Settled,
            form_score: None,
        }
    }

    #[test]
    fn test_baseline_shot_scores_perfect() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(20000.0, 600, reference()), &profile())
            .unwrap();
        assert!((assessment.score - 100.0).abs() < 1e-9);
        assert_eq!(assessment.errors.dominant_fault, None);
        assert!(assessment.is_good_form());
    }

    #[test]
    fn test_forceful_shot_flags_acceleration() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(22000.0, 600, reference()), &profile())
            .unwrap();
        assert!((assessment.errors.acceleration - 2.0).abs() < 1e-9);
        assert!((assessment.score - 80.0).abs() < 1e-9);
        assert_eq!(
            assessment.errors.dominant_fault,
            Some(FormFault::Acceleration)
        );
    }

    #[test]
    fn test_acceleration_takes_precedence_over_duration() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(17000.0, 400, reference()), &profile())
            .unwrap();
        assert!(assessment.errors.acceleration < -1.5);
        assert!(assessment.errors.duration < -1.5);
        assert_eq!(
            assessment.errors.dominant_fault,
            Some(FormFault::Acceleration)
        );
    }

    #[test]
    fn test_slow_shot_flags_duration() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(20000.0, 700, reference()), &profile())
            .unwrap();
        assert!((assessment.errors.duration - 2.0).abs() < 1e-9);
        assert_eq!(assessment.errors.dominant_fault, Some(FormFault::Duration));
    }

    #[test]
    fn test_off_path_flags_trajectory() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let shifted: Vec<Vector3> = reference()
            .into_iter()
            .map(|p| p + Vector3::new(0.0, 0.0, 8192.0))
            .collect();
        let assessment = scorer
            .score(&shot(20000.0, 600, shifted), &profile())
            .unwrap();
        assert!((assessment.errors.trajectory - 2.0).abs() < 1e-9);
        assert_eq!(
            assessment.errors.dominant_fault,
            Some(FormFault::Trajectory)
        );
    }

    #[test]
    fn test_score_is_clamped_at_zero() {
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(60000.0, 2000, reference()), &profile())
            .unwrap();
        assert_eq!(assessment.score, 0.0);
    }

    #[test]
    fn test_std_floor_limits_sensitivity() {
        let record = CalibrationRecord {
            accepted_count: 10,
            mean_peak: 20000.0,
            mean_duration: 600.0,
            std_dev_peak: 0.0,
            std_dev_duration: 0.0,
            reference_trajectory: reference(),
            is_valid: true,
        };
        let tight = CalibrationProfile::from_record(&record, CalibrationConfig::default()).unwrap();
        let scorer = FormScorer::new(ScoringConfig::default());
        let assessment = scorer
            .score(&shot(20250.0, 610, reference()), &tight)
            .unwrap();
        assert!((assessment.errors.acceleration - 1.0).abs() < 1e-9);
        assert!((assessment.errors.duration - 0.5).abs() < 1e-9);
        assert!(assessment.score.is_finite());
    }

    #[test]
    fn test_uncalibrated_profile_rejected() {
        let scorer = FormScorer::new(ScoringConfig::default());
        assert_eq!(
            scorer.score(&shot(20000.0, 600, reference()), &CalibrationProfile::default()),
            Err(ScoringError::NotCalibrated)
        );
    }

    #[test]
    fn test_short_trajectory_rejected() {
        let scorer = FormScorer::new(ScoringConfig::default());
        assert_eq!(
            scorer.score(&shot(20000.0, 600, vec![Vector3::zero()]), &profile()),
            Err(ScoringError::InvalidTrajectory { points: 1 })
        );
    }
}
