// CalibrationProfile - per-user statistical baseline
//
// Accepted calibration shots are accumulated as running sums and sums of
// squares of peak magnitude and duration, plus the raw trajectories. Once the
// required count is reached, finalize() computes means, population standard
// deviations and the medoid trajectory (the accepted path with the smallest
// average distance to all others), which becomes the scoring reference.

use serde::{Deserialize, Serialize};

use super::progress::CalibrationProgress;
use super::record::CalibrationRecord;
use crate::analysis::trajectory::similarity;
use crate::analysis::Shot;
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::motion::Vector3;

/// Finalized baseline statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean_peak: f64,
    pub std_dev_peak: f64,
    pub mean_duration: f64,
    pub std_dev_duration: f64,
    pub reference_trajectory: Vec<Vector3>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RunningStats {
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn mean(&self, n: usize) -> f64 {
        if n == 0 {
            0.0
        } else {
            self.sum / n as f64
        }
    }

    /// Population standard deviation
    fn std_dev(&self, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let mean = self.mean(n);
        (self.sum_sq / n as f64 - mean * mean).max(0.0).sqrt()
    }
}

/// Baseline accumulator and, once finalized, the scoring reference
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProfile {
    config: CalibrationConfig,
    accepted: usize,
    peak: RunningStats,
    duration: RunningStats,
    trajectories: Vec<Vec<Vector3>>,
    baseline: Option<Baseline>,
}

impl CalibrationProfile {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            accepted: 0,
            peak: RunningStats::default(),
            duration: RunningStats::default(),
            trajectories: Vec::new(),
            baseline: None,
        }
    }

    /// Offer a calibration shot
    ///
    /// # Returns
    /// * `Ok(CalibrationProgress)` - shot accepted and counted
    /// * `Err(CalibrationError)` - shot rejected; nothing accumulated
    pub fn add_sample(&mut self, shot: &Shot) -> Result<CalibrationProgress, CalibrationError> {
        let required = self.config.required_samples;
        if self.accepted >= required {
            return Err(CalibrationError::AlreadyComplete { required });
        }

        let (min_ms, max_ms) = (
            self.config.min_plausible_duration_ms,
            self.config.max_plausible_duration_ms,
        );
        if shot.duration_ms < min_ms || shot.duration_ms > max_ms {
            return Err(CalibrationError::ImplausibleDuration {
                duration_ms: shot.duration_ms,
                min_ms,
                max_ms,
            });
        }
        if shot.trajectory.len() < 2 {
            return Err(CalibrationError::InvalidTrajectory {
                points: shot.trajectory.len(),
            });
        }

        self.peak.push(shot.peak_magnitude);
        self.duration.push(shot.duration_ms as f64);
        self.trajectories.push(shot.trajectory.clone());
        self.accepted += 1;

        log::info!(
            "[CalibrationProfile] Accepted shot {}/{} (peak {:.0}, {} ms)",
            self.accepted,
            required,
            shot.peak_magnitude,
            shot.duration_ms
        );
        Ok(self.progress())
    }

    /// Compute the baseline from the accepted shots
    ///
    /// Idempotent once the profile is valid.
    pub fn finalize(&mut self) -> Result<&Baseline, CalibrationError> {
        if self.baseline.is_none() {
            let baseline = self.compute_baseline()?;
            log::info!(
                "[CalibrationProfile] Baseline ready: peak {:.0} ± {:.0}, duration {:.0} ± {:.0} ms",
                baseline.mean_peak,
                baseline.std_dev_peak,
                baseline.mean_duration,
                baseline.std_dev_duration
            );
            self.baseline = Some(baseline);
        }
        self.baseline
            .as_ref()
            .ok_or(CalibrationError::Incomplete {
                required: self.config.required_samples,
                collected: self.accepted,
            })
    }

    fn compute_baseline(&self) -> Result<Baseline, CalibrationError> {
        let required = self.config.required_samples;
        if self.accepted != required || self.trajectories.is_empty() {
            return Err(CalibrationError::Incomplete {
                required,
                collected: self.accepted,
            });
        }

        let reference = self.medoid()?;
        Ok(Baseline {
            mean_peak: self.peak.mean(self.accepted),
            std_dev_peak: self.peak.std_dev(self.accepted),
            mean_duration: self.duration.mean(self.accepted),
            std_dev_duration: self.duration.std_dev(self.accepted),
            reference_trajectory: self.trajectories[reference].clone(),
        })
    }

    /// Index of the trajectory with minimal average distance to the others
    ///
    /// Ties resolve to the earliest accepted shot.
    fn medoid(&self) -> Result<usize, CalibrationError> {
        let n = self.trajectories.len();
        let resolution = self.config.resample_points;
        let mut distances = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = similarity(&self.trajectories[i], &self.trajectories[j], resolution)?;
                distances[i][j] = d;
                distances[j][i] = d;
            }
        }

        let mut best = 0;
        let mut best_avg = f64::INFINITY;
        for (i, row) in distances.iter().enumerate() {
            let avg = if n > 1 {
                row.iter().sum::<f64>() / (n - 1) as f64
            } else {
                0.0
            };
            if avg < best_avg {
                best = i;
                best_avg = avg;
            }
        }
        Ok(best)
    }

    /// Discard everything, including a finalized baseline
    pub fn reset(&mut self) {
        self.accepted = 0;
        self.peak = RunningStats::default();
        self.duration = RunningStats::default();
        self.trajectories.clear();
        self.baseline = None;
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            accepted: self.accepted,
            required: self.config.required_samples,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted
    }

    /// Finalized statistics; None until the profile is valid
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Snapshot for the persistence collaborator
    pub fn to_record(&self) -> CalibrationRecord {
        match &self.baseline {
            Some(baseline) => CalibrationRecord {
                accepted_count: self.accepted,
                mean_peak: baseline.mean_peak,
                mean_duration: baseline.mean_duration,
                std_dev_peak: baseline.std_dev_peak,
                std_dev_duration: baseline.std_dev_duration,
                reference_trajectory: baseline.reference_trajectory.clone(),
                is_valid: true,
            },
            None => CalibrationRecord {
                accepted_count: self.accepted,
                mean_peak: self.peak.mean(self.accepted),
                mean_duration: self.duration.mean(self.accepted),
                std_dev_peak: self.peak.std_dev(self.accepted),
                std_dev_duration: self.duration.std_dev(self.accepted),
                reference_trajectory: Vec::new(),
                is_valid: false,
            },
        }
    }

    /// Restore a profile from a persisted record
    ///
    /// A record marked invalid restores an empty profile, since the raw
    /// trajectories of a partial calibration are not persisted.
    pub fn from_record(
        record: &CalibrationRecord,
        config: CalibrationConfig,
    ) -> Result<Self, CalibrationError> {
        let mut profile = Self::new(config);
        if !record.is_valid {
            log::info!(
                "[CalibrationProfile] Record is not a finished baseline ({} shots); starting fresh",
                record.accepted_count
            );
            return Ok(profile);
        }

        record.validate(profile.config.required_samples)?;
        profile.accepted = record.accepted_count;
        profile.baseline = Some(Baseline {
            mean_peak: record.mean_peak,
            std_dev_peak: record.std_dev_peak,
            mean_duration: record.mean_duration,
            std_dev_duration: record.std_dev_duration,
            reference_trajectory: record.reference_trajectory.clone(),
        });
        Ok(profile)
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ShotTermination;

    fn shot(peak: f64, duration_ms: u64, offset: f64) -> Shot {
        let trajectory = (0..5)
            .map(|i| Vector3::new(i as f64 * 100.0, offset, 0.0))
            .collect();
        Shot {
            start_ms: 1000,
            end_ms: 1000 + duration_ms,
            peak_magnitude: peak,
            duration_ms,
            trajectory,
            dropped_points: 0,
            termination: ShotTermination::Settled,
            form_score: None,
        }
    }

    fn calibrated(profile: &mut CalibrationProfile) {
        for i in 0..10 {
            profile
                .add_sample(&shot(20000.0 + i as f64 * 100.0, 600 + i * 10, i as f64))
                .unwrap();
        }
    }

    #[test]
    fn test_finalize_requires_full_count() {
        let mut profile = CalibrationProfile::default();
        for i in 0..9 {
            profile.add_sample(&shot(20000.0, 600, i as f64)).unwrap();
        }
        assert_eq!(
            profile.finalize().unwrap_err(),
            CalibrationError::Incomplete {
                required: 10,
                collected: 9
            }
        );
        assert!(!profile.is_valid());

        let progress = profile.add_sample(&shot(20000.0, 600, 9.0)).unwrap();
        assert!(progress.is_complete());
        assert!(profile.finalize().is_ok());
        assert!(profile.is_valid());
    }

    #[test]
    fn test_baseline_statistics() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        let baseline = profile.finalize().unwrap().clone();

        assert!((baseline.mean_peak - 20450.0).abs() < 1e-6);
        assert!((baseline.mean_duration - 645.0).abs() < 1e-6);
        // Population std of 0..9 scaled: sqrt(8.25) * step
        assert!((baseline.std_dev_peak - 8.25_f64.sqrt() * 100.0).abs() < 1e-6);
        assert!((baseline.std_dev_duration - 8.25_f64.sqrt() * 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_medoid_is_central_trajectory() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        let baseline = profile.finalize().unwrap();
        // Offsets 0..9: 4 and 5 are equally central, earliest wins
        assert_eq!(baseline.reference_trajectory[0].y, 4.0);
    }

    #[test]
    fn test_rejections_are_not_counted() {
        let mut profile = CalibrationProfile::default();
        assert!(matches!(
            profile.add_sample(&shot(20000.0, 50, 0.0)),
            Err(CalibrationError::ImplausibleDuration { duration_ms: 50, .. })
        ));
        assert!(matches!(
            profile.add_sample(&shot(20000.0, 4000, 0.0)),
            Err(CalibrationError::ImplausibleDuration { .. })
        ));

        let mut short = shot(20000.0, 600, 0.0);
        short.trajectory.truncate(1);
        assert_eq!(
            profile.add_sample(&short),
            Err(CalibrationError::InvalidTrajectory { points: 1 })
        );
        assert_eq!(profile.accepted_count(), 0);
    }

    #[test]
    fn test_extra_shot_rejected_when_complete() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        assert_eq!(
            profile.add_sample(&shot(20000.0, 600, 0.0)),
            Err(CalibrationError::AlreadyComplete { required: 10 })
        );
        assert_eq!(profile.accepted_count(), 10);
    }

    #[test]
    fn test_reset_invalidates() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        profile.finalize().unwrap();
        profile.reset();
        assert!(!profile.is_valid());
        assert_eq!(profile.accepted_count(), 0);
        assert!(profile.baseline().is_none());
    }

    #[test]
    fn test_record_restores_baseline() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        profile.finalize().unwrap();

        let record = profile.to_record();
        assert!(record.is_valid);
        let restored =
            CalibrationProfile::from_record(&record, CalibrationConfig::default()).unwrap();
        assert!(restored.is_valid());
        assert_eq!(restored.baseline(), profile.baseline());
        assert_eq!(restored.accepted_count(), 10);
    }

    #[test]
    fn test_partial_record_restores_empty_profile() {
        let mut profile = CalibrationProfile::default();
        profile.add_sample(&shot(20000.0, 600, 0.0)).unwrap();
        let record = profile.to_record();
        assert!(!record.is_valid);

        let restored =
            CalibrationProfile::from_record(&record, CalibrationConfig::default()).unwrap();
        assert_eq!(restored.accepted_count(), 0);
        assert!(!restored.is_valid());
    }

    #[test]
    fn test_record_with_wrong_count_rejected() {
        let mut profile = CalibrationProfile::default();
        calibrated(&mut profile);
        profile.finalize().unwrap();
        let mut record = profile.to_record();
        record.accepted_count = 7;
        assert!(matches!(
            CalibrationProfile::from_record(&record, CalibrationConfig::default()),
            Err(CalibrationError::InvalidRecord { .. })
        ));
    }
}
