//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration on thresholds and scoring weights without
//! recompilation. Every section carries documented defaults and missing
//! fields fall back to them, so a config file only needs the values being
//! tuned.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub signal: SignalConfig,
    pub segmentation: SegmentationConfig,
    pub calibration: CalibrationConfig,
    pub scoring: ScoringConfig,
    pub haptic: HapticConfig,
}

/// Sample filtering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Low-pass blend factor in (0, 1]; larger favors responsiveness
    pub low_pass_alpha: f64,
    /// Sensor counts corresponding to one g (MPU6050 at ±2 g: 16384)
    pub gravity_unit: f64,
    /// Blend factor for the gravity estimate while stationary
    pub gravity_alpha: f64,
    /// Fraction of one g the filtered magnitude may stray and still count as stationary
    pub stationary_tolerance: f64,
    /// How long the device must look stationary before gravity is re-estimated
    pub stationary_window_ms: u64,
    /// Largest plausible absolute acceleration component
    pub max_abs_accel: f64,
    /// Largest plausible absolute angular rate component (deg/s)
    pub max_abs_angular_rate: f64,
    /// Enable roll/pitch fusion for leveling trajectory points
    pub orientation_fusion: bool,
    pub orientation: OrientationConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            low_pass_alpha: 0.5,
            gravity_unit: 16384.0,
            gravity_alpha: 0.05,
            stationary_tolerance: 0.1,
            stationary_window_ms: 200,
            // 8 g and 4000 deg/s cover a full-range wrist flick with margin
            max_abs_accel: 131_072.0,
            max_abs_angular_rate: 4000.0,
            orientation_fusion: false,
            orientation: OrientationConfig::default(),
        }
    }
}

/// Kalman noise weights for orientation fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Process noise of the angle state
    pub q_angle: f64,
    /// Process noise of the gyro bias state
    pub q_bias: f64,
    /// Measurement noise of the accelerometer tilt angle
    pub r_measure: f64,
    /// Error covariance magnitude treated as divergence
    pub divergence_limit: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            q_angle: 0.001,
            q_bias: 0.003,
            r_measure: 0.03,
            divergence_limit: 1.0e6,
        }
    }
}

/// Shot segmentation state machine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Dynamic magnitude that arms the detector
    pub motion_threshold: f64,
    /// Dynamic magnitude that starts a shot capture
    pub shot_threshold: f64,
    /// Time allowed between arming and crossing the shot threshold
    pub motion_timeout_ms: u64,
    /// Quiet time below the motion threshold that ends a capture
    pub capture_debounce_ms: u64,
    /// Safety cutoff for a capture that never settles
    pub max_shot_duration_ms: u64,
    /// Dead time after a shot so follow-through does not re-trigger
    pub cooldown_ms: u64,
    /// Trajectory points retained per shot; older points are dropped on overflow
    pub trajectory_capacity: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 5000.0,
            shot_threshold: 15000.0,
            motion_timeout_ms: 1000,
            capture_debounce_ms: 150,
            max_shot_duration_ms: 3000,
            cooldown_ms: 500,
            trajectory_capacity: 100,
        }
    }
}

/// Calibration baseline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of accepted shots that make a valid baseline
    pub required_samples: usize,
    /// Shortest shot accepted as a real free throw
    pub min_plausible_duration_ms: u64,
    /// Longest shot accepted as a real free throw
    pub max_plausible_duration_ms: u64,
    /// Resample resolution used for medoid selection
    pub resample_points: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            required_samples: 10,
            min_plausible_duration_ms: 200,
            max_plausible_duration_ms: 2500,
            resample_points: 50,
        }
    }
}

/// Relative weight of each error term in the composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub acceleration: f64,
    pub duration: f64,
    pub trajectory: f64,
}

impl Default for ScoringWeights {
    /// Equal weighting: one unit of error in any term costs 10 points
    fn default() -> Self {
        Self {
            acceleration: 10.0,
            duration: 10.0,
            trajectory: 10.0,
        }
    }
}

/// Magnitude above which an error term is reported as a fault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultTolerances {
    pub acceleration: f64,
    pub duration: f64,
    pub trajectory: f64,
}

impl Default for FaultTolerances {
    fn default() -> Self {
        Self {
            acceleration: 1.5,
            duration: 1.5,
            trajectory: 1.0,
        }
    }
}

/// Form scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub tolerances: FaultTolerances,
    /// Trajectory distance that counts as one unit of trajectory error
    pub trajectory_scale: f64,
    /// Resample resolution for comparing a shot to the reference
    pub resample_points: usize,
    /// Floor for the peak standard deviation (avoids dividing by ~0)
    pub peak_std_floor: f64,
    /// Floor for the duration standard deviation in ms
    pub duration_std_floor_ms: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            tolerances: FaultTolerances::default(),
            trajectory_scale: 4096.0,
            resample_points: 50,
            peak_std_floor: 250.0,
            duration_std_floor_ms: 20.0,
        }
    }
}

/// Haptic scheduling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticConfig {
    /// Master switch; when off every command is discarded and motors stay silent
    pub enabled: bool,
    /// Starting intensity of Increasing/Decreasing ramps (0-255)
    pub ramp_base: u8,
    /// Frequency of the Wave pattern envelope
    pub wave_frequency_hz: f64,
    /// Full period of the Alternating square wave
    pub alternating_period_ms: u64,
    /// Actuator update tick used by the threaded engine
    pub tick_interval_ms: u64,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ramp_base: 64,
            wave_frequency_hz: 4.0,
            alternating_period_ms: 100,
            tick_interval_ms: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration. If the file doesn't exist or the JSON is invalid,
    /// a warning is logged and defaults are returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/trainer_config.json")
    }

    /// Check option ranges and cross-field ordering
    pub fn validate(&self) -> Result<(), ConfigError> {
        let signal = &self.signal;
        if !(signal.low_pass_alpha > 0.0 && signal.low_pass_alpha <= 1.0) {
            return Err(ConfigError::out_of_range(
                "signal.low_pass_alpha",
                signal.low_pass_alpha,
                "(0, 1]",
            ));
        }
        if !(signal.gravity_alpha > 0.0 && signal.gravity_alpha <= 1.0) {
            return Err(ConfigError::out_of_range(
                "signal.gravity_alpha",
                signal.gravity_alpha,
                "(0, 1]",
            ));
        }
        if signal.gravity_unit <= 0.0 {
            return Err(ConfigError::out_of_range(
                "signal.gravity_unit",
                signal.gravity_unit,
                "> 0",
            ));
        }

        let seg = &self.segmentation;
        if seg.motion_threshold <= 0.0 {
            return Err(ConfigError::out_of_range(
                "segmentation.motion_threshold",
                seg.motion_threshold,
                "> 0",
            ));
        }
        if seg.shot_threshold <= seg.motion_threshold {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "shot_threshold {} must exceed motion_threshold {}",
                    seg.shot_threshold, seg.motion_threshold
                ),
            });
        }
        if seg.max_shot_duration_ms == 0 || seg.capture_debounce_ms == 0 {
            return Err(ConfigError::Inconsistent {
                reason: "capture_debounce_ms and max_shot_duration_ms must be > 0".to_string(),
            });
        }
        if seg.trajectory_capacity < 2 {
            return Err(ConfigError::out_of_range(
                "segmentation.trajectory_capacity",
                seg.trajectory_capacity as f64,
                ">= 2",
            ));
        }

        let cal = &self.calibration;
        if cal.required_samples == 0 {
            return Err(ConfigError::out_of_range(
                "calibration.required_samples",
                0.0,
                ">= 1",
            ));
        }
        if cal.min_plausible_duration_ms >= cal.max_plausible_duration_ms {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "plausible duration window [{}, {}] is empty",
                    cal.min_plausible_duration_ms, cal.max_plausible_duration_ms
                ),
            });
        }
        if cal.resample_points < 2 || self.scoring.resample_points < 2 {
            return Err(ConfigError::Inconsistent {
                reason: "trajectory resample point count must be >= 2".to_string(),
            });
        }

        let scoring = &self.scoring;
        let weights = [
            scoring.weights.acceleration,
            scoring.weights.duration,
            scoring.weights.trajectory,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ConfigError::Inconsistent {
                reason: format!("scoring weights must be finite and > 0, got {:?}", weights),
            });
        }
        let tolerances = [
            ("scoring.tolerances.acceleration", scoring.tolerances.acceleration),
            ("scoring.tolerances.duration", scoring.tolerances.duration),
            ("scoring.tolerances.trajectory", scoring.tolerances.trajectory),
        ];
        for (option, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::out_of_range(option, value, "finite, >= 0"));
            }
        }
        let positive = [
            ("scoring.trajectory_scale", scoring.trajectory_scale),
            ("scoring.peak_std_floor", scoring.peak_std_floor),
            ("scoring.duration_std_floor_ms", scoring.duration_std_floor_ms),
        ];
        for (option, value) in positive {
            // Divisors of the normalized errors
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::out_of_range(option, value, "finite, > 0"));
            }
        }

        if self.haptic.alternating_period_ms == 0 || self.haptic.tick_interval_ms == 0 {
            return Err(ConfigError::Inconsistent {
                reason: "haptic periods must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.segmentation.motion_threshold, 5000.0);
        assert_eq!(config.segmentation.shot_threshold, 15000.0);
        assert_eq!(config.segmentation.motion_timeout_ms, 1000);
        assert_eq!(config.calibration.required_samples, 10);
        assert_eq!(config.scoring.weights.acceleration, config.scoring.weights.trajectory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "segmentation": { "shot_threshold": 18000.0 } }"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.segmentation.shot_threshold, 18000.0);
        assert_eq!(parsed.segmentation.motion_threshold, 5000.0);
        assert_eq!(parsed.signal, SignalConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/trainer_config.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_alpha() {
        let mut config = AppConfig::default();
        config.signal.low_pass_alpha = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        config.signal.low_pass_alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        let mut config = AppConfig::default();
        config.segmentation.shot_threshold = 4000.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_or_negative_weights() {
        let mut config = AppConfig::default();
        config.scoring.weights.duration = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent { .. })
        ));

        config.scoring.weights.duration = -1.0;
        assert!(config.validate().is_err());

        config.scoring.weights.duration = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_std_floors() {
        let mut config = AppConfig::default();
        config.scoring.peak_std_floor = 0.0;
        match config.validate() {
            Err(ConfigError::OutOfRange { option, .. }) => {
                assert_eq!(option, "scoring.peak_std_floor")
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        let mut config = AppConfig::default();
        config.scoring.duration_std_floor_ms = -5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = AppConfig::default();
        config.scoring.peak_std_floor = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_or_nan_tolerances() {
        let mut config = AppConfig::default();
        config.scoring.tolerances.trajectory = -0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = AppConfig::default();
        config.scoring.tolerances.acceleration = f64::NAN;
        assert!(config.validate().is_err());

        // Zero tolerance flags every deviation, which is allowed
        let mut config = AppConfig::default();
        config.scoring.tolerances.duration = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_haptics_enabled_by_default_and_switchable_from_json() {
        assert!(AppConfig::default().haptic.enabled);
        let json = r#"{ "haptic": { "enabled": false } }"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert!(!parsed.haptic.enabled);
        assert_eq!(parsed.haptic.tick_interval_ms, 5);
    }

    #[test]
    fn test_validate_rejects_small_capacity_and_resolution() {
        let mut config = AppConfig::default();
        config.segmentation.trajectory_capacity = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scoring.resample_points = 1;
        assert!(config.validate().is_err());
    }
}
