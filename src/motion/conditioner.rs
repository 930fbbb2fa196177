// SignalConditioner - per-sample filtering stage
//
// Pipeline for each raw sample:
// 1. Validate (finite, within physical range, timestamp strictly advancing)
// 2. Low-pass accel and gyro per axis
// 3. Track gravity while the device is stationary and subtract it
// 4. Optionally fuse roll/pitch so trajectory points can be leveled
//
// A rejected sample leaves every piece of filter state untouched.

use super::{MotionSample, OrientationFilter, Vector3};
use crate::config::SignalConfig;
use crate::error::SignalError;

/// Low-pass + gravity compensation filter for raw IMU samples
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    config: SignalConfig,
    /// Previous filtered (accel, gyro); None until the first accepted sample
    filtered: Option<(Vector3, Vector3)>,
    gravity: Vector3,
    /// Timestamp at which the current stationary stretch began
    stationary_since: Option<u64>,
    last_timestamp_ms: Option<u64>,
    orientation: Option<OrientationFilter>,
    accepted: u64,
    dropped: u64,
}

impl SignalConditioner {
    pub fn new(config: SignalConfig) -> Self {
        let orientation = config
            .orientation_fusion
            .then(|| OrientationFilter::new(config.orientation.clone()));
        Self {
            gravity: Self::initial_gravity(&config),
            config,
            filtered: None,
            stationary_since: None,
            last_timestamp_ms: None,
            orientation,
            accepted: 0,
            dropped: 0,
        }
    }

    fn initial_gravity(config: &SignalConfig) -> Vector3 {
        Vector3::new(0.0, 0.0, config.gravity_unit)
    }

    /// Filter one raw sample
    ///
    /// # Returns
    /// * `Ok(MotionSample)` - gravity-compensated sample with its magnitude
    /// * `Err(SignalError)` - sample dropped, state unchanged
    pub fn ingest(&mut self, raw: &MotionSample) -> Result<MotionSample, SignalError> {
        if let Err(err) = self.validate(raw) {
            self.dropped += 1;
            return Err(err);
        }

        let alpha = self.config.low_pass_alpha;
        let (accel, gyro) = match self.filtered {
            Some((prev_accel, prev_gyro)) => (
                raw.accel.blend(&prev_accel, alpha),
                raw.gyro.blend(&prev_gyro, alpha),
            ),
            None => (raw.accel, raw.gyro),
        };
        self.filtered = Some((accel, gyro));
        self.last_timestamp_ms = Some(raw.timestamp_ms);
        self.accepted += 1;

        self.track_gravity(&accel, raw.timestamp_ms);

        let orientation = self
            .orientation
            .as_mut()
            .map(|filter| filter.update(&accel, &gyro, raw.timestamp_ms));

        let dynamic = accel - self.gravity;
        Ok(MotionSample {
            accel: dynamic,
            gyro,
            magnitude: dynamic.norm(),
            timestamp_ms: raw.timestamp_ms,
            orientation,
        })
    }

    fn validate(&self, raw: &MotionSample) -> Result<(), SignalError> {
        if !raw.accel.is_finite() || !raw.gyro.is_finite() {
            return Err(SignalError::InvalidSample {
                reason: "non-finite sensor value".to_string(),
            });
        }
        if raw.accel.max_abs() > self.config.max_abs_accel {
            return Err(SignalError::InvalidSample {
                reason: format!(
                    "acceleration component {:.0} exceeds {:.0}",
                    raw.accel.max_abs(),
                    self.config.max_abs_accel
                ),
            });
        }
        if raw.gyro.max_abs() > self.config.max_abs_angular_rate {
            return Err(SignalError::InvalidSample {
                reason: format!(
                    "angular rate component {:.0} exceeds {:.0}",
                    raw.gyro.max_abs(),
                    self.config.max_abs_angular_rate
                ),
            });
        }
        if let Some(previous_ms) = self.last_timestamp_ms {
            if raw.timestamp_ms <= previous_ms {
                return Err(SignalError::NonMonotonicTimestamp {
                    previous_ms,
                    timestamp_ms: raw.timestamp_ms,
                });
            }
        }
        Ok(())
    }

    fn track_gravity(&mut self, accel: &Vector3, timestamp_ms: u64) {
        let unit = self.config.gravity_unit;
        let stationary =
            (accel.norm() - unit).abs() <= self.config.stationary_tolerance * unit;

        if !stationary {
            self.stationary_since = None;
            return;
        }

        let since = *self.stationary_since.get_or_insert(timestamp_ms);
        if timestamp_ms - since >= self.config.stationary_window_ms {
            self.gravity = accel.blend(&self.gravity, self.config.gravity_alpha);
        }
    }

    /// Current gravity estimate in sensor counts
    pub fn gravity(&self) -> Vector3 {
        self.gravity
    }

    /// Number of samples rejected since construction or last reset
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Clear all filter state (new session, sensor re-attached)
    pub fn reset(&mut self) {
        self.filtered = None;
        self.gravity = Self::initial_gravity(&self.config);
        self.stationary_since = None;
        self.last_timestamp_ms = None;
        self.accepted = 0;
        self.dropped = 0;
        if let Some(filter) = self.orientation.as_mut() {
            filter.reset();
        }
    }
}
