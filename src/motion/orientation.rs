// OrientationFilter - roll/pitch fusion of gyro and accelerometer
//
// Each tilt axis runs a two-state Kalman filter (angle, gyro bias):
// 1. Predict: integrate the bias-corrected gyro rate over the tick delta
// 2. Update: correct toward the tilt angle implied by the gravity direction
//
// Process noise (q_angle, q_bias) and measurement noise (r_measure) are fixed
// configuration values. A diverging estimate resets the axis to the
// accelerometer angle instead of propagating garbage downstream.

use serde::{Deserialize, Serialize};

use super::Vector3;
use crate::config::OrientationConfig;

/// Upper bound on a believable tick delta; longer gaps reseed the filter
const MAX_DT_SECONDS: f64 = 0.5;

/// Fused device tilt in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll_deg: f64,
    pub pitch_deg: f64,
}

impl Orientation {
    /// Tilt implied by the gravity direction in an accelerometer reading
    pub fn from_accel(accel: &Vector3) -> Self {
        let roll = accel.y.atan2(accel.z);
        let pitch = (-accel.x).atan2((accel.y * accel.y + accel.z * accel.z).sqrt());
        Self {
            roll_deg: roll.to_degrees(),
            pitch_deg: pitch.to_degrees(),
        }
    }

    /// Rotate a device-frame vector into the level (yaw-free) frame
    pub fn level(&self, v: &Vector3) -> Vector3 {
        let (sr, cr) = self.roll_deg.to_radians().sin_cos();
        let (sp, cp) = self.pitch_deg.to_radians().sin_cos();

        // Rx(roll)
        let y1 = cr * v.y - sr * v.z;
        let z1 = sr * v.y + cr * v.z;
        // Ry(pitch)
        Vector3::new(cp * v.x + sp * z1, y1, -sp * v.x + cp * z1)
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisKalman {
    angle: f64,
    bias: f64,
    p: [[f64; 2]; 2],
}

impl AxisKalman {
    fn seeded(angle: f64) -> Self {
        Self {
            angle,
            bias: 0.0,
            p: [[0.0, 0.0], [0.0, 0.0]],
        }
    }

    fn predict(&mut self, rate: f64, dt: f64, q_angle: f64, q_bias: f64) {
        self.angle += dt * (rate - self.bias);

        let p = &mut self.p;
        p[0][0] += dt * (dt * p[1][1] - p[0][1] - p[1][0] + q_angle);
        p[0][1] -= dt * p[1][1];
        p[1][0] -= dt * p[1][1];
        p[1][1] += q_bias * dt;
    }

    fn update(&mut self, measured: f64, r_measure: f64) {
        let s = self.p[0][0] + r_measure;
        let k0 = self.p[0][0] / s;
        let k1 = self.p[1][0] / s;
        let innovation = measured - self.angle;

        self.angle += k0 * innovation;
        self.bias += k1 * innovation;

        let p00 = self.p[0][0];
        let p01 = self.p[0][1];
        self.p[0][0] -= k0 * p00;
        self.p[0][1] -= k0 * p01;
        self.p[1][0] -= k1 * p00;
        self.p[1][1] -= k1 * p01;
    }

    fn diverged(&self, limit: f64) -> bool {
        !self.angle.is_finite()
            || !self.bias.is_finite()
            || self.angle.abs() > 360.0
            || self.p.iter().flatten().any(|v| !v.is_finite() || v.abs() > limit)
    }
}

/// Predict/update orientation estimator for the wrist-worn tracker
#[derive(Debug, Clone)]
pub struct OrientationFilter {
    config: OrientationConfig,
    roll: Option<AxisKalman>,
    pitch: Option<AxisKalman>,
    last_timestamp_ms: Option<u64>,
    resets: u64,
}

impl OrientationFilter {
    pub fn new(config: OrientationConfig) -> Self {
        Self {
            config,
            roll: None,
            pitch: None,
            last_timestamp_ms: None,
            resets: 0,
        }
    }

    /// Run one predict/update cycle
    ///
    /// # Arguments
    /// * `accel` - Low-passed acceleration including gravity
    /// * `gyro` - Low-passed angular rate in deg/s
    /// * `timestamp_ms` - Sample timestamp
    pub fn update(&mut self, accel: &Vector3, gyro: &Vector3, timestamp_ms: u64) -> Orientation {
        let measured = Orientation::from_accel(accel);

        let dt = self
            .last_timestamp_ms
            .map(|last| timestamp_ms.saturating_sub(last) as f64 / 1000.0);
        self.last_timestamp_ms = Some(timestamp_ms);

        let dt = match dt {
            Some(dt) if dt > 0.0 && dt <= MAX_DT_SECONDS => dt,
            _ => return self.seed(measured),
        };
        let (mut roll, mut pitch) = match (self.roll, self.pitch) {
            (Some(roll), Some(pitch)) => (roll, pitch),
            _ => return self.seed(measured),
        };

        roll.predict(gyro.x, dt, self.config.q_angle, self.config.q_bias);
        roll.update(measured.roll_deg, self.config.r_measure);
        pitch.predict(gyro.y, dt, self.config.q_angle, self.config.q_bias);
        pitch.update(measured.pitch_deg, self.config.r_measure);

        let limit = self.config.divergence_limit;
        if roll.diverged(limit) || pitch.diverged(limit) {
            log::warn!(
                "[OrientationFilter] Estimate diverged (roll {:.1}, pitch {:.1}); resetting to accelerometer tilt",
                roll.angle,
                pitch.angle
            );
            self.resets += 1;
            return self.seed(measured);
        }

        self.roll = Some(roll);
        self.pitch = Some(pitch);
        Orientation {
            roll_deg: roll.angle,
            pitch_deg: pitch.angle,
        }
    }

    fn seed(&mut self, measured: Orientation) -> Orientation {
        self.roll = Some(AxisKalman::seeded(measured.roll_deg));
        self.pitch = Some(AxisKalman::seeded(measured.pitch_deg));
        measured
    }

    /// Number of divergence resets since construction
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn reset(&mut self) {
        self.roll = None;
        self.pitch = None;
        self.last_timestamp_ms = None;
    }
}
