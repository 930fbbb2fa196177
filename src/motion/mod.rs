// Motion module - sensor sample types and signal conditioning
//
// This module provides the sample-level building blocks of the pipeline:
// 1. Vector3 / MotionSample: the data carried on every sampling tick
// 2. SignalConditioner: low-pass filter + gravity compensation
// 3. OrientationFilter: optional roll/pitch fusion for leveling trajectories
//
// Units: acceleration is in raw sensor counts (16384 counts = 1 g by
// default), angular rate in degrees per second, timestamps in milliseconds.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

pub mod conditioner;
pub mod orientation;

pub use conditioner::SignalConditioner;
pub use orientation::{Orientation, OrientationFilter};

/// Three-axis real-valued vector (acceleration, angular rate or path point)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another vector
    pub fn distance(&self, other: &Vector3) -> f64 {
        (*self - *other).norm()
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Linear interpolation: `self + (other - self) * t`
    pub fn lerp(&self, other: &Vector3, t: f64) -> Vector3 {
        Vector3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Per-axis exponential blend: `alpha * self + (1 - alpha) * previous`
    pub fn blend(&self, previous: &Vector3, alpha: f64) -> Vector3 {
        Vector3::new(
            alpha * self.x + (1.0 - alpha) * previous.x,
            alpha * self.y + (1.0 - alpha) * previous.y,
            alpha * self.z + (1.0 - alpha) * previous.z,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// One sensor tick, either raw (from the driver) or filtered (from the conditioner)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Acceleration; gravity-compensated once filtered
    pub accel: Vector3,
    /// Angular rate in deg/s
    pub gyro: Vector3,
    /// Norm of `accel`
    pub magnitude: f64,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
    /// Fused roll/pitch, present only when orientation fusion is enabled
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

impl MotionSample {
    /// Build a raw sample as delivered by the sensor driver
    pub fn raw(accel: Vector3, gyro: Vector3, timestamp_ms: u64) -> Self {
        Self {
            accel,
            gyro,
            magnitude: accel.norm(),
            timestamp_ms,
            orientation: None,
        }
    }

    /// Point recorded into a shot trajectory for this sample
    ///
    /// With fused orientation the acceleration is rotated into the level
    /// frame so that wrist tilt does not masquerade as a path change.
    pub fn trajectory_point(&self) -> Vector3 {
        match self.orientation {
            Some(orientation) => orientation.level(&self.accel),
            None => self.accel,
        }
    }
}
