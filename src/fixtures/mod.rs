//! Fixture utilities for the deterministic CLI harness.
//!
//! This module synthesizes raw IMU streams for calibration and training
//! runs from a seeded RNG, and loads/saves recorded sample streams as JSON.
//! Everything here produces *raw* samples: the stream still has to pass
//! through the signal conditioner like live sensor data.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::motion::{MotionSample, Vector3};

/// Sensor counts for one g on the ±2 g range
pub const GRAVITY_COUNTS: f64 = 16384.0;
/// 100 Hz sampling
pub const SAMPLE_INTERVAL_MS: u64 = 10;
/// Time slot taken by one synthesized throw, rest included
pub const THROW_SPACING_MS: u64 = 2000;
/// Rest before the burst inside a throw slot
const LEAD_IN_MS: u64 = 100;

/// Shape of a synthesized throw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowSpec {
    /// Forward (x) acceleration during the burst, in counts
    pub peak: f64,
    /// Length of the burst
    pub burst_ms: u64,
    /// Uniform per-throw variation of `peak`
    pub peak_jitter: f64,
    /// Uniform per-throw variation of `burst_ms`
    pub burst_jitter_ms: u64,
    /// Half-sine sideways (y) swing amplitude during the burst
    pub lateral: f64,
    /// Uniform per-axis sensor noise
    pub noise: f64,
}

impl Default for ThrowSpec {
    fn default() -> Self {
        Self {
            peak: 40000.0,
            burst_ms: 400,
            peak_jitter: 500.0,
            burst_jitter_ms: 20,
            lateral: 0.0,
            noise: 40.0,
        }
    }
}

impl ThrowSpec {
    /// Same throw without any randomness
    pub fn exact(peak: f64, burst_ms: u64) -> Self {
        Self {
            peak,
            burst_ms,
            peak_jitter: 0.0,
            burst_jitter_ms: 0,
            lateral: 0.0,
            noise: 0.0,
        }
    }
}

/// Seeded generator of raw throw streams
#[derive(Debug, Clone)]
pub struct ShotFixture {
    rng: StdRng,
    spec: ThrowSpec,
}

impl ShotFixture {
    pub fn new(seed: u64) -> Self {
        Self::with_spec(seed, ThrowSpec::default())
    }

    pub fn with_spec(seed: u64, spec: ThrowSpec) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spec,
        }
    }

    pub fn spec(&self) -> &ThrowSpec {
        &self.spec
    }

    /// Stationary samples in `[start_ms, start_ms + duration_ms)`
    pub fn rest(&mut self, start_ms: u64, duration_ms: u64) -> Vec<MotionSample> {
        (0..duration_ms / SAMPLE_INTERVAL_MS)
            .map(|i| {
                let accel = Vector3::new(0.0, 0.0, GRAVITY_COUNTS) + self.noise();
                MotionSample::raw(accel, Vector3::zero(), start_ms + i * SAMPLE_INTERVAL_MS)
            })
            .collect()
    }

    /// One throw slot starting at `start_ms` using the fixture's throw shape
    pub fn throw(&mut self, start_ms: u64) -> Vec<MotionSample> {
        let spec = self.spec.clone();
        self.throw_with(start_ms, &spec)
    }

    /// One throw slot with an explicit shape
    ///
    /// The slot is `THROW_SPACING_MS` long: a short rest, the burst, then
    /// rest until the slot ends.
    pub fn throw_with(&mut self, start_ms: u64, spec: &ThrowSpec) -> Vec<MotionSample> {
        let peak = spec.peak + self.jitter(spec.peak_jitter);
        let burst_ms = self.burst_length(spec);
        let burst_start = start_ms + LEAD_IN_MS;

        let mut samples = self.rest(start_ms, LEAD_IN_MS);
        let steps = burst_ms / SAMPLE_INTERVAL_MS;
        for i in 0..steps {
            let phase = std::f64::consts::PI * i as f64 / steps.max(1) as f64;
            let accel = Vector3::new(peak, spec.lateral * phase.sin(), GRAVITY_COUNTS) + self.noise();
            let gyro = Vector3::new(0.0, 0.0, 200.0 * phase.sin());
            samples.push(MotionSample::raw(
                accel,
                gyro,
                burst_start + i * SAMPLE_INTERVAL_MS,
            ));
        }

        let burst_end = burst_start + steps * SAMPLE_INTERVAL_MS;
        let slot_end = start_ms + THROW_SPACING_MS;
        samples.extend(self.rest(burst_end, slot_end.saturating_sub(burst_end)));
        samples
    }

    /// `count` consecutive throw slots starting at `start_ms`
    pub fn session(&mut self, count: usize, start_ms: u64) -> Vec<MotionSample> {
        (0..count as u64)
            .flat_map(|i| self.throw(start_ms + i * THROW_SPACING_MS))
            .collect()
    }

    fn burst_length(&mut self, spec: &ThrowSpec) -> u64 {
        let jitter = spec.burst_jitter_ms as i64;
        let offset = if jitter > 0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0
        };
        let length = (spec.burst_ms as i64 + offset).max(SAMPLE_INTERVAL_MS as i64) as u64;
        // Keep the slot able to settle before the next one
        length.min(THROW_SPACING_MS - LEAD_IN_MS - 500)
    }

    fn jitter(&mut self, amount: f64) -> f64 {
        if amount > 0.0 {
            self.rng.gen_range(-amount..amount)
        } else {
            0.0
        }
    }

    fn noise(&mut self) -> Vector3 {
        let amount = self.spec.noise;
        Vector3::new(self.jitter(amount), self.jitter(amount), self.jitter(amount))
    }
}

/// One raw sample as stored in a recording file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    pub timestamp_ms: u64,
    pub accel: [f64; 3],
    #[serde(default)]
    pub gyro: [f64; 3],
}

impl From<&MotionSample> for RecordedSample {
    fn from(sample: &MotionSample) -> Self {
        Self {
            timestamp_ms: sample.timestamp_ms,
            accel: [sample.accel.x, sample.accel.y, sample.accel.z],
            gyro: [sample.gyro.x, sample.gyro.y, sample.gyro.z],
        }
    }
}

impl RecordedSample {
    pub fn to_sample(&self) -> MotionSample {
        let [ax, ay, az] = self.accel;
        let [gx, gy, gz] = self.gyro;
        MotionSample::raw(
            Vector3::new(ax, ay, az),
            Vector3::new(gx, gy, gz),
            self.timestamp_ms,
        )
    }
}

/// Raw sample stream persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRecording {
    #[serde(default)]
    pub description: Option<String>,
    pub samples: Vec<RecordedSample>,
}

impl SampleRecording {
    pub fn from_samples(description: Option<String>, samples: &[MotionSample]) -> Self {
        Self {
            description,
            samples: samples.iter().map(RecordedSample::from).collect(),
        }
    }

    pub fn to_samples(&self) -> Vec<MotionSample> {
        self.samples.iter().map(RecordedSample::to_sample).collect()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse recording {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize recording")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write recording {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let a = ShotFixture::new(7).session(2, 0);
        let b = ShotFixture::new(7).session(2, 0);
        assert_eq!(a, b);
        let c = ShotFixture::new(8).session(2, 0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_throw_fills_one_slot_with_increasing_timestamps() {
        let samples = ShotFixture::new(1).throw(5000);
        assert_eq!(samples.first().unwrap().timestamp_ms, 5000);
        assert!(samples.last().unwrap().timestamp_ms < 5000 + THROW_SPACING_MS);
        assert!(samples
            .windows(2)
            .all(|pair| pair[0].timestamp_ms < pair[1].timestamp_ms));
        assert_eq!(samples.len() as u64, THROW_SPACING_MS / SAMPLE_INTERVAL_MS);
    }

    #[test]
    fn test_exact_spec_has_no_noise() {
        let mut fixture = ShotFixture::with_spec(3, ThrowSpec::exact(30000.0, 300));
        let samples = fixture.throw(0);
        let burst: Vec<_> = samples.iter().filter(|s| s.accel.x > 0.0).collect();
        assert_eq!(burst.len(), 30);
        assert!(burst.iter().all(|s| s.accel.x == 30000.0));
        assert!(samples
            .iter()
            .filter(|s| s.accel.x == 0.0)
            .all(|s| s.accel == Vector3::new(0.0, 0.0, GRAVITY_COUNTS)));
    }

    #[test]
    fn test_recording_json_roundtrip_keeps_raw_values() {
        let samples = ShotFixture::new(11).throw(0);
        let recording = SampleRecording::from_samples(Some("one throw".into()), &samples);
        let json = serde_json::to_string(&recording).unwrap();
        let restored: SampleRecording = serde_json::from_str(&json).unwrap();
        let restored = restored.to_samples();
        assert_eq!(restored.len(), samples.len());
        for (a, b) in restored.iter().zip(&samples) {
            assert_eq!(a.timestamp_ms, b.timestamp_ms);
            assert!(a.accel.distance(&b.accel) < 1e-6);
            assert!(a.gyro.distance(&b.gyro) < 1e-6);
        }
    }

    #[test]
    fn test_recording_gyro_is_optional() {
        let json = r#"{"samples":[{"timestamp_ms":10,"accel":[0.0,0.0,16384.0]}]}"#;
        let recording: SampleRecording = serde_json::from_str(json).unwrap();
        let sample = recording.to_samples()[0];
        assert_eq!(sample.gyro, Vector3::zero());
        assert_eq!(sample.magnitude, GRAVITY_COUNTS);
        assert!(recording.description.is_none());
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = SampleRecording::load("/nonexistent/throws.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/throws.json"));
    }
}
