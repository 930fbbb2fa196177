// Trajectory capture and comparison
//
// TrajectoryRecorder buffers the path of a single shot with a fixed capacity.
// Similarity resamples two paths to a common resolution and averages the
// point-to-point Euclidean distance, so shots of different lengths compare.

use std::collections::VecDeque;

use crate::error::TrajectoryError;
use crate::motion::Vector3;

/// Bounded ring buffer of timestamped trajectory points for one shot
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRecorder {
    points: VecDeque<(u64, Vector3)>,
    capacity: usize,
    dropped: usize,
}

impl TrajectoryRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a point, evicting the oldest one when full
    pub fn record(&mut self, timestamp_ms: u64, point: Vector3) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
            self.dropped += 1;
            if self.dropped == 1 {
                log::warn!(
                    "[TrajectoryRecorder] Capacity {} reached; dropping oldest points",
                    self.capacity
                );
            }
        }
        self.points.push_back((timestamp_ms, point));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points evicted by overflow so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consume the recorder
    ///
    /// # Returns
    /// (ordered points, number of points dropped by overflow)
    pub fn finish(self) -> (Vec<Vector3>, usize) {
        let points = self.points.into_iter().map(|(_, point)| point).collect();
        (points, self.dropped)
    }
}

/// Resample a path to `n` evenly spaced points by linear interpolation
///
/// Output index `j` maps to source position `j / (n - 1) * (len - 1)`.
pub fn resample(points: &[Vector3], n: usize) -> Result<Vec<Vector3>, TrajectoryError> {
    if points.len() < 2 {
        return Err(TrajectoryError::InvalidTrajectory {
            points: points.len(),
        });
    }
    if n < 2 {
        return Err(TrajectoryError::InvalidResolution { points: n });
    }

    let last = (points.len() - 1) as f64;
    let resampled = (0..n)
        .map(|j| {
            let position = j as f64 / (n - 1) as f64 * last;
            let lower = (position.floor() as usize).min(points.len() - 2);
            let t = position - lower as f64;
            points[lower].lerp(&points[lower + 1], t)
        })
        .collect();
    Ok(resampled)
}

/// Mean point-wise distance between two paths after resampling both to `n` points
///
/// Zero for identical paths and symmetric in its arguments.
pub fn similarity(a: &[Vector3], b: &[Vector3], n: usize) -> Result<f64, TrajectoryError> {
    let a = resample(a, n)?;
    let b = resample(b, n)?;
    let total: f64 = a.iter().zip(b.iter()).map(|(p, q)| p.distance(q)).sum();
    Ok(total / n as f64)
}
