// Analysis module - shot detection and form evaluation
//
// This module turns the filtered sample stream into judged shots:
// 1. ShotSegmenter: state machine that cuts the stream into Shot events
// 2. TrajectoryRecorder / similarity: per-shot path buffer and path distance
// 3. FormScorer: error vector and composite score against the baseline
//
// Pipeline: MotionSample → ShotSegmenter → Shot → FormScorer → FormAssessment

use serde::{Deserialize, Serialize};

use crate::motion::Vector3;

pub mod scorer;
pub mod segmenter;
pub mod trajectory;

pub use scorer::{ErrorVector, FormAssessment, FormFault, FormScorer};
pub use segmenter::{SegmenterState, ShotSegmenter};
pub use trajectory::{resample, similarity, TrajectoryRecorder};

/// How a capture ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotTermination {
    /// Motion dropped below threshold for the debounce period
    Settled,
    /// Capture hit the maximum shot duration
    CutOff,
}

/// One detected shot motion
///
/// Consumed exactly once, either by calibration or by scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub start_ms: u64,
    pub end_ms: u64,
    /// Largest gravity-compensated magnitude seen during the capture
    pub peak_magnitude: f64,
    /// `end_ms - start_ms`, always positive
    pub duration_ms: u64,
    /// Ordered path points, oldest first
    pub trajectory: Vec<Vector3>,
    /// Points lost to trajectory buffer overflow
    pub dropped_points: usize,
    pub termination: ShotTermination,
    /// Composite score, filled in once the shot is scored
    pub form_score: Option<f64>,
}
