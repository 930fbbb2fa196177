// ShotSegmenter - turns filtered samples into discrete Shot events
//
// Idle --(>= motion)--> Armed --(>= shot, within timeout)--> Capturing
//   ^                     |                                     |
//   |                  timeout                     quiet for debounce, or cutoff
//   |                     v                                     v
//   +------------------ Idle <------- cooldown elapsed ------ Cooldown
//
// The transition itself is a pure function; ShotSegmenter owns the state.

use super::trajectory::TrajectoryRecorder;
use super::{Shot, ShotTermination};
use crate::config::SegmentationConfig;
use crate::motion::{MotionSample, Vector3};

/// Segmentation state machine
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SegmenterState {
    #[default]
    Idle,
    Armed {
        since_ms: u64,
    },
    Capturing {
        start_ms: u64,
        peak: f64,
        recorder: TrajectoryRecorder,
        /// Below-threshold samples not yet committed to the recorder
        quiet: Vec<(u64, Vector3)>,
    },
    Cooldown {
        since_ms: u64,
    },
}

impl SegmenterState {
    pub fn name(&self) -> &'static str {
        match self {
            SegmenterState::Idle => "idle",
            SegmenterState::Armed { .. } => "armed",
            SegmenterState::Capturing { .. } => "capturing",
            SegmenterState::Cooldown { .. } => "cooldown",
        }
    }
}

fn begin_capture(sample: &MotionSample, config: &SegmentationConfig) -> SegmenterState {
    let mut recorder = TrajectoryRecorder::new(config.trajectory_capacity);
    recorder.record(sample.timestamp_ms, sample.trajectory_point());
    SegmenterState::Capturing {
        start_ms: sample.timestamp_ms,
        peak: sample.magnitude,
        recorder,
        quiet: Vec::new(),
    }
}

/// Advance the state machine by one filtered sample
///
/// # Returns
/// The next state, plus a Shot when a capture completes on this sample
pub fn step(
    state: SegmenterState,
    sample: &MotionSample,
    config: &SegmentationConfig,
) -> (SegmenterState, Option<Shot>) {
    let now = sample.timestamp_ms;
    let magnitude = sample.magnitude;

    match state {
        SegmenterState::Idle => {
            if magnitude >= config.shot_threshold {
                (begin_capture(sample, config), None)
            } else if magnitude >= config.motion_threshold {
                (SegmenterState::Armed { since_ms: now }, None)
            } else {
                (SegmenterState::Idle, None)
            }
        }
        SegmenterState::Armed { since_ms } => {
            let elapsed = now.saturating_sub(since_ms);
            if elapsed > config.motion_timeout_ms {
                log::debug!(
                    "[ShotSegmenter] Armed for {} ms without reaching shot threshold; disarming",
                    elapsed
                );
                (SegmenterState::Idle, None)
            } else if magnitude >= config.shot_threshold {
                (begin_capture(sample, config), None)
            } else {
                (SegmenterState::Armed { since_ms }, None)
            }
        }
        SegmenterState::Capturing {
            start_ms,
            peak,
            mut recorder,
            mut quiet,
        } => {
            let peak = peak.max(magnitude);
            let point = (now, sample.trajectory_point());
            if magnitude < config.motion_threshold {
                quiet.push(point);
            } else {
                // Motion resumed: the quiet stretch was a dip inside the shot
                for (ts, p) in quiet.drain(..) {
                    recorder.record(ts, p);
                }
                recorder.record(point.0, point.1);
            }

            let ending = match quiet.first().copied() {
                Some((quiet_since, first_quiet))
                    if now - quiet_since >= config.capture_debounce_ms =>
                {
                    // Shot ends at the first quiet sample; the rest of the stretch is discarded
                    recorder.record(quiet_since, first_quiet);
                    Some((quiet_since, ShotTermination::Settled))
                }
                _ if now - start_ms >= config.max_shot_duration_ms => {
                    for (ts, p) in quiet.drain(..) {
                        recorder.record(ts, p);
                    }
                    Some((now, ShotTermination::CutOff))
                }
                _ => None,
            };

            match ending {
                Some((end_ms, termination)) => {
                    let (trajectory, dropped_points) = recorder.finish();
                    let shot = Shot {
                        start_ms,
                        end_ms,
                        duration_ms: end_ms - start_ms,
                        peak_magnitude: peak,
                        trajectory,
                        dropped_points,
                        termination,
                        form_score: None,
                    };
                    log::debug!(
                        "[ShotSegmenter] Shot {}..{} ms, peak {:.0}, {} points ({:?})",
                        shot.start_ms,
                        shot.end_ms,
                        shot.peak_magnitude,
                        shot.trajectory.len(),
                        shot.termination
                    );
                    (SegmenterState::Cooldown { since_ms: now }, Some(shot))
                }
                None => (
                    SegmenterState::Capturing {
                        start_ms,
                        peak,
                        recorder,
                        quiet,
                    },
                    None,
                ),
            }
        }
        SegmenterState::Cooldown { since_ms } => {
            if now.saturating_sub(since_ms) >= config.cooldown_ms {
                step(SegmenterState::Idle, sample, config)
            } else {
                (SegmenterState::Cooldown { since_ms }, None)
            }
        }
    }
}

/// Owned wrapper around [`step`]
#[derive(Debug, Clone)]
pub struct ShotSegmenter {
    config: SegmentationConfig,
    state: SegmenterState,
}

impl ShotSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            state: SegmenterState::Idle,
        }
    }

    /// Feed one filtered sample; returns a Shot when one completes
    pub fn process(&mut self, sample: &MotionSample) -> Option<Shot> {
        let state = std::mem::take(&mut self.state);
        let (next, shot) = step(state, sample, &self.config);
        self.state = next;
        shot
    }

    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    /// Abandon any capture in progress and return to Idle
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
    }
}
