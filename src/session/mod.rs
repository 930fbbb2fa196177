// Session module - owned pipeline state for one wearer
//
// TrainingSession runs everything that happens on the sampling timeline:
// 1. SignalConditioner filters the raw sample
// 2. ShotSegmenter cuts shots out of the filtered stream
// 3. Depending on the mode, a shot feeds the calibration run, is scored
//    and turned into haptic commands, or is discarded
//
// Calibration collects into a fresh profile beside the active one. The
// active baseline is only replaced once the new run completes, so a
// cancelled recalibration keeps the wearer calibrated.
//
// The session never blocks and holds no global state; the threaded engine
// owns it on the sampling thread.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::{FormAssessment, FormScorer, Shot, ShotSegmenter};
use crate::calibration::{CalibrationProfile, CalibrationProgress, CalibrationRecord};
use crate::config::AppConfig;
use crate::error::{
    log_calibration_error, log_scoring_error, log_signal_error, ErrorCode, ScoringError,
};
use crate::haptic::{feedback, HapticCommand};
use crate::motion::{MotionSample, SignalConditioner};
use crate::telemetry::{MetricEvent, TelemetryCollector};

pub mod mode;
pub mod stats;

pub use mode::{transition, ModeCommand, ModeEvent, SessionMode};
pub use stats::{SessionStats, StatsSummary};

/// Observable outcome of feeding a sample or command to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ModeChanged {
        from: SessionMode,
        to: SessionMode,
    },
    /// Training requested or attempted without a valid baseline
    NotCalibrated,
    CalibrationShotAccepted {
        progress: CalibrationProgress,
    },
    CalibrationShotRejected {
        code: i32,
        reason: String,
    },
    CalibrationComplete {
        record: CalibrationRecord,
    },
    /// Make/miss attached to the latest scored shot
    OutcomeRecorded {
        made: bool,
        accuracy_rate: f64,
    },
    ShotScored {
        shot: Shot,
        assessment: FormAssessment,
    },
    /// Shot detected outside Calibrating/Training, or unscorable
    ShotDiscarded {
        mode: SessionMode,
        start_ms: u64,
    },
    Haptic {
        command: HapticCommand,
    },
    /// Emitted on entering Review
    Summary {
        stats: StatsSummary,
    },
}

/// Complete sampling-context state for one training session
#[derive(Debug)]
pub struct TrainingSession {
    config: AppConfig,
    mode: SessionMode,
    conditioner: SignalConditioner,
    segmenter: ShotSegmenter,
    profile: CalibrationProfile,
    /// Run in progress while Calibrating
    calibration: Option<CalibrationProfile>,
    scorer: FormScorer,
    stats: SessionStats,
    telemetry: Arc<TelemetryCollector>,
    /// Timestamp of the latest sample seen
    now_ms: u64,
}

impl TrainingSession {
    /// Fresh session with an empty calibration profile
    pub fn new(config: AppConfig) -> Self {
        let profile = CalibrationProfile::new(config.calibration.clone());
        Self::with_profile(config, profile)
    }

    /// Session resuming from a previously restored profile
    pub fn with_profile(config: AppConfig, profile: CalibrationProfile) -> Self {
        Self {
            conditioner: SignalConditioner::new(config.signal.clone()),
            segmenter: ShotSegmenter::new(config.segmentation.clone()),
            scorer: FormScorer::new(config.scoring.clone()),
            profile,
            calibration: None,
            mode: SessionMode::Standby,
            stats: SessionStats::new(),
            telemetry: Arc::new(TelemetryCollector::default()),
            now_ms: 0,
            config,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Active profile used for scoring
    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Progress of the calibration run in progress, if any
    pub fn calibration_progress(&self) -> Option<CalibrationProgress> {
        self.calibration.as_ref().map(CalibrationProfile::progress)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Shared handle for publishers outside the sampling thread (motor faults)
    pub fn telemetry_handle(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.telemetry)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Apply a mode request
    pub fn apply_command(&mut self, command: ModeCommand) -> Vec<SessionEvent> {
        let (next, mode_events) = transition(self.mode, command, self.profile.is_valid());
        let mut events = Vec::new();

        for event in mode_events {
            match event {
                ModeEvent::Changed { from, to } => {
                    self.enter_mode(from, to, &mut events);
                }
                ModeEvent::NotCalibrated => {
                    log::warn!("[TrainingSession] Training requested before calibration");
                    events.push(SessionEvent::NotCalibrated);
                }
                ModeEvent::Ignored { mode, command } => {
                    log::debug!("[TrainingSession] {:?} ignored in {:?}", command, mode);
                }
            }
        }
        self.mode = next;
        events
    }

    fn enter_mode(&mut self, from: SessionMode, to: SessionMode, events: &mut Vec<SessionEvent>) {
        log::info!("[TrainingSession] Mode {:?} -> {:?}", from, to);
        self.mode = to;
        // A capture in flight belongs to the mode being left
        self.segmenter.reset();

        if to == SessionMode::Calibrating {
            self.calibration = Some(CalibrationProfile::new(self.config.calibration.clone()));
        } else if from == SessionMode::Calibrating {
            if let Some(run) = self.calibration.take() {
                log::info!(
                    "[TrainingSession] Calibration run left with {} shots, active baseline kept",
                    run.accepted_count()
                );
            }
        }

        self.telemetry.publish(MetricEvent::ModeChanged { from, to });
        events.push(SessionEvent::ModeChanged { from, to });
        if to == SessionMode::Review {
            events.push(SessionEvent::Summary {
                stats: self.stats.summary(),
            });
        }
    }

    /// Run one raw sample through the pipeline
    pub fn process_sample(&mut self, raw: &MotionSample) -> Vec<SessionEvent> {
        let filtered = match self.conditioner.ingest(raw) {
            Ok(sample) => sample,
            Err(err) => {
                log_signal_error(&err, "process_sample");
                self.telemetry
                    .publish(MetricEvent::SampleDropped { code: err.code() });
                return Vec::new();
            }
        };

        self.now_ms = filtered.timestamp_ms;
        match self.segmenter.process(&filtered) {
            Some(shot) => self.handle_shot(shot, filtered.timestamp_ms),
            None => Vec::new(),
        }
    }

    fn handle_shot(&mut self, shot: Shot, now_ms: u64) -> Vec<SessionEvent> {
        self.telemetry.publish(MetricEvent::ShotSegmented {
            start_ms: shot.start_ms,
            duration_ms: shot.duration_ms,
            peak_magnitude: shot.peak_magnitude,
            dropped_points: shot.dropped_points,
        });

        match self.mode {
            SessionMode::Calibrating => self.calibrate_with(shot, now_ms),
            SessionMode::Training => self.score(shot, now_ms),
            mode @ (SessionMode::Standby | SessionMode::Review) => {
                log::debug!("[TrainingSession] Shot at {} ms discarded in {:?}", shot.start_ms, mode);
                vec![SessionEvent::ShotDiscarded {
                    mode,
                    start_ms: shot.start_ms,
                }]
            }
        }
    }

    fn calibrate_with(&mut self, shot: Shot, now_ms: u64) -> Vec<SessionEvent> {
        let config = &self.config.calibration;
        let run = self
            .calibration
            .get_or_insert_with(|| CalibrationProfile::new(config.clone()));
        let progress = match run.add_sample(&shot) {
            Ok(progress) => progress,
            Err(err) => {
                log::warn!("[TrainingSession] Calibration shot rejected: {}", err.message());
                self.telemetry.publish(MetricEvent::ShotRejected {
                    code: err.code(),
                    reason: err.message(),
                });
                return vec![SessionEvent::CalibrationShotRejected {
                    code: err.code(),
                    reason: err.message(),
                }];
            }
        };

        self.telemetry.publish(MetricEvent::CalibrationProgress {
            accepted: progress.accepted,
            required: progress.required,
        });
        let mut events = vec![
            SessionEvent::CalibrationShotAccepted { progress },
            self.haptic(feedback::calibration_ack(now_ms)),
        ];

        if progress.is_complete() {
            self.finish_calibration(now_ms, &mut events);
        }
        events
    }

    fn finish_calibration(&mut self, now_ms: u64, events: &mut Vec<SessionEvent>) {
        let Some(run) = self.calibration.as_mut() else {
            return;
        };
        if let Err(err) = run.finalize() {
            log_calibration_error(&err, "finish_calibration");
            return;
        }
        if let Some(run) = self.calibration.take() {
            self.profile = run;
        }
        // Scores against the previous baseline are not comparable
        self.stats.reset();

        events.push(SessionEvent::CalibrationComplete {
            record: self.profile.to_record(),
        });
        events.push(self.haptic(feedback::calibration_complete(now_ms)));
        self.enter_mode(SessionMode::Calibrating, SessionMode::Standby, events);
    }

    fn score(&mut self, mut shot: Shot, now_ms: u64) -> Vec<SessionEvent> {
        let assessment = match self.scorer.score(&shot, &self.profile) {
            Ok(assessment) => assessment,
            Err(ScoringError::NotCalibrated) => {
                log_scoring_error(&ScoringError::NotCalibrated, "score");
                // Baseline is gone; the only way forward is to recalibrate
                let mut events = vec![SessionEvent::NotCalibrated];
                let from = self.mode;
                self.enter_mode(from, SessionMode::Calibrating, &mut events);
                return events;
            }
            Err(err) => {
                log_scoring_error(&err, "score");
                return vec![SessionEvent::ShotDiscarded {
                    mode: self.mode,
                    start_ms: shot.start_ms,
                }];
            }
        };

        shot.form_score = Some(assessment.score);
        self.stats.record(&assessment, now_ms);
        self.telemetry.publish(MetricEvent::FormScored {
            score: assessment.score,
            fault: assessment.errors.dominant_fault,
        });
        log::info!(
            "[TrainingSession] Shot scored {:.1} ({:?})",
            assessment.score,
            assessment.errors.dominant_fault
        );

        let mut events = vec![SessionEvent::ShotScored { shot, assessment }];
        for command in feedback::commands_for(&assessment.errors, now_ms) {
            events.push(self.haptic(command));
        }
        events
    }

    /// Report whether the latest scored shot went in
    ///
    /// Only accepted in Training, once per scored shot. An accepted outcome
    /// is acknowledged with a light forearm tap.
    pub fn record_outcome(&mut self, made: bool) -> Vec<SessionEvent> {
        if self.mode != SessionMode::Training || !self.stats.record_outcome(made) {
            log::warn!(
                "[TrainingSession] Outcome ignored in {:?}: no scored shot awaiting one",
                self.mode
            );
            return Vec::new();
        }

        let accuracy_rate = self.stats.accuracy_rate();
        log::info!(
            "[TrainingSession] Shot {} (accuracy {:.0}%)",
            if made { "made" } else { "missed" },
            accuracy_rate * 100.0
        );
        self.telemetry.publish(MetricEvent::OutcomeRecorded { made });
        vec![
            SessionEvent::OutcomeRecorded {
                made,
                accuracy_rate,
            },
            self.haptic(feedback::shot_outcome_ack(self.now_ms)),
        ]
    }

    fn haptic(&self, command: HapticCommand) -> SessionEvent {
        self.telemetry.publish(MetricEvent::HapticIssued {
            pattern: command.pattern,
            priority: command.priority,
        });
        SessionEvent::Haptic { command }
    }

    /// Clear the sample pipeline (sensor reconnect); keeps profile and stats
    pub fn reset_pipeline(&mut self) {
        self.conditioner.reset();
        self.segmenter.reset();
    }
}
