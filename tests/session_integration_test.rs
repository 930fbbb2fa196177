//! End-to-end tests for the sampling pipeline
//!
//! Synthetic throws from the seeded fixtures run through a `TrainingSession`:
//! - calibration collects a baseline and persists it as a record
//! - a restored profile scores training throws against that baseline
//! - each dominant fault maps to its corrective haptic cue

use freethrow_trainer::analysis::{FormAssessment, FormFault};
use freethrow_trainer::calibration::{CalibrationProfile, CalibrationRecord};
use freethrow_trainer::config::AppConfig;
use freethrow_trainer::fixtures::{SampleRecording, ShotFixture, ThrowSpec, THROW_SPACING_MS};
use freethrow_trainer::haptic::{HapticCommand, HapticPattern, HapticTarget, Zone};
use freethrow_trainer::motion::MotionSample;
use freethrow_trainer::session::{ModeCommand, SessionEvent, SessionMode, TrainingSession};

/// Throws that only differ by sensor noise
fn steady_spec() -> ThrowSpec {
    ThrowSpec {
        peak_jitter: 0.0,
        burst_jitter_ms: 0,
        ..ThrowSpec::default()
    }
}

fn feed(session: &mut TrainingSession, samples: &[MotionSample]) -> Vec<SessionEvent> {
    samples
        .iter()
        .flat_map(|sample| session.process_sample(sample))
        .collect()
}

fn calibrate(seed: u64) -> CalibrationRecord {
    let mut session = TrainingSession::new(AppConfig::default());
    session.apply_command(ModeCommand::StartCalibration);
    let samples = ShotFixture::with_spec(seed, steady_spec()).session(10, 0);
    feed(&mut session, &samples)
        .into_iter()
        .find_map(|event| match event {
            SessionEvent::CalibrationComplete { record } => Some(record),
            _ => None,
        })
        .expect("calibration should complete after ten throws")
}

fn training_session(record: &CalibrationRecord) -> TrainingSession {
    let config = AppConfig::default();
    let profile = CalibrationProfile::from_record(record, config.calibration.clone())
        .expect("record should restore");
    let mut session = TrainingSession::with_profile(config, profile);
    session.apply_command(ModeCommand::StartTraining);
    assert_eq!(session.mode(), SessionMode::Training);
    session
}

fn score_throw(session: &mut TrainingSession, seed: u64, spec: ThrowSpec) -> (FormAssessment, Vec<HapticCommand>) {
    let samples = ShotFixture::with_spec(seed, spec).throw(100 * THROW_SPACING_MS);
    let events = feed(session, &samples);
    let assessment = events
        .iter()
        .find_map(|event| match event {
            SessionEvent::ShotScored { assessment, .. } => Some(*assessment),
            _ => None,
        })
        .expect("throw should be scored");
    let commands = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Haptic { command } => Some(*command),
            _ => None,
        })
        .collect();
    (assessment, commands)
}

#[test]
fn calibration_produces_valid_record() {
    let record = calibrate(1);
    assert!(record.is_valid);
    assert_eq!(record.accepted_count, 10);
    assert!((record.mean_peak - 40000.0).abs() < 500.0, "mean peak {}", record.mean_peak);
    assert!(record.mean_duration > 300.0 && record.mean_duration < 600.0);
    assert!(record.reference_trajectory.len() >= 2);
}

#[test]
fn record_survives_json_persistence() {
    let record = calibrate(2);
    let path = std::env::temp_dir().join(format!("freethrow_record_{}.json", std::process::id()));
    std::fs::write(&path, record.to_json().unwrap()).unwrap();
    let restored = CalibrationRecord::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(restored.accepted_count, record.accepted_count);
    assert!(restored.is_valid);
    assert!((restored.mean_peak - record.mean_peak).abs() < 1e-6);
    assert_eq!(
        restored.reference_trajectory.len(),
        record.reference_trajectory.len()
    );

    let profile =
        CalibrationProfile::from_record(&restored, AppConfig::default().calibration).unwrap();
    assert!(profile.is_valid());
}

#[test]
fn matching_throw_scores_as_good_form() {
    let record = calibrate(3);
    let mut session = training_session(&record);
    let (assessment, commands) = score_throw(&mut session, 99, steady_spec());

    assert_eq!(assessment.errors.dominant_fault, None);
    assert!(assessment.score > 80.0, "score = {}", assessment.score);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].target, HapticTarget::AllZones);
    assert_eq!(commands[0].pattern, HapticPattern::DoublePulse);
}

#[test]
fn weak_throw_cues_upper_arm_ramp() {
    let record = calibrate(4);
    let mut session = training_session(&record);
    let spec = ThrowSpec {
        peak: 25000.0,
        ..steady_spec()
    };
    let (assessment, commands) = score_throw(&mut session, 5, spec);

    assert_eq!(assessment.errors.dominant_fault, Some(FormFault::Acceleration));
    assert!(assessment.errors.acceleration < 0.0);
    assert_eq!(assessment.score, 0.0);
    assert_eq!(commands[0].target, HapticTarget::Single(Zone::UpperArm));
    assert_eq!(commands[0].pattern, HapticPattern::Increasing);
}

#[test]
fn slow_throw_cues_forearm_triple_pulse() {
    let record = calibrate(6);
    let mut session = training_session(&record);
    let spec = ThrowSpec {
        burst_ms: 800,
        ..steady_spec()
    };
    let (assessment, commands) = score_throw(&mut session, 7, spec);

    assert_eq!(assessment.errors.dominant_fault, Some(FormFault::Duration));
    assert!(assessment.errors.duration > 0.0);
    assert_eq!(commands[0].target, HapticTarget::Single(Zone::LowerArm));
    assert_eq!(commands[0].pattern, HapticPattern::TriplePulse);
}

#[test]
fn reversed_throw_flags_trajectory() {
    let record = calibrate(8);
    let mut session = training_session(&record);
    // Same magnitude and timing, opposite direction
    let spec = ThrowSpec {
        peak: -40000.0,
        ..steady_spec()
    };
    let (assessment, commands) = score_throw(&mut session, 9, spec);

    assert_eq!(assessment.errors.dominant_fault, Some(FormFault::Trajectory));
    assert!(assessment.errors.trajectory > 1.0);
    assert_eq!(
        commands[0].target,
        HapticTarget::Alternating(Zone::LowerArm, Zone::Wrist)
    );
}

#[test]
fn stats_accumulate_over_training_and_review() {
    let record = calibrate(10);
    let mut session = training_session(&record);
    let mut fixture = ShotFixture::with_spec(11, steady_spec());
    for i in 0..6 {
        feed(&mut session, &fixture.throw(50_000 + i * THROW_SPACING_MS));
    }

    let events = session.apply_command(ModeCommand::Cycle);
    assert_eq!(session.mode(), SessionMode::Review);
    let summary = events
        .iter()
        .find_map(|event| match event {
            SessionEvent::Summary { stats } => Some(*stats),
            _ => None,
        })
        .expect("review should emit a summary");
    assert_eq!(summary.total_shots, 6);
    assert!(summary.best_score >= summary.average_score);
    assert_eq!(summary.good_form_rate, 1.0);

    // Shots in review are not scored
    let events = feed(&mut session, &fixture.throw(80_000));
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::ShotDiscarded { mode: SessionMode::Review, .. })));
    assert_eq!(session.stats().total_shots(), 6);
}

#[test]
fn training_requires_calibration() {
    let mut session = TrainingSession::new(AppConfig::default());
    let events = session.apply_command(ModeCommand::StartTraining);
    assert_eq!(events, vec![SessionEvent::NotCalibrated]);
    assert_eq!(session.mode(), SessionMode::Standby);
}

#[test]
fn recorded_stream_replays_like_live_samples() {
    let samples = ShotFixture::with_spec(12, steady_spec()).session(10, 0);
    let path = std::env::temp_dir().join(format!("freethrow_samples_{}.json", std::process::id()));
    SampleRecording::from_samples(Some("ten throws".into()), &samples)
        .save(&path)
        .unwrap();
    let replayed = SampleRecording::load(&path).unwrap().to_samples();
    let _ = std::fs::remove_file(&path);

    let mut session = TrainingSession::new(AppConfig::default());
    session.apply_command(ModeCommand::StartCalibration);
    let events = feed(&mut session, &replayed);
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::CalibrationComplete { .. })));
    assert_eq!(session.mode(), SessionMode::Standby);
    assert!(session.profile().is_valid());
}
