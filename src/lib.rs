// Free-Throw Trainer Core - IMU shot analysis and haptic feedback
// Real-time motion processing with a lock-free sampling pipeline

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod haptic;
pub mod motion;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{FormAssessment, FormScorer, Shot, ShotSegmenter};
pub use calibration::{CalibrationProfile, CalibrationRecord};
pub use config::AppConfig;
pub use engine::{Engine, SampleFeed};
pub use haptic::{HapticCommand, HapticDispatcher, MotorDriver, Zone};
pub use motion::{MotionSample, SignalConditioner, Vector3};
pub use session::{ModeCommand, SessionEvent, SessionMode, TrainingSession};
