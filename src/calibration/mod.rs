// Calibration module - per-user baseline collection and storage
//
// This module provides three components:
// 1. CalibrationProfile: accumulates accepted shots and computes the baseline
// 2. CalibrationProgress: accepted/required counts for status reporting
// 3. CalibrationRecord: serializable snapshot for the persistence collaborator
//
// The calibration workflow:
// 1. Create CalibrationProfile from CalibrationConfig
// 2. Feed segmented shots through add_sample until progress is complete
// 3. Finalize to compute mean/stddev and the medoid reference trajectory

pub mod profile;
pub mod progress;
pub mod record;

pub use profile::{Baseline, CalibrationProfile};
pub use progress::CalibrationProgress;
pub use record::CalibrationRecord;
