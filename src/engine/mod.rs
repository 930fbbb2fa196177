//! Engine module housing the threaded runtime.
//!
//! `Engine` wires a `TrainingSession` and a `HapticDispatcher` onto two
//! worker threads connected by lock-free ring buffers (`core`), with the
//! dispatch timeline driven by an injectable `Clock` (`clock`).

pub mod clock;
pub mod core;

pub use clock::{Clock, ManualClock, SystemClock};
pub use core::{Engine, HapticControl, SampleFeed};
