// Engine core - threaded sampling and haptic runtime
//
// Two worker threads, connected by lock-free SPSC ring buffers:
//
//   SampleFeed --rtrb--> [SamplingThread] --rtrb--> [DispatchThread] --> MotorDriver
//                         TrainingSession            HapticDispatcher
//                              |
//                              +--broadcast--> SessionEvent subscribers
//
// The sampling thread owns the TrainingSession and never blocks; mode
// commands and shot outcomes reach it over an unbounded tokio channel drained
// between samples. The dispatch thread ticks the HapticDispatcher from the
// injected Clock every `tick_interval_ms` and writes intensities to the
// driver. Haptic control (fault clearing, master switch) arrives on its own
// channel, drained before queued commands on every tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError, Producer, PushError, RingBuffer};
use tokio::sync::{broadcast, mpsc};

use super::clock::{Clock, SystemClock};
use crate::calibration::CalibrationProfile;
use crate::config::AppConfig;
use crate::error::log_haptic_error;
use crate::haptic::{HapticCommand, HapticDispatcher, MotorDriver, Zone};
use crate::motion::MotionSample;
use crate::session::{ModeCommand, SessionEvent, TrainingSession};
use crate::telemetry::{MetricEvent, TelemetryCollector};

/// Raw samples buffered between the sensor reader and the sampling thread
pub const SAMPLE_QUEUE_CAPACITY: usize = 1024;
/// Haptic commands buffered between the sampling and dispatch threads
pub const COMMAND_QUEUE_CAPACITY: usize = 64;
/// Session events retained per lagging subscriber
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Runtime requests for the dispatch thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticControl {
    /// Accept commands for a zone again after a motor fault
    ClearFault(Zone),
    /// Master haptic switch
    SetEnabled(bool),
}

#[derive(Debug, Clone, Copy)]
enum SessionRequest {
    Mode(ModeCommand),
    Outcome { made: bool },
}

/// Producer half handed to the sensor reader
pub struct SampleFeed {
    producer: Producer<MotionSample>,
    capacity: usize,
}

impl SampleFeed {
    /// Queue one raw sample for the sampling thread
    ///
    /// # Errors
    /// Returns the sample back when the queue is full
    pub fn push(&mut self, sample: MotionSample) -> Result<(), MotionSample> {
        self.producer.push(sample).map_err(|PushError::Full(sample)| sample)
    }

    /// Free slots left in the queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    /// True once the sampling thread has popped every queued sample
    pub fn is_drained(&self) -> bool {
        self.producer.slots() == self.capacity
    }
}

/// Handle to the running worker threads
///
/// Dropping the engine stops both threads; call `stop` to get the session back.
pub struct Engine {
    sampling_running: Arc<AtomicBool>,
    dispatch_running: Arc<AtomicBool>,
    request_tx: mpsc::UnboundedSender<SessionRequest>,
    control_tx: mpsc::UnboundedSender<HapticControl>,
    event_tx: broadcast::Sender<SessionEvent>,
    telemetry: Arc<TelemetryCollector>,
    sampling_handle: Option<JoinHandle<TrainingSession>>,
    dispatch_handle: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start the runtime on the wall clock
    pub fn start<D>(config: AppConfig, profile: CalibrationProfile, driver: D) -> (Self, SampleFeed)
    where
        D: MotorDriver + 'static,
    {
        Self::start_with_clock(config, profile, driver, Arc::new(SystemClock::new()))
    }

    /// Start the runtime with an explicit dispatch clock
    pub fn start_with_clock<D>(
        config: AppConfig,
        profile: CalibrationProfile,
        driver: D,
        clock: Arc<dyn Clock>,
    ) -> (Self, SampleFeed)
    where
        D: MotorDriver + 'static,
    {
        let (sample_producer, sample_consumer) = RingBuffer::new(SAMPLE_QUEUE_CAPACITY);
        let (command_producer, command_consumer) = RingBuffer::new(COMMAND_QUEUE_CAPACITY);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let tick = Duration::from_millis(config.haptic.tick_interval_ms.max(1));
        let dispatcher = HapticDispatcher::new(config.haptic.clone());
        let session = TrainingSession::with_profile(config, profile);
        let telemetry = session.telemetry_handle();

        let sampling_running = Arc::new(AtomicBool::new(true));
        let dispatch_running = Arc::new(AtomicBool::new(true));

        let sampling = SamplingWorker {
            session,
            samples: sample_consumer,
            commands: command_producer,
            requests: request_rx,
            events: event_tx.clone(),
            running: Arc::clone(&sampling_running),
        };
        let dispatch = DispatchWorker {
            dispatcher,
            driver,
            commands: command_consumer,
            controls: control_rx,
            clock,
            telemetry: Arc::clone(&telemetry),
            running: Arc::clone(&dispatch_running),
            tick,
        };

        let sampling_handle = thread::spawn(move || sampling.run());
        let dispatch_handle = thread::spawn(move || dispatch.run());
        log::info!("[Engine] Sampling and dispatch threads started");

        let engine = Self {
            sampling_running,
            dispatch_running,
            request_tx,
            control_tx,
            event_tx,
            telemetry,
            sampling_handle: Some(sampling_handle),
            dispatch_handle: Some(dispatch_handle),
        };
        (
            engine,
            SampleFeed {
                producer: sample_producer,
                capacity: SAMPLE_QUEUE_CAPACITY,
            },
        )
    }

    /// Forward a mode request to the sampling thread
    ///
    /// # Errors
    /// Returns the command back if the sampling thread has exited
    pub fn send_command(&self, command: ModeCommand) -> Result<(), ModeCommand> {
        self.request(SessionRequest::Mode(command)).map_err(|_| command)
    }

    /// Report whether the latest scored shot went in
    ///
    /// # Errors
    /// Returns `made` back if the sampling thread has exited
    pub fn record_outcome(&self, made: bool) -> Result<(), bool> {
        self.request(SessionRequest::Outcome { made }).map_err(|_| made)
    }

    fn request(&self, request: SessionRequest) -> Result<(), SessionRequest> {
        self.request_tx.send(request).map_err(|err| {
            log::warn!("[Engine] Sampling thread gone, dropping {:?}", err.0);
            err.0
        })
    }

    /// Re-enable a zone after its motor fault has been dealt with
    ///
    /// # Errors
    /// Returns the request back if the dispatch thread has exited
    pub fn clear_fault(&self, zone: Zone) -> Result<(), HapticControl> {
        self.control(HapticControl::ClearFault(zone))
    }

    /// Turn every motor on or off without stopping the engine
    ///
    /// # Errors
    /// Returns the request back if the dispatch thread has exited
    pub fn set_haptics_enabled(&self, enabled: bool) -> Result<(), HapticControl> {
        self.control(HapticControl::SetEnabled(enabled))
    }

    fn control(&self, control: HapticControl) -> Result<(), HapticControl> {
        self.control_tx.send(control).map_err(|err| {
            log::warn!("[Engine] Dispatch thread gone, dropping {:?}", err.0);
            err.0
        })
    }

    /// Receive every session event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn is_running(&self) -> bool {
        self.sampling_running.load(Ordering::SeqCst)
    }

    /// Drain queued samples, stop both threads and return the session
    ///
    /// Returns `None` if the sampling thread panicked.
    pub fn stop(mut self) -> Option<TrainingSession> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<TrainingSession> {
        self.sampling_running.store(false, Ordering::SeqCst);
        let session = self.sampling_handle.take().and_then(|handle| match handle.join() {
            Ok(session) => Some(session),
            Err(_) => {
                log::error!("[Engine] Sampling thread panicked");
                None
            }
        });

        // Sampling has pushed its last command; let dispatch drain and silence
        self.dispatch_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.dispatch_handle.take() {
            if handle.join().is_err() {
                log::error!("[Engine] Dispatch thread panicked");
            }
        }
        session
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.sampling_handle.is_some() || self.dispatch_handle.is_some() {
            self.shutdown();
        }
    }
}

struct SamplingWorker {
    session: TrainingSession,
    samples: Consumer<MotionSample>,
    commands: Producer<HapticCommand>,
    requests: mpsc::UnboundedReceiver<SessionRequest>,
    events: broadcast::Sender<SessionEvent>,
    running: Arc<AtomicBool>,
}

impl SamplingWorker {
    fn run(mut self) -> TrainingSession {
        tracing::info!("[SamplingThread] Starting sampling loop");
        let mut processed: u64 = 0;

        loop {
            self.drain_commands();

            let sample = match self.samples.pop() {
                Ok(sample) => sample,
                Err(PopError::Empty) => {
                    // Shutdown only once the queue is drained
                    if !self.running.load(Ordering::SeqCst) {
                        // Everything sent before the flag flipped is visible now
                        self.drain_commands();
                        if !self.samples.is_empty() {
                            continue;
                        }
                        tracing::info!(
                            "[SamplingThread] Shutdown requested and queue empty, exiting after {} samples",
                            processed
                        );
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            processed += 1;
            let events = self.session.process_sample(&sample);
            self.publish(events);
        }
        self.session
    }

    fn drain_commands(&mut self) {
        while let Ok(request) = self.requests.try_recv() {
            let events = match request {
                SessionRequest::Mode(command) => self.session.apply_command(command),
                SessionRequest::Outcome { made } => self.session.record_outcome(made),
            };
            self.publish(events);
        }
    }

    fn publish(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            if let SessionEvent::Haptic { command } = &event {
                if self.commands.push(*command).is_err() {
                    tracing::warn!(
                        "[SamplingThread] Command queue full, dropping {:?}",
                        command.pattern
                    );
                }
            }
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

struct DispatchWorker<D: MotorDriver> {
    dispatcher: HapticDispatcher,
    driver: D,
    commands: Consumer<HapticCommand>,
    controls: mpsc::UnboundedReceiver<HapticControl>,
    clock: Arc<dyn Clock>,
    telemetry: Arc<TelemetryCollector>,
    running: Arc<AtomicBool>,
    tick: Duration,
}

impl<D: MotorDriver> DispatchWorker<D> {
    fn run(mut self) {
        tracing::info!("[DispatchThread] Starting dispatch loop ({:?} tick)", self.tick);

        loop {
            while let Ok(control) = self.controls.try_recv() {
                self.apply_control(control);
            }

            let now_ms = self.clock.now_ms();
            while let Ok(command) = self.commands.pop() {
                if let Err(err) = self.dispatcher.submit(command, now_ms) {
                    log_haptic_error(&err, "dispatch_thread");
                }
            }

            let faulted_before = Zone::ALL.map(|zone| self.dispatcher.is_faulted(zone));
            self.dispatcher.drive(now_ms, &mut self.driver);
            for zone in Zone::ALL {
                if !faulted_before[zone.index()] && self.dispatcher.is_faulted(zone) {
                    tracing::warn!("[DispatchThread] Motor fault on {:?}", zone);
                    self.telemetry.publish(MetricEvent::MotorFault { zone });
                }
            }

            if !self.running.load(Ordering::SeqCst) && self.commands.is_empty() {
                break;
            }
            thread::sleep(self.tick);
        }

        self.dispatcher.stop_all();
        self.driver.stop_all();
        tracing::info!("[DispatchThread] Motors stopped, exiting");
    }

    fn apply_control(&mut self, control: HapticControl) {
        match control {
            HapticControl::ClearFault(zone) => {
                if !self.dispatcher.is_faulted(zone) {
                    tracing::debug!("[DispatchThread] {:?} not faulted, nothing to clear", zone);
                    return;
                }
                self.dispatcher.clear_fault(zone);
                self.telemetry.publish(MetricEvent::MotorFaultCleared { zone });
            }
            HapticControl::SetEnabled(enabled) => {
                if self.dispatcher.is_enabled() == enabled {
                    return;
                }
                self.dispatcher.set_enabled(enabled);
                tracing::info!(
                    "[DispatchThread] Haptics {}",
                    if enabled { "enabled" } else { "disabled" }
                );
                self.telemetry.publish(MetricEvent::HapticsToggled { enabled });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ManualClock;
    use crate::haptic::RecordingDriver;
    use crate::motion::Vector3;

    fn rest(timestamp_ms: u64) -> MotionSample {
        MotionSample::raw(Vector3::new(0.0, 0.0, 16384.0), Vector3::zero(), timestamp_ms)
    }

    #[test]
    fn test_stop_returns_session_with_applied_commands() {
        let (engine, mut feed) = Engine::start_with_clock(
            AppConfig::default(),
            CalibrationProfile::default(),
            RecordingDriver::new(),
            Arc::new(ManualClock::new(0)),
        );
        engine.send_command(ModeCommand::StartCalibration).unwrap();
        for i in 0..20 {
            feed.push(rest(i * 10)).unwrap();
        }

        let session = engine.stop().unwrap();
        assert_eq!(session.mode(), crate::session::SessionMode::Calibrating);
    }

    #[test]
    fn test_subscribers_see_mode_changes() {
        let (engine, _feed) = Engine::start_with_clock(
            AppConfig::default(),
            CalibrationProfile::default(),
            RecordingDriver::new(),
            Arc::new(ManualClock::new(0)),
        );
        let mut events = engine.subscribe();
        engine.send_command(ModeCommand::StartTraining).unwrap();
        engine.stop();

        assert_eq!(events.try_recv().unwrap(), SessionEvent::NotCalibrated);
    }

    #[test]
    fn test_outcome_without_scored_shot_is_ignored() {
        let (engine, _feed) = Engine::start_with_clock(
            AppConfig::default(),
            CalibrationProfile::default(),
            RecordingDriver::new(),
            Arc::new(ManualClock::new(0)),
        );
        // No scored shot yet, so the session ignores it
        engine.record_outcome(true).unwrap();
        let session = engine.stop().unwrap();
        assert_eq!(session.stats().summary().outcomes_recorded, 0);
    }

    #[test]
    fn test_haptic_controls_are_applied_on_dispatch_thread() {
        let (engine, _feed) = Engine::start_with_clock(
            AppConfig::default(),
            CalibrationProfile::default(),
            RecordingDriver::new(),
            Arc::new(ManualClock::new(0)),
        );
        engine.set_haptics_enabled(false).unwrap();
        // Unfaulted zone: nothing to clear, nothing published
        engine.clear_fault(Zone::Wrist).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let toggled = |engine: &Engine| {
            engine
                .telemetry()
                .snapshot()
                .recent
                .contains(&MetricEvent::HapticsToggled { enabled: false })
        };
        while !toggled(&engine) && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(toggled(&engine));
        assert!(!engine
            .telemetry()
            .snapshot()
            .recent
            .iter()
            .any(|e| matches!(e, MetricEvent::MotorFaultCleared { .. })));
        engine.stop();
    }

    #[test]
    fn test_full_feed_hands_sample_back() {
        let (producer, _consumer) = RingBuffer::new(1);
        let mut feed = SampleFeed {
            producer,
            capacity: 1,
        };
        assert!(feed.is_drained());
        feed.push(rest(0)).unwrap();
        assert_eq!(feed.push(rest(10)), Err(rest(10)));
        assert_eq!(feed.slots(), 0);
        assert!(!feed.is_drained());
    }
}
