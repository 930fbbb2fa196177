use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use freethrow_trainer::calibration::{CalibrationProfile, CalibrationRecord};
use freethrow_trainer::config::AppConfig;
use freethrow_trainer::engine::Engine;
use freethrow_trainer::fixtures::{SampleRecording, ShotFixture, ThrowSpec};
use freethrow_trainer::haptic::{HapticDispatcher, MotorDriver, RecordingDriver};
use freethrow_trainer::motion::MotionSample;
use freethrow_trainer::session::{ModeCommand, SessionEvent, SessionMode, TrainingSession};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Parser, Debug)]
#[command(
    name = "freethrow_cli",
    about = "Deterministic replay harness for the free-throw trainer core"
)]
struct Cli {
    /// JSON config file (missing fields use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a calibration baseline and write the record as JSON
    Calibrate {
        #[command(flatten)]
        source: SampleSource,
        /// Write the record here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score shots against a saved baseline, one JSON event per line
    Train {
        /// Calibration record produced by `calibrate`
        #[arg(long)]
        profile: PathBuf,
        #[command(flatten)]
        source: SampleSource,
        /// Run through the threaded engine instead of the inline replay
        #[arg(long)]
        threaded: bool,
    },
    /// Write a synthetic sample recording
    Record {
        #[command(flatten)]
        source: SampleSource,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the effective configuration
    DumpConfig,
}

#[derive(Args, Debug)]
struct SampleSource {
    /// Replay a recorded sample stream instead of synthesizing one
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Number of synthesized throws (defaults to the calibration requirement)
    #[arg(long)]
    shots: Option<usize>,
    /// Forward acceleration of synthesized throws, in counts
    #[arg(long, default_value_t = 40000.0)]
    peak: f64,
    #[arg(long, default_value_t = 400)]
    burst_ms: u64,
    /// Sideways swing of synthesized throws, in counts
    #[arg(long, default_value_t = 0.0)]
    lateral: f64,
}

impl SampleSource {
    fn samples(&self, config: &AppConfig) -> Result<Vec<MotionSample>> {
        if let Some(path) = &self.input {
            return Ok(SampleRecording::load(path)?.to_samples());
        }
        let spec = ThrowSpec {
            peak: self.peak,
            burst_ms: self.burst_ms,
            lateral: self.lateral,
            ..ThrowSpec::default()
        };
        let shots = self
            .shots
            .unwrap_or(config.calibration.required_samples);
        Ok(ShotFixture::with_spec(self.seed, spec).session(shots, 0))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Calibrate { source, output } => run_calibrate(config, &source, output),
        Commands::Train {
            profile,
            source,
            threaded,
        } => {
            if threaded {
                run_train_threaded(config, &profile, &source)
            } else {
                run_train(config, &profile, &source)
            }
        }
        Commands::Record { source, output } => run_record(&config, &source, &output),
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn run_calibrate(
    config: AppConfig,
    source: &SampleSource,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let samples = source.samples(&config)?;
    let mut session = TrainingSession::new(config);
    session.apply_command(ModeCommand::StartCalibration);

    let mut record = None;
    for sample in &samples {
        for event in session.process_sample(sample) {
            match event {
                SessionEvent::CalibrationComplete { record: finished } => record = Some(finished),
                SessionEvent::CalibrationShotRejected { code, reason } => {
                    eprintln!("rejected shot (code {code}): {reason}");
                }
                _ => {}
            }
        }
    }

    let Some(record) = record else {
        let progress = session
            .calibration_progress()
            .unwrap_or_else(|| session.profile().progress());
        eprintln!(
            "calibration incomplete: {}/{} shots accepted",
            progress.accepted, progress.required
        );
        return Ok(ExitCode::from(2));
    };

    let json = record.to_json()?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::from(0))
}

fn load_profile(config: &AppConfig, path: &Path) -> Result<CalibrationProfile> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let record = CalibrationRecord::from_json(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    let profile = CalibrationProfile::from_record(&record, config.calibration.clone())
        .with_context(|| format!("restoring {}", path.display()))?;
    Ok(profile)
}

fn run_train(config: AppConfig, profile_path: &Path, source: &SampleSource) -> Result<ExitCode> {
    let samples = source.samples(&config)?;
    let profile = load_profile(&config, profile_path)?;
    let mut dispatcher = HapticDispatcher::new(config.haptic.clone());
    let mut driver = RecordingDriver::new();
    let mut session = TrainingSession::with_profile(config, profile);

    for event in session.apply_command(ModeCommand::StartTraining) {
        println!("{}", serde_json::to_string(&event)?);
    }
    if session.mode() != SessionMode::Training {
        return Ok(ExitCode::from(2));
    }

    for sample in &samples {
        for event in session.process_sample(sample) {
            if let SessionEvent::Haptic { command } = &event {
                if let Err(err) = dispatcher.submit(*command, sample.timestamp_ms) {
                    eprintln!("haptic command rejected: {err}");
                }
            }
            println!("{}", serde_json::to_string(&event)?);
        }
        dispatcher.drive(sample.timestamp_ms, &mut driver);
    }
    dispatcher.stop_all();
    driver.stop_all();

    for event in session.apply_command(ModeCommand::Review) {
        println!("{}", serde_json::to_string(&event)?);
    }
    emit_report(ReplayReport {
        driver_writes: driver.writes().len(),
        telemetry_events: session.telemetry().snapshot().total_events,
        shots_scored: session.stats().total_shots(),
    })?;
    Ok(ExitCode::from(0))
}

fn run_train_threaded(
    config: AppConfig,
    profile_path: &Path,
    source: &SampleSource,
) -> Result<ExitCode> {
    let samples = source.samples(&config)?;
    let profile = load_profile(&config, profile_path)?;
    let driver = RecordingDriver::new();
    let writes = driver.handle();

    let (engine, mut feed) = Engine::start(config, profile, driver);
    let mut events = engine.subscribe();
    engine
        .send_command(ModeCommand::StartTraining)
        .map_err(|command| anyhow::anyhow!("engine rejected {command:?}"))?;

    for sample in samples {
        let mut pending = sample;
        while let Err(back) = feed.push(pending) {
            pending = back;
            thread::sleep(Duration::from_millis(1));
            print_events(&mut events)?;
        }
    }
    // Mode commands jump the sample queue; let it empty first
    while !feed.is_drained() {
        thread::sleep(Duration::from_millis(1));
        print_events(&mut events)?;
    }
    if let Err(command) = engine.send_command(ModeCommand::Review) {
        eprintln!("engine stopped before {command:?}; no summary emitted");
    }
    let session = engine.stop();
    print_events(&mut events)?;

    let write_count = match writes.lock() {
        Ok(writes) => writes.len(),
        Err(poisoned) => poisoned.into_inner().len(),
    };
    emit_report(ReplayReport {
        driver_writes: write_count,
        telemetry_events: session
            .as_ref()
            .map(|s| s.telemetry().snapshot().total_events)
            .unwrap_or_default(),
        shots_scored: session
            .as_ref()
            .map(|s| s.stats().total_shots())
            .unwrap_or_default(),
    })?;
    Ok(ExitCode::from(0))
}

fn print_events(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(TryRecvError::Lagged(missed)) => eprintln!("skipped {missed} events"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(()),
        }
    }
}

fn run_record(config: &AppConfig, source: &SampleSource, output: &Path) -> Result<ExitCode> {
    let samples = source.samples(config)?;
    let description = format!(
        "{} synthetic throws, seed {}",
        source.shots.unwrap_or(config.calibration.required_samples),
        source.seed
    );
    SampleRecording::from_samples(Some(description), &samples).save(output)?;
    eprintln!("wrote {} samples to {}", samples.len(), output.display());
    Ok(ExitCode::from(0))
}

fn emit_report(report: ReplayReport) -> Result<()> {
    eprintln!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct ReplayReport {
    driver_writes: usize,
    telemetry_events: u64,
    shots_scored: usize,
}
