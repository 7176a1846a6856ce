//! CLI entry point for csv_stream_daq
//!
//! Opens a line transport, feeds it to a [`CsvStreamInstrument`] and delivers queued sample
//! sets at a fixed cadence until the stream ends or the user interrupts.
//!
//! # Usage
//!
//! Live serial source:
//! ```bash
//! csv_stream_daq --port /dev/ttyUSB0 --baud 921600
//! ```
//!
//! Replay a capture, restoring channel identities and saving them again afterwards:
//! ```bash
//! csv_stream_daq --replay capture.csv --session scope.yml --save-session scope.yml
//! ```
//!
//! Pipe from another program:
//! ```bash
//! probe-rs attach --chip STM32F4 | csv_stream_daq --stdin
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use csv_stream_daq::adapters::{LineTransport, ReaderAdapter, SerialAdapter};
use csv_stream_daq::capabilities::{TriggerControl, WaveformSource};
use csv_stream_daq::config::{CsvStreamConfig, TransportConfig, TransportKind, DEFAULT_CONFIG_PATH};
use csv_stream_daq::session::{load_session, save_session, IdTable, InstrumentSession};
use csv_stream_daq::{logging, AppResult, CsvStreamInstrument, DaqError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// How long shutdown waits for a producer stuck in a blocking read.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Back-off after a recoverable transport error.
const RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "csv_stream_daq")]
#[command(about = "Acquire multi-channel waveforms from a CSV-* line stream", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Read from this serial port
    #[arg(long, conflicts_with_all = ["replay", "stdin"])]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Replay a capture file
    #[arg(long, conflicts_with = "stdin")]
    replay: Option<PathBuf>,

    /// Read lines from standard input
    #[arg(long)]
    stdin: bool,

    /// Restore channel identities from a saved session before acquiring
    #[arg(long)]
    session: Option<PathBuf>,

    /// Save channel identities when the run ends
    #[arg(long)]
    save_session: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CsvStreamConfig) {
        if let Some(port) = &self.port {
            config.transport.kind = TransportKind::Serial;
            config.transport.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.transport.baud_rate = baud;
        }
        if let Some(path) = &self.replay {
            config.transport.kind = TransportKind::File;
            config.transport.path = Some(path.clone());
        }
        if self.stdin {
            config.transport.kind = TransportKind::Stdin;
        }
        if let Some(level) = &self.log_level {
            config.application.log_level = level.clone();
        }
    }
}

/// Why the delivery loop stopped.
enum RunEnd {
    Interrupted,
    ProducerExited(Result<AppResult<()>, JoinError>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CsvStreamConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;
    logging::init_from_config(&config).context("initialising logging")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(cli, config));

    // A producer blocked on stdin cannot be cancelled; don't wait for it forever
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(cli: Cli, config: CsvStreamConfig) -> Result<()> {
    info!(name = %config.application.name, "starting");

    let transport = open_transport(&config.transport).context("opening transport")?;
    let mut scope = CsvStreamInstrument::new(transport);

    if let Some(path) = &cli.session {
        let session = load_session(path)
            .with_context(|| format!("loading session from {}", path.display()))?;
        let mut ids = IdTable::new();
        session
            .preload(&mut scope, &mut ids)
            .context("restoring session")?;
    }

    let scope = Arc::new(scope);
    if config.acquisition.auto_start {
        scope.start();
    } else {
        info!("auto_start disabled, acquiring a single sample set");
        scope.start_single_trigger();
    }

    let mut producer = {
        let scope = Arc::clone(&scope);
        tokio::task::spawn_blocking(move || acquisition_loop(&scope))
    };

    let mut ticker = tokio::time::interval(config.acquisition.delivery_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut delivered: u64 = 0;
    let end = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if scope.pop_pending_waveform() {
                    delivered += 1;
                    if scope.is_one_shot() {
                        scope.stop();
                    }
                }
            }
            joined = &mut producer => break RunEnd::ProducerExited(joined),
            _ = &mut ctrl_c => break RunEnd::Interrupted,
        }
    };

    scope.stop();
    while scope.pop_pending_waveform() {
        delivered += 1;
    }

    let outcome = match end {
        RunEnd::Interrupted => {
            info!("interrupted");
            Ok(())
        }
        RunEnd::ProducerExited(Ok(Ok(()))) => Ok(()),
        RunEnd::ProducerExited(Ok(Err(DaqError::TransportClosed))) => {
            info!("end of stream");
            Ok(())
        }
        RunEnd::ProducerExited(Ok(Err(e))) => {
            error!(error = %e, "acquisition failed");
            Err(anyhow::Error::new(e).context("acquisition failed"))
        }
        RunEnd::ProducerExited(Err(e)) => {
            Err(anyhow::Error::new(e).context("acquisition task panicked"))
        }
    };

    log_summary(&scope, delivered);

    if let Some(path) = &cli.save_session {
        let session = InstrumentSession::from_instrument(&scope, 1);
        save_session(&session, path)
            .with_context(|| format!("saving session to {}", path.display()))?;
        info!(path = %path.display(), channels = session.channels.len(), "session saved");
    }

    outcome
}

fn open_transport(config: &TransportConfig) -> AppResult<Box<dyn LineTransport>> {
    match config.kind {
        TransportKind::Serial => {
            let port = config
                .port
                .clone()
                .ok_or_else(|| DaqError::Configuration("no serial port configured".to_string()))?;
            let mut adapter =
                SerialAdapter::new(port, config.baud_rate).with_timeout(config.read_timeout());
            adapter.connect()?;
            Ok(Box::new(adapter))
        }
        TransportKind::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| DaqError::Configuration("no capture file configured".to_string()))?;
            Ok(Box::new(ReaderAdapter::open(path)?))
        }
        TransportKind::Stdin => Ok(Box::new(ReaderAdapter::stdin())),
    }
}

/// Producer: read lines while the trigger is armed.
fn acquisition_loop(scope: &CsvStreamInstrument) -> AppResult<()> {
    while scope.is_trigger_armed() {
        if let Err(e) = scope.acquire_data() {
            if !e.can_recover() {
                return Err(e);
            }
            warn!(error = %e, "recoverable transport error, retrying");
            std::thread::sleep(RETRY_DELAY);
        }
    }
    Ok(())
}

fn log_summary(scope: &CsvStreamInstrument, delivered: u64) {
    info!(delivered, "run finished");
    for channel in scope.channels() {
        info!(
            channel = channel.index(),
            name = %channel.display_name(),
            unit = %channel.y_unit(0),
            samples = channel.sample_count(0),
            "channel summary"
        );
    }
}
