//! # Focus Sequencer Binary
//!
//! Runs one focus sweep: a single multi-segment image taken while the focus
//! mechanism steps between sub-exposures, with the detector shifted after
//! each step. The sweep report is printed as JSON on completion.
//!
//! # Usage
//!
//! ```bash
//! # Sweep with config-file values on the simulation backend
//! focus_seq --config config/focus.toml
//!
//! # Override tunables, prompting for the rest
//! focus_seq -c config/focus.toml --exposures 9 --step -25 --prompt
//!
//! # Telescope focus in relative-step mode, JSON logs
//! focus_seq --target telescope --mode step --json
//! ```

use clap::Parser;
use focus_common::config::{ConfigError, ConfigLoader};
use focus_common::consts::DEFAULT_CONFIG_PATH;
use focus_common::focus::config::FocusConfig;
use focus_common::focus::types::{FocusMode, FocusTarget};
use focus_seq::driver_registry::DriverRegistry;
use focus_seq::prompt::LinePrompter;
use focus_seq::{FocusSequencer, Param, SequenceOutcome};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Focus sweep sequencer
#[derive(Parser, Debug)]
#[command(name = "focus_seq")]
#[command(version)]
#[command(about = "Focus sweep sequencer: one image, stepped focus, shifted rows")]
#[command(long_about = None)]
struct Args {
    /// Path to focus configuration file (focus.toml). Defaults apply if missing.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Backend to run the sweep on
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// List registered backends and exit
    #[arg(long)]
    list_drivers: bool,

    /// Exposure time per sub-exposure, seconds
    #[arg(short = 't', long)]
    exposure_time: Option<f64>,

    /// Number of exposures in the sweep
    #[arg(short = 'n', long)]
    exposures: Option<u32>,

    /// Focus change between exposures
    #[arg(short, long, allow_negative_numbers = true)]
    step: Option<f64>,

    /// Detector rows shifted between exposures
    #[arg(long)]
    shift: Option<u32>,

    /// Focus mechanism: instrument or telescope
    #[arg(long)]
    target: Option<FocusTarget>,

    /// Focus addressing: absolute or step
    #[arg(long)]
    mode: Option<FocusMode>,

    /// Settle delay after each focus move, milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Prompt on the terminal for tunables not given on the command line
    #[arg(short, long)]
    prompt: bool,

    /// Lock the tunables before the sweep (requires all four to be resolved
    /// from the command line or config)
    #[arg(long, conflicts_with = "prompt")]
    lock: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Focus sequence failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(&args.config);
    let directive = match &loaded {
        Ok((config, _)) => config.shared.log_level.as_directive(),
        Err(_) => "info",
    };
    setup_tracing(&args, directive);

    let (mut config, found) = loaded?;
    info!("Focus sequencer v{} starting...", env!("CARGO_PKG_VERSION"));
    if found {
        info!("Loaded configuration from {:?}", args.config);
    } else {
        warn!("No configuration at {:?}, using defaults", args.config);
    }

    let registry = DriverRegistry::with_builtin();
    if args.list_drivers {
        for name in registry.list_drivers() {
            println!("{name}");
        }
        return Ok(());
    }

    apply_overrides(&args, &mut config);
    config.validate()?;

    let backend = registry.create(&args.driver, &config)?;
    info!("Backend '{}' created", args.driver);

    let mut builder = FocusSequencer::builder(config.sequence_config())
        .imager(backend.imager)
        .instrument(backend.instrument)
        .telescope(backend.telescope);
    if args.prompt {
        builder = builder.prompter(Box::new(LinePrompter::stdio()));
    }
    let mut sequencer = builder.build()?;

    let handle = sequencer.abort_handle();
    ctrlc::set_handler(move || {
        info!("Received interrupt, aborting focus sweep");
        handle.abort();
    })?;

    if args.lock {
        let cfg = sequencer.config().clone();
        sequencer.configure(
            args.exposure_time.unwrap_or(cfg.exposure_time),
            args.exposures.unwrap_or(cfg.exposure_count),
            args.step.unwrap_or(cfg.focus_step),
            args.shift.unwrap_or(cfg.detector_shift),
        )?;
    }

    let result = sequencer.run(
        param(args.exposure_time, args.prompt),
        param(args.exposures, args.prompt),
        param(args.step, args.prompt),
        param(args.shift, args.prompt),
    );
    if let Err(e) = sequencer.shutdown() {
        warn!("Actuator shutdown failed: {}", e);
    }
    let report = result?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.outcome {
        SequenceOutcome::IntegrationFailed { at_exposure, reason } => {
            Err(format!("exposure {at_exposure} failed: {reason}").into())
        }
        _ => {
            info!("Focus sequencer finished");
            Ok(())
        }
    }
}

/// Load the config file. A missing file yields defaults and `found = false`.
fn load_config(path: &Path) -> Result<(FocusConfig, bool), ConfigError> {
    match FocusConfig::load(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::NotFound(_)) => Ok((FocusConfig::default(), false)),
        Err(e) => Err(e),
    }
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(args: &Args, config: &mut FocusConfig) {
    if let Some(target) = args.target {
        config.focus.target = target;
    }
    if let Some(mode) = args.mode {
        config.focus.mode = mode;
    }
    if let Some(ms) = args.settle_ms {
        config.focus.settle_delay_ms = ms;
    }
}

fn param<T>(value: Option<T>, prompt: bool) -> Param<T> {
    match value {
        Some(v) => Param::Value(v),
        None if prompt => Param::Prompt,
        None => Param::Current,
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, default_directive: &str) {
    let directive = if args.verbose { "debug" } else { default_directive };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
