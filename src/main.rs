//! Synheart Window Stats CLI
//!
//! Streams sensor readings through the window statistics engine.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use synheart_window_stats::{
    config::{Config, LateDataPolicy, OutputFormat},
    core::{Event, Window, WindowedAggregationEngine},
    emitter::{JsonLinesEmitter, LateRecord, TextEmitter},
    source::{demo_batch, parse_line, InputFormat},
    VERSION,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-windows")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Event-time window statistics for sensor readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream readings from a file or stdin and print window statistics
    Run(RunArgs),

    /// Replay the built-in twelve-reading batch
    Demo,

    /// Show configuration
    Config {
        /// Write the effective configuration to the default location
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input file (reads stdin when omitted)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Input record format
    #[arg(long, value_enum, default_value = "csv")]
    format: InputFormat,

    /// Configuration file (defaults to the user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window size in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Allowed lateness in seconds
    #[arg(long)]
    lateness_secs: Option<u64>,

    /// What to do with readings for already-closed windows
    #[arg(long, value_enum)]
    late_policy: Option<LateDataPolicy>,

    /// Bound on simultaneously open windows
    #[arg(long)]
    max_open_windows: Option<usize>,

    /// Output format for finalized windows
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// IANA timezone for rendering window starts (e.g. Europe/Berlin)
    #[arg(long)]
    timezone: Option<String>,

    /// Write final engine counters to this JSON file
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Demo => cmd_demo(),
        Commands::Config { save } => cmd_config(save),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let mut engine = build_engine(&config)?;
    let metrics = engine.metrics();

    info!(
        engine = %engine.id(),
        window_secs = config.engine.window_size.as_secs(),
        lateness_secs = config.engine.allowed_lateness.as_secs(),
        policy = ?config.engine.late_data_policy,
        "starting stream"
    );

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    let input = open_input(args.input.as_deref())?;

    // Use a bounded channel so a fast reader cannot outrun the engine
    let (sender, receiver) = bounded::<Event>(10_000);
    let format = args.format;
    let reader = thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || read_input(input, format, sender))
        .context("failed to start input reader")?;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                // Rejections are counted and logged by the engine.
                let _ = engine.process(event);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if !running.load(Ordering::SeqCst) {
        info!("interrupted, flushing open windows");
    }
    engine.flush();
    drop(receiver);

    // The reader is blocked on stdin after Ctrl+C; only join it on a clean end of input.
    if running.load(Ordering::SeqCst) {
        reader
            .join()
            .map_err(|_| anyhow::anyhow!("input reader panicked"))?
            .context("failed to read input")?;
    }

    if let Some(path) = &args.metrics_out {
        metrics
            .save(path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    eprintln!();
    eprintln!("{}", metrics.summary());
    Ok(())
}

fn cmd_demo() -> anyhow::Result<()> {
    println!("Synheart Window Stats v{VERSION}");
    println!("Replaying {} readings in 60s windows:", demo_batch().len());
    println!();

    let config = Config::default();
    let mut engine = build_engine(&config)?;
    for event in demo_batch() {
        let _ = engine.process(event);
    }
    // End of the batch is the only completeness signal.
    let summary = engine.close();

    println!();
    println!(
        "{} windows from {} readings",
        summary.windows_emitted, summary.events_accepted
    );
    Ok(())
}

fn cmd_config(save: bool) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        config.save().context("failed to save configuration")?;
        println!();
        println!("Saved.");
    }
    Ok(())
}

/// Load the configuration file and apply command-line overrides.
fn resolve_config(args: &RunArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "could not load config, using defaults");
            Config::default()
        }),
    };

    if let Some(secs) = args.window_secs {
        config.engine.window_size = Duration::from_secs(secs);
    }
    if let Some(secs) = args.lateness_secs {
        config.engine.allowed_lateness = Duration::from_secs(secs);
    }
    if let Some(policy) = args.late_policy {
        config.engine.late_data_policy = policy;
    }
    if let Some(max) = args.max_open_windows {
        config.engine.max_open_windows = Some(max);
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(tz) = &args.timezone {
        config.timezone = Some(tz.clone());
    }

    config.engine.validate()?;
    Ok(config)
}

/// Create an engine writing results to stdout and late readings to stderr.
fn build_engine(config: &Config) -> anyhow::Result<WindowedAggregationEngine> {
    let tz = config.tz()?;
    let mut engine = WindowedAggregationEngine::new(config.engine.clone())?;

    match config.output {
        OutputFormat::Text => {
            engine.subscribe(TextEmitter::new(std::io::stdout()).with_timezone(tz));
        }
        OutputFormat::Jsonl => engine.subscribe(JsonLinesEmitter::new(std::io::stdout())),
    }

    if config.engine.late_data_policy == LateDataPolicy::SideOutput {
        engine.subscribe_late(|event: &Event, window: &Window| {
            match serde_json::to_string(&LateRecord::new(event, window)) {
                Ok(json) => eprintln!("late: {json}"),
                Err(e) => warn!(error = %e, "could not serialize late record"),
            }
        });
    }

    Ok(engine)
}

/// Open the input file, or stdin when no path is given.
fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

/// Read and decode input lines, forwarding events to the engine loop.
fn read_input(
    reader: Box<dyn BufRead + Send>,
    format: InputFormat,
    sender: Sender<Event>,
) -> std::io::Result<()> {
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(format, &line, index + 1) {
            Ok(Some(event)) => {
                if sender.send(event).is_err() {
                    // Engine loop has stopped.
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping unreadable record"),
        }
    }
    Ok(())
}
