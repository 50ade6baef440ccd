use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

use frameblur_core::config::{config_path, data_dir, initialize_data_dir, AppConfig};
use frameblur_core::geometry::FrameGeometry;
use frameblur_core::kernels::blur::BLUR_OP;
use frameblur_core::logging::{FileSink, LogSettings, DEFAULT_LOG_FILTER};
use frameblur_core::op::{DeviceType, KernelConfig, OpDefinition};
use frameblur_core::registry::{build_default_registry, KernelRegistry};
use frameblur_core::types::{Bytes, Column, Row};

#[derive(Parser)]
#[command(name = "frameblur", about = "Box blur for raw RGB24 frame streams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v: debug, -vv: trace)"
    )]
    verbose: u8,

    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        global = true,
        help = "Explicit tracing filter (overrides RUST_LOG and -v)"
    )]
    log_filter: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Blur(BlurCommand),
    /// Print registered op definitions as JSON
    Describe,
}

#[derive(Args)]
struct BlurCommand {
    #[arg(help = "Raw RGB24 input stream (frames back to back)")]
    input: PathBuf,
    #[arg(short = 'o', long, help = "Raw RGB24 output stream")]
    output: PathBuf,
    #[arg(long)]
    width: i32,
    #[arg(long)]
    height: i32,
    #[arg(short = 'k', long, help = "Averaging window side length")]
    kernel_size: Option<i32>,
    #[arg(long)]
    sigma: Option<f64>,
    #[arg(long, help = "Frames per kernel call")]
    batch_size: Option<usize>,
    #[arg(long, help = "Worker threads per batch")]
    workers: Option<usize>,
    #[arg(long, help = "Also write the re-emitted FrameInfo records here")]
    metadata: Option<PathBuf>,
}

/// One blur run over a raw frame file.
#[derive(Debug, Clone)]
pub struct BlurJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub metadata: Option<PathBuf>,
    pub width: i32,
    pub height: i32,
    pub config: AppConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlurSummary {
    pub frames: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Serialize)]
struct OpDescription<'a> {
    #[serde(flatten)]
    definition: &'a OpDefinition,
    device: DeviceType,
    num_devices: Option<usize>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let resolved_data_dir = data_dir(cli.data_dir.as_deref());

    init_logging(
        Some(resolved_data_dir.as_path()),
        cli.verbose,
        cli.log_filter.as_deref(),
    );
    info!(
        pid = std::process::id(),
        data_dir = %resolved_data_dir.display(),
        "Runtime startup metadata"
    );

    let registry = build_default_registry()?;

    match cli.command {
        Commands::Blur(command) => {
            let config = load_config(&resolved_data_dir);
            let job = command.into_job(config);
            let summary = run_blur_job(&job, &registry)?;
            info!(
                frames = summary.frames,
                batches = summary.batches,
                elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0,
                output = %job.output.display(),
                "Blur complete"
            );
            Ok(())
        }
        Commands::Describe => {
            println!("{}", describe_ops(&registry)?);
            Ok(())
        }
    }
}

impl BlurCommand {
    /// CLI flags take precedence over config.toml.
    fn into_job(self, mut config: AppConfig) -> BlurJob {
        if let Some(kernel_size) = self.kernel_size {
            config.blur.kernel_size = kernel_size;
        }
        if let Some(sigma) = self.sigma {
            config.blur.sigma = sigma;
        }
        if let Some(batch_size) = self.batch_size {
            config.execution.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            config.execution.workers = workers;
        }

        BlurJob {
            input: self.input,
            output: self.output,
            metadata: self.metadata,
            width: self.width,
            height: self.height,
            config,
        }
    }
}

fn load_config(data_dir: &Path) -> AppConfig {
    if let Err(e) = initialize_data_dir(data_dir) {
        warn!(error = %e, "Failed to initialize data directory");
    }
    let cfg_path = config_path(data_dir);
    match AppConfig::load_from_path(&cfg_path) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load config file, using defaults");
            AppConfig::default()
        }
    }
}

pub fn run_blur_job(job: &BlurJob, registry: &KernelRegistry) -> Result<BlurSummary> {
    let started = Instant::now();
    let geometry = FrameGeometry::new(i64::from(job.width), i64::from(job.height))?;
    let execution = job.config.execution.normalized();
    let frame_len = geometry.frame_len();

    let input = File::open(&job.input)
        .with_context(|| format!("failed to open input: {}", job.input.display()))?;
    let input_len = input
        .metadata()
        .with_context(|| format!("failed to stat input: {}", job.input.display()))?
        .len();
    if input_len % frame_len as u64 != 0 {
        bail!(
            "input is {input_len} bytes, not a whole number of {geometry} RGB24 frames ({frame_len} bytes each)"
        );
    }
    let total_frames = input_len / frame_len as u64;
    let batch_bytes = execution
        .batch_size
        .checked_mul(frame_len)
        .with_context(|| format!("a batch of {} {geometry} frames is too large", execution.batch_size))?;

    let kernel_config = KernelConfig::new(job.config.blur.to_args_blob())
        .with_workers(execution.workers);
    let mut kernel = registry.create(BLUR_OP, DeviceType::Cpu, &kernel_config)?;
    kernel
        .validate()
        .context("blur kernel rejected its configuration")?;

    let mut output = BufWriter::new(
        File::create(&job.output)
            .with_context(|| format!("failed to create output: {}", job.output.display()))?,
    );
    let mut metadata = match &job.metadata {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create metadata output: {}", path.display())
        })?)),
        None => None,
    };

    info!(
        input = %job.input.display(),
        frames = total_frames,
        geometry = %geometry,
        kernel_size = job.config.blur.kernel_size,
        batch_size = execution.batch_size,
        workers = execution.workers,
        "Starting blur"
    );

    let mut reader = BufReader::new(input);
    let info_blob = Bytes::from(geometry.encode_info());
    let mut batches = 0;
    let mut frames_done = 0;
    loop {
        let remaining = input_len.saturating_sub((frames_done * frame_len) as u64);
        let want = batch_bytes.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let mut block = Vec::with_capacity(want);
        reader
            .by_ref()
            .take(batch_bytes as u64)
            .read_to_end(&mut block)
            .with_context(|| format!("failed to read input: {}", job.input.display()))?;
        if block.is_empty() {
            break;
        }
        if block.len() % frame_len != 0 {
            bail!("input ended inside a frame after {frames_done} whole frames");
        }

        let block = Bytes::from(block);
        let count = block.len() / frame_len;
        let frames = Column::from_rows(
            (0..count)
                .map(|i| Row::from_bytes(block.slice(i * frame_len..(i + 1) * frame_len)))
                .collect(),
        );
        let frame_infos = Column::from_rows(
            (0..count)
                .map(|_| Row::from_bytes(info_blob.clone()))
                .collect(),
        );

        let outputs = kernel.execute(&[frames, frame_infos]).with_context(|| {
            format!(
                "batch {batches} (frames {frames_done}..{}) failed",
                frames_done + count
            )
        })?;

        for row in &outputs[0].rows {
            output.write_all(row.as_slice())?;
        }
        if let Some(metadata) = metadata.as_mut() {
            for row in &outputs[1].rows {
                metadata.write_all(row.as_slice())?;
            }
        }

        frames_done += count;
        debug!(
            batch = batches,
            frames = count,
            done = frames_done,
            total = total_frames,
            "Batch complete"
        );
        batches += 1;
    }

    output.flush()?;
    if let Some(metadata) = metadata.as_mut() {
        metadata.flush()?;
    }

    Ok(BlurSummary {
        frames: frames_done,
        batches,
        elapsed: started.elapsed(),
    })
}

pub fn describe_ops(registry: &KernelRegistry) -> Result<String> {
    let descriptions: Vec<OpDescription<'_>> = registry
        .list_ops()
        .into_iter()
        .filter_map(|name| registry.op_definition(name))
        .map(|definition| OpDescription {
            definition,
            device: DeviceType::Cpu,
            num_devices: registry.num_devices(&definition.name, DeviceType::Cpu),
        })
        .collect();

    serde_json::to_string_pretty(&descriptions).context("failed to serialize op descriptions")
}

fn init_logging(data_dir: Option<&Path>, verbose: u8, cli_log_filter: Option<&str>) {
    let settings = LogSettings {
        data_dir: data_dir.map(Path::to_path_buf),
        verbose,
        cli_filter: cli_log_filter.map(ToString::to_string),
        env_filter: std::env::var("RUST_LOG").ok(),
        ..Default::default()
    };
    let setup = settings.prepare();
    let filter = setup.filter;
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(parse_env_filter_with_fallback(&filter, "console"));

    let (result, console_only) = match setup.file_sink {
        FileSink::Rolling { log_dir, appender } => {
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(parse_env_filter_with_fallback(&filter, "file"));
            let result = tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(console).with(file),
            );
            if result.is_ok() {
                debug!(log_dir = %log_dir.display(), "File logging enabled");
            }
            (result, None)
        }
        FileSink::ConsoleOnly {
            attempted_log_dir,
            reason,
        } => (
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(console)),
            Some((attempted_log_dir, reason)),
        ),
    };

    if let Err(error) = result {
        eprintln!(
            "Failed to initialize tracing subscriber: {error}. Continuing without structured tracing."
        );
        return;
    }
    if let Some((attempted_log_dir, reason)) = console_only {
        warn!(
            attempted_log_dir = ?attempted_log_dir,
            reason = %reason,
            "Persistent file logging unavailable; continuing with console-only logging"
        );
    }
}

fn parse_env_filter_with_fallback(filter: &str, sink_name: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_new(filter).unwrap_or_else(|error| {
        eprintln!(
            "Invalid {sink_name} log filter '{filter}': {error}. Falling back to '{DEFAULT_LOG_FILTER}'."
        );
        tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}
