use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use meshquant::batch::{self, ArtifactSink};
use meshquant::io::{aggregate, discover};
use meshquant::prelude::*;

#[derive(Parser)]
#[command(name = "meshquant")]
#[command(about = "Normalize, quantize and reconstruct mesh vertices, and measure the error")]
struct Cli {
    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    log_format: LogFormat,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run every method on every mesh and write the artifacts of each run
    Process(ProcessArgs),
    /// Collect the summaries of previous runs into csv tables
    Aggregate(AggregateArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Directory scanned for .obj files
    #[arg(long, default_value = "samples")]
    input_dir: PathBuf,

    /// Root of the output tree
    #[arg(long, default_value = "outputs")]
    out_dir: PathBuf,

    /// Number of quantization levels per axis
    #[arg(long, default_value_t = meshquant::quantization::DEFAULT_BINS)]
    bins: u64,

    /// Treat each immediate subdirectory of the input directory as a group
    #[arg(long, conflicts_with = "sample")]
    group_by_dir: bool,

    /// Process a single file or directory, absolute or relative to the input directory
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Output directory template for --sample, with the keys {out_dir}, {group} and {name}
    #[arg(long, default_value = discover::OutTemplate::DEFAULT)]
    out_template: String,

    /// Normalization methods to run
    #[arg(long, value_delimiter = ',', default_value = "minmax,unit_sphere")]
    methods: Vec<NormalizationType>,

    /// Worker threads; 0 uses one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(Args)]
struct AggregateArgs {
    /// Output tree written by `process`
    #[arg(long, default_value = "outputs")]
    outputs_dir: PathBuf,

    /// Where the tables are written; defaults to <outputs-dir>/aggregate
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn init_logging(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    match cli.command {
        Command::Process(args) => process(args),
        Command::Aggregate(args) => run_aggregate(args),
    }
}

fn process(args: ProcessArgs) -> Result<()> {
    if args.bins < 2 {
        anyhow::bail!("--bins must be at least 2, got {}", args.bins);
    }
    if args.methods.is_empty() {
        anyhow::bail!("--methods must name at least one method");
    }
    let sample_is_absolute = args.sample.as_ref().is_some_and(|s| s.is_absolute());
    if !sample_is_absolute && !args.input_dir.is_dir() {
        anyhow::bail!("Input directory '{}' does not exist", args.input_dir.display());
    }

    let mode = match (args.sample, args.group_by_dir) {
        (Some(sample), _) => discover::Mode::Sample(sample),
        (None, true) => discover::Mode::GroupByDir,
        (None, false) => discover::Mode::Flat,
    };
    let discover_cfg = discover::Config {
        input_dir: args.input_dir,
        out_dir: args.out_dir.clone(),
        mode,
        template: discover::OutTemplate::new(args.out_template)?,
    };
    let plan = discover::plan(&discover_cfg)?;
    if plan.is_empty() {
        tracing::warn!(input_dir = %discover_cfg.input_dir.display(), "no .obj files found");
        return Ok(());
    }
    tracing::info!(meshes = plan.len(), bins = args.bins, "starting batch");

    let cfg = batch::Config {
        pipeline: pipeline::Config { bins: args.bins, strategies: args.methods },
        num_threads: args.threads,
    };
    let sink = ArtifactSink::from_plan(&args.out_dir, &plan);
    let report = batch::run_discovered(&plan, &cfg, &sink)?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create '{}'", args.out_dir.display()))?;
    let report_path = args.out_dir.join("batch_report.json");
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&report_path, json)
        .with_context(|| format!("Failed to write '{}'", report_path.display()))?;

    tracing::info!(
        succeeded = report.results.len(),
        failed = report.failures.len(),
        skipped = report.skipped.len(),
        report = %report_path.display(),
        "batch finished"
    );
    Ok(())
}

fn run_aggregate(args: AggregateArgs) -> Result<()> {
    let out_dir = args.out_dir.unwrap_or_else(|| args.outputs_dir.join("aggregate"));
    let report = aggregate::aggregate(&args.outputs_dir, &out_dir)?;
    for m in &report.methods {
        println!("{}: runs={} mean MSE={:e} mean MAE={:e}", m.method, m.runs, m.mean_mse, m.mean_mae);
    }
    Ok(())
}
