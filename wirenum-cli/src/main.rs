//! wirenum CLI - wire numbers, device designations and terminal pin names
//! for E3.series document snapshots.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use wirenum::{
    MemoryDocument, NamingConfig, NamingCore, PassKind, PassReport, RunOptions, RunReport,
};

#[derive(Parser)]
#[command(name = "wirenum")]
#[command(about = "Wire numbers and designations for E3.series projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign wire numbers to net segments
    Wires(RunArgs),

    /// Assign device and cable designations
    Devices(RunArgs),

    /// Name terminal pins after their wire numbers
    TerminalPins(RunArgs),

    /// Run devices, wires and terminal pins, in that order
    All(RunArgs),

    /// Print the effective configuration as JSON
    Config {
        /// Configuration file to merge over the defaults
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Document snapshot (.json)
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    /// Configuration file (.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the updated snapshot (default: overwrite DOCUMENT)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Compute and print labels without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Exit with error code if any write failed
    #[arg(long)]
    fail_on_errors: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Wires(args) => handle_run(&args, &[PassKind::WireNumbers]),
        Commands::Devices(args) => handle_run(&args, &[PassKind::DeviceDesignations]),
        Commands::TerminalPins(args) => handle_run(&args, &[PassKind::TerminalPinNames]),
        Commands::All(args) => handle_run(&args, &PassKind::ALL),
        Commands::Config { config } => handle_config(config.as_deref()).map(|()| 0),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

/// Logs go to stderr so JSON on stdout stays parseable. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `NamingConfig::load` validates, and so does every run.
fn load_config(path: Option<&Path>) -> Result<NamingConfig> {
    match path {
        Some(path) => NamingConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(NamingConfig::default()),
    }
}

fn handle_run(args: &RunArgs, passes: &[PassKind]) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let mut doc = MemoryDocument::load(&args.document)
        .with_context(|| format!("failed to load document {}", args.document.display()))?;

    let options = RunOptions {
        dry_run: args.dry_run,
    };
    let report = NamingCore::run(&mut doc, &config, &options, passes)?;

    if !args.dry_run {
        let target = args.output.as_deref().unwrap_or(args.document.as_path());
        doc.save(target)
            .with_context(|| format!("failed to write document {}", target.display()))?;
        tracing::info!("Wrote {}", target.display());
    }

    match args.format {
        OutputFormat::Human => output_human(&report, &args.document),
        OutputFormat::Json => output_json(&report)?,
    }

    if args.fail_on_errors && report.has_failures() {
        return Ok(1);
    }
    Ok(0)
}

fn handle_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn output_human(report: &RunReport, document: &Path) {
    println!("\nDocument: {}", document.display());
    println!("{}", "─".repeat(60));

    for pass in &report.passes {
        output_pass(pass);
    }

    println!("\n  Summary:");
    println!(
        "    {}/{} items updated",
        report.total_updated(),
        report.total_considered()
    );
    if report.has_failures() {
        println!("    Some writes failed, run with -v for details");
    }
}

fn output_pass(pass: &PassReport) {
    let suffix = if pass.dry_run { " (dry run)" } else { "" };
    println!("\n  {}{}:", pass.pass, suffix);
    for assignment in &pass.assignments {
        println!("    {:<24} {}", assignment.subject, assignment.label);
    }
    println!(
        "    Updated: {}/{}  Unchanged: {}  Skipped: {}  Failed: {}",
        pass.updated, pass.considered, pass.unchanged, pass.skipped, pass.failed
    );
}

fn output_json(report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "run_id": report.run_id,
        "started_at": report.started_at,
        "passes": report.passes,
        "summary": {
            "updated": report.total_updated(),
            "considered": report.total_considered(),
            "failed": report.passes.iter().map(|p| p.failed).sum::<usize>(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
