//! ciprobe CLI - reports whether CI workflows upload a Veracode artifact

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use ciprobe::workflow::{SENTINEL_KEY, WORKFLOWS_DIR};
use ciprobe::{ScanConfig, ScanReport, WorkflowScanner};

#[derive(Parser)]
#[command(name = "ciprobe")]
#[command(about = "Probe CI workflow definitions for security artifact uploads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan workflow files for the artifact sentinel key
    Scan {
        /// Repository root
        #[arg(long, env = "CIPROBE_ROOT", default_value = ".")]
        root: PathBuf,

        /// Workflows directory, relative to the root
        #[arg(long, env = "CIPROBE_WORKFLOWS_DIR", default_value = WORKFLOWS_DIR)]
        workflows_dir: PathBuf,

        /// Key whose presence marks an artifact upload step
        #[arg(long, env = "CIPROBE_SENTINEL", default_value = SENTINEL_KEY)]
        sentinel: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            root,
            workflows_dir,
            sentinel,
            format,
        } => run_scan(
            ScanConfig {
                root,
                workflows_dir,
                sentinel,
            },
            format,
        ),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_scan(config: ScanConfig, format: Format) -> anyhow::Result<()> {
    let scanner = WorkflowScanner::new(config);
    let report = scanner.scan();

    match format {
        Format::Json => println!("{}", serde_json::to_string(&report)?),
        Format::Text => print_text(&scanner, &report),
    }

    Ok(())
}

fn print_text(scanner: &WorkflowScanner, report: &ScanReport) {
    let config = scanner.config();
    match &report.matched_file {
        Some(file) => println!(
            "{} {} found in {}",
            "✓".green(),
            config.sentinel.cyan().bold(),
            file.display()
        ),
        None => println!(
            "{} No {} key in {} ({} files scanned)",
            "✗".yellow(),
            config.sentinel.cyan().bold(),
            config.workflows_path().display(),
            report.files_scanned
        ),
    }
}
