use std::path::PathBuf;
use std::process::ExitCode;

use ats_flow::config::AppConfig;
use ats_flow::error::AppError;
use ats_flow::telemetry;
use ats_flow::workflows::batch::AtsChoice;
use ats_flow::workflows::jobs::ReviewStatus;
use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "ATS Flow",
    about = "Detect applicant tracking systems and run batch job applications",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP status service (default command)
    Serve(ServeArgs),
    /// Detect which ATS renders a job posting
    Detect(DetectArgs),
    /// Apply to every job listed in a CSV file
    Apply(ApplyArgs),
    /// Create or convert job CSV files
    Csv {
        #[command(subcommand)]
        command: CsvCommand,
    },
    /// Work through the manual-review queue
    Reviews {
        #[command(subcommand)]
        command: ReviewsCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct DetectArgs {
    /// Job posting URL
    pub(crate) url: String,
    /// Read the page markup from a file instead of fetching the URL
    #[arg(long)]
    pub(crate) html_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// CSV file with a `url` column
    pub(crate) csv: PathBuf,
    /// Candidate profile name (defaults to ATS_PROFILE)
    #[arg(long)]
    pub(crate) profile: Option<String>,
    /// ATS to use for every job: auto, manual or a vendor name
    #[arg(long, default_value = "auto")]
    pub(crate) ats: AtsChoice,
    /// Seconds to wait between applications
    #[arg(long)]
    pub(crate) delay: Option<u64>,
    /// Retries per job after the first attempt
    #[arg(long)]
    pub(crate) max_retries: Option<u32>,
    /// Only process the first N jobs
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Print the imported jobs and exit
    #[arg(long)]
    pub(crate) preview: bool,
    /// Print the submitter each job would use without applying
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CsvCommand {
    /// Write a starter job CSV
    Template {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-export a job CSV with normalized columns and defaults
    Export { input: PathBuf, output: PathBuf },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ReviewsCommand {
    /// List review items, most urgent first
    List {
        /// Only show items with this status
        #[arg(long)]
        status: Option<ReviewStatus>,
    },
    /// Mark a pending item as resolved
    Resolve {
        id: u64,
        #[arg(long)]
        resolution: String,
        #[arg(long)]
        reviewer: String,
    },
    /// Mark a pending item as skipped
    Skip { id: u64 },
}

pub(crate) fn run() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::start(config, args).map(|()| ExitCode::SUCCESS),
        Command::Detect(args) => commands::run_detect(&config, args).map(|()| ExitCode::SUCCESS),
        Command::Apply(args) => commands::run_apply(config, args),
        Command::Csv { command } => commands::run_csv(command).map(|()| ExitCode::SUCCESS),
        Command::Reviews { command } => {
            commands::run_reviews(&config, command).map(|()| ExitCode::SUCCESS)
        }
    }
}
