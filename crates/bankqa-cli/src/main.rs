//! bankqa CLI: validate and lint exam item banks.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use bankqa_core::lint::Profile;

mod commands;

#[derive(Parser)]
#[command(
    name = "bankqa",
    version,
    about = "Exam item bank validator and quality linter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads a bank.
#[derive(Args, Debug, Clone)]
pub struct BankArgs {
    /// Path to the bank JSON file
    pub bank: PathBuf,

    /// Write the full JSON report here
    #[arg(long)]
    pub write_report: Option<PathBuf>,

    /// Write a SARIF 2.1.0 report here
    #[arg(long)]
    pub write_sarif: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Validator-only options.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Write the bank manifest here
    #[arg(long)]
    pub write_manifest: Option<PathBuf>,

    /// JSON object of permitted source ids; enables open-origin checks
    #[arg(long, conflicts_with = "no_citations")]
    pub open_catalog: Option<PathBuf>,

    /// Skip citation checks
    #[arg(long)]
    pub no_citations: bool,
}

/// Linter-only options.
#[derive(Args, Debug, Clone)]
pub struct LintArgs {
    /// Severity profile: human or strict
    #[arg(long)]
    pub profile: Option<Profile>,

    /// Exit 2 when warnings are present and there are no errors
    #[arg(long)]
    pub fail_on_warning: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run schema, distribution and citation checks
    Validate {
        #[command(flatten)]
        bank: BankArgs,

        #[command(flatten)]
        validate: ValidateArgs,
    },

    /// Score items with the heuristic quality linter
    Lint {
        #[command(flatten)]
        bank: BankArgs,

        #[command(flatten)]
        lint: LintArgs,
    },

    /// Validator and linter in one report
    Check {
        #[command(flatten)]
        bank: BankArgs,

        #[command(flatten)]
        validate: ValidateArgs,

        #[command(flatten)]
        lint: LintArgs,

        /// Write a markdown report here
        #[arg(long)]
        write_markdown: Option<PathBuf>,
    },

    /// Compare two manifests for unintended bank drift
    Drift {
        /// Baseline manifest JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current manifest JSON
        #[arg(long)]
        current: PathBuf,

        /// Exit code 1 if the manifests differ
        #[arg(long)]
        fail_on_drift: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a starter bankqa.toml
    Init,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bankqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { bank, validate } => commands::validate::execute(bank, validate),
        Commands::Lint { bank, lint } => commands::lint::execute(bank, lint),
        Commands::Check {
            bank,
            validate,
            lint,
            write_markdown,
        } => commands::check::execute(bank, validate, lint, write_markdown),
        Commands::Drift {
            baseline,
            current,
            fail_on_drift,
            format,
        } => commands::drift::execute(baseline, current, fail_on_drift, format),
        Commands::Init => commands::init::execute(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
