pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bindery_core::config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "bindery",
    about = "Bindery underwriting CLI",
    long_about = "Run quote submissions through the underwriting pipeline, manage the guideline \
                  corpus, and inspect persisted runs.",
    after_help = "Examples:\n  bindery submit --file quote.json\n  bindery submit --file quote.json --answers '{\"construction_year\": 1995}'\n  bindery ingest --dir data/guidelines\n  bindery runs --status completed"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a quote submission through the underwriting pipeline and persist the run")]
    Submit {
        #[arg(long, help = "Path to the submission JSON file")]
        file: PathBuf,
        #[arg(long, help = "Use the basic engine variant (no missing-info recovery loop)")]
        basic: bool,
        #[arg(long, help = "JSON object of follow-up answers for a missing-info round")]
        answers: Option<String>,
    },
    #[command(about = "Chunk and embed guideline documents and print the per-document summary")]
    Ingest {
        #[arg(long, help = "Directory of markdown guideline documents (defaults to config)")]
        dir: Option<PathBuf>,
    },
    #[command(about = "List persisted runs, newest first")]
    Runs {
        #[arg(long, default_value_t = 20, help = "Maximum number of runs to list")]
        limit: u32,
        #[arg(long, help = "Filter by status (running|completed|failed|waiting_for_info)")]
        status: Option<String>,
    },
    #[command(about = "Show one persisted run record in full")]
    Show {
        #[arg(help = "Run id")]
        run_id: String,
    },
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Inspect the effective configuration")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Submit { file, basic, answers } => {
            commands::submit::run(&file, basic, answers.as_deref())
        }
        Command::Ingest { dir } => commands::ingest::run(dir.as_deref()),
        Command::Runs { limit, status } => commands::runs::run(limit, status.as_deref()),
        Command::Show { run_id } => commands::show::run(&run_id),
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global tracing subscriber from config. Safe to call more
/// than once; later calls are no-ops.
pub fn init_logging(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);
    let result = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    let _ = result;
}
