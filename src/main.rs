use clap::{Parser, Subcommand};
use hawkeye::cli::query::{AskArgs, StatusArgs};
use hawkeye::cli::watch::WatchArgs;
use hawkeye::output;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "heye", version)]
#[command(about = "AI-powered log watcher that alerts you when something goes wrong", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch logs from a file, stdin, or Docker container
    Watch(WatchArgs),
    /// Ask a question about recent logs
    Ask(AskArgs),
    /// Show status summary of recent log activity
    Status(StatusArgs),
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never mix with rendered output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hawkeye=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Watch(args) => {
            hawkeye::cli::watch::run(args, config_path).await?;
        }
        Commands::Ask(args) => {
            hawkeye::cli::query::ask(args, config_path).await?;
        }
        Commands::Status(args) => {
            hawkeye::cli::query::status(args, config_path).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                hawkeye::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
