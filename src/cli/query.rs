use crate::analyzer::{answer_or_fallback, OpenAiAnalyzer, QueryContext, QueryResult};
use crate::buffer::Summary;
use crate::cli::watch::apply_analyzer_overrides;
use crate::config::{expand_tilde, load_or_default, Config};
use crate::output;
use crate::session::WatchSession;
use crate::source::{FileSource, LineSource};
use crate::watch::WatchError;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const NO_LOG_DATA: &str = "No log data. Specify --file with a log file to read.";

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    /// Question to ask about the logs
    pub query: String,

    /// Look back this many minutes
    #[arg(short, long, default_value_t = 30)]
    pub minutes: u64,

    /// Log file to analyze
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Model to use
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the analysis endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Custom API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    /// Look back this many minutes
    #[arg(short, long, default_value_t = 30)]
    pub minutes: u64,

    /// Log file to analyze
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

/// Build a session from a whole log file. Pending issues are sealed into
/// history; nothing is batched for analysis.
pub async fn load_session(config: &Config, file: Option<&Path>) -> Result<WatchSession, WatchError> {
    let path = file.ok_or_else(|| WatchError::Usage(NO_LOG_DATA.to_string()))?;
    let mut source = FileSource::read_once(expand_tilde(path));
    source.open()?;

    let mut session = WatchSession::new(config, source.name())?;
    while let Some(line) = source.next_line().await? {
        session.ingest(line);
    }
    session.force_flush();

    debug!(
        source = %session.source(),
        lines = session.lines_seen(),
        issues = session.history().issue_count(),
        "Loaded log file"
    );
    Ok(session)
}

pub async fn ask(args: AskArgs, config_path: Option<&Path>) -> Result<QueryResult, WatchError> {
    let mut config = load_or_default(config_path)?;
    apply_analyzer_overrides(
        &mut config,
        args.model.as_deref(),
        args.api_key.as_deref(),
        args.base_url.as_deref(),
    );

    if config.analyzer.api_key.as_deref().map_or(true, str::is_empty) {
        return Err(WatchError::Usage(
            "OPENAI_API_KEY not set. Use --api-key or set the environment variable.".to_string(),
        ));
    }
    let analyzer = OpenAiAnalyzer::new(&config.analyzer)?;

    if let Some(file) = &args.file {
        output::print_info(&format!("Reading {}...", file.display()));
    }
    let session = load_session(&config, args.file.as_deref()).await?;

    let window = minutes(args.minutes);
    let context = QueryContext {
        query: args.query,
        summary: session.summarize(window),
        recent_issues: session.recent_issues(window),
        recent_lines: session.recent_lines(window),
    };
    info!(model = %analyzer.model(), issues = context.recent_issues.len(), "Asking");

    let result = answer_or_fallback(&analyzer, &context).await;
    output::print_query(&result);
    Ok(result)
}

pub async fn status(args: StatusArgs, config_path: Option<&Path>) -> Result<Summary, WatchError> {
    let config = load_or_default(config_path)?;
    let session = load_session(&config, args.file.as_deref()).await?;
    let summary = session.summarize(minutes(args.minutes));

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| WatchError::Usage(format!("failed to encode summary: {}", e)))?;
        println!("{}", json);
    } else {
        output::print_summary(&summary);
    }
    Ok(summary)
}
