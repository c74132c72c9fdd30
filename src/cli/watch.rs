use crate::analyzer::{Analyzer, OpenAiAnalyzer};
use crate::config::{load_or_default, Config};
use crate::output;
use crate::session::WatchSession;
use crate::source::{ReadStart, SourceSpec};
use crate::watch::{run_watch, WatchError, WatchOptions, WatchStats};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Log source: file path, '-' for stdin, or 'docker:CONTAINER'
    #[arg(required_unless_present = "docker")]
    pub source: Option<String>,

    /// Watch Docker container logs
    #[arg(short, long, value_name = "CONTAINER")]
    pub docker: Option<String>,

    /// Only show issues, not all logs
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip LLM analysis, only pattern match
    #[arg(long)]
    pub no_analysis: bool,

    /// Lines of context around issues
    #[arg(short, long)]
    pub context: Option<usize>,

    /// Seconds to batch issues
    #[arg(short, long, value_parser = parse_seconds)]
    pub batch_window: Option<Duration>,

    /// Model to use for analysis
    #[arg(short, long)]
    pub model: Option<String>,

    /// API key for the analysis endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Custom API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Lines of existing container output to replay
    #[arg(long)]
    pub tail: Option<usize>,

    /// Read a file from the beginning instead of only new lines
    #[arg(long)]
    pub from_start: bool,
}

impl WatchArgs {
    pub fn source_spec(&self) -> Result<SourceSpec, WatchError> {
        match (&self.docker, &self.source) {
            (Some(container), _) => Ok(SourceSpec::Container(container.clone())),
            (None, Some(source)) => Ok(SourceSpec::parse(source)),
            (None, None) => Err(WatchError::Usage("no log source given".to_string())),
        }
    }

    /// Command-line flags win over file values
    pub fn apply(&self, config: &mut Config) {
        if let Some(context) = self.context {
            config.buffer.context_lines = context;
        }
        if let Some(window) = self.batch_window {
            config.buffer.batch_window = window;
        }
        if self.quiet {
            config.watch.quiet = true;
        }
        if let Some(tail) = self.tail {
            config.watch.container_tail = tail;
        }
        apply_analyzer_overrides(
            config,
            self.model.as_deref(),
            self.api_key.as_deref(),
            self.base_url.as_deref(),
        );
    }
}

pub(crate) fn apply_analyzer_overrides(
    config: &mut Config,
    model: Option<&str>,
    api_key: Option<&str>,
    base_url: Option<&str>,
) {
    if let Some(model) = model {
        config.analyzer.model = model.to_string();
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config.analyzer.api_key = Some(key.to_string());
    }
    if let Some(url) = base_url.filter(|u| !u.is_empty()) {
        config.analyzer.base_url = url.to_string();
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{}' is not a valid duration", value))
}

pub async fn run(args: WatchArgs, config_path: Option<&Path>) -> Result<WatchStats, WatchError> {
    let mut config = load_or_default(config_path)?;
    args.apply(&mut config);

    let analyzer: Option<Arc<dyn Analyzer>> = if args.no_analysis {
        None
    } else {
        if config.analyzer.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(WatchError::Usage(
                "OPENAI_API_KEY not set. Use --api-key or set the environment variable.\n\
                 Use --no-analysis to run without LLM analysis."
                    .to_string(),
            ));
        }
        let analyzer = OpenAiAnalyzer::new(&config.analyzer)?;
        Some(Arc::new(analyzer) as Arc<dyn Analyzer>)
    };

    let spec = args.source_spec()?;
    let start = if args.from_start {
        ReadStart::Beginning
    } else {
        ReadStart::End
    };
    let mut source = spec.open(start, &config.watch).await?;

    let session = WatchSession::new(&config, source.name())?.into_shared();
    info!(
        source = %source.name(),
        context_lines = config.buffer.context_lines,
        batch_window = ?config.buffer.batch_window,
        analysis = analyzer.is_some(),
        "Watching"
    );
    output::print_startup(source.name(), analyzer.is_some());

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let options = WatchOptions::from(&config.watch);
    let stats = run_watch(source.as_mut(), session, analyzer, &options, shutdown).await?;

    output::print_info(&format!(
        "Stopped watching. {} lines, {} issue(s) in {} batch(es).",
        stats.lines, stats.issues, stats.batches
    ));
    Ok(stats)
}
