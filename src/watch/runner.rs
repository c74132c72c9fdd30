use crate::analyzer::{analyze_or_fallback, Analyzer};
use crate::buffer::IssueBatch;
use crate::output;
use crate::session::SharedSession;
use crate::source::LineSource;
use crate::watch::{WatchError, WatchOptions, WatchStats};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Run one watch session until the source ends or `shutdown` fires.
///
/// Lines are ingested here while a ticker task polls for ready batches and
/// hands them to the analyzer outside the session lock. On exit the ticker is
/// cancelled and joined before a single final flush, so every issue is
/// delivered exactly once. A source error is returned only after that flush.
pub async fn run_watch(
    source: &mut dyn LineSource,
    session: SharedSession,
    analyzer: Option<Arc<dyn Analyzer>>,
    options: &WatchOptions,
    shutdown: CancellationToken,
) -> Result<WatchStats, WatchError> {
    let mut stats = WatchStats::default();
    let source_name = source.name().to_string();

    let ticker_cancel = CancellationToken::new();
    let ticker = tokio::spawn(run_ticker(
        session.clone(),
        analyzer.clone(),
        options.poll_interval,
        ticker_cancel.clone(),
    ));

    info!(source = %source_name, "Watch started");

    let outcome = loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(source = %source_name, "Shutdown requested");
                break Ok(());
            }

            next = source.next_line() => match next {
                Ok(Some(line)) => {
                    stats.lines += 1;
                    let content = line.content.clone();
                    let result = session.lock().await.ingest(line);

                    if result.classification.should_flag {
                        stats.flagged += 1;
                    }
                    if !options.quiet || result.classification.should_flag {
                        output::print_line(&content, &result.classification);
                    }
                    for issue in &result.sealed {
                        debug!(issue_id = %issue.id, "Issue queued for batch");
                    }
                }
                Ok(None) => {
                    info!(source = %source_name, "Source ended");
                    break Ok(());
                }
                Err(e) => {
                    error!(source = %source_name, error = %e, "Source failed");
                    break Err(e);
                }
            },
        }
    };

    source.close().await;

    ticker_cancel.cancel();
    let (batches, issues) = ticker.await?;
    stats.batches += batches;
    stats.issues += issues;

    let final_batch = session.lock().await.force_flush();
    if let Some(batch) = final_batch {
        stats.add_batch(batch.len());
        deliver(&batch, analyzer.as_deref()).await;
    }

    info!(
        source = %source_name,
        lines = stats.lines,
        batches = stats.batches,
        issues = stats.issues,
        "Watch finished"
    );

    outcome?;
    Ok(stats)
}

/// Poll for ready batches and prune history until cancelled.
/// Returns (batches, issues) delivered.
async fn run_ticker(
    session: SharedSession,
    analyzer: Option<Arc<dyn Analyzer>>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> (u64, u64) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut delivered = (0u64, 0u64);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = interval.tick() => {
                let ready = {
                    let mut guard = session.lock().await;
                    guard.prune_history(Utc::now());
                    guard.poll_ready()
                };

                // Analysis runs without the lock so ingestion keeps going
                if let Some(batch) = ready {
                    delivered.0 += 1;
                    delivered.1 += batch.len() as u64;
                    deliver(&batch, analyzer.as_deref()).await;
                }
            }
        }
    }

    debug!(batches = delivered.0, "Batch ticker stopped");
    delivered
}

async fn deliver(batch: &IssueBatch, analyzer: Option<&dyn Analyzer>) {
    output::print_batch_header(batch);

    match analyzer {
        Some(analyzer) => {
            let result = analyze_or_fallback(analyzer, batch).await;
            output::print_analysis(&result);
        }
        None => {
            for issue in &batch.issues {
                output::print_line(&issue.trigger_line.content, &issue.classification);
            }
        }
    }
}
