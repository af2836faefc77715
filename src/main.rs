// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use tokio_util::sync::CancellationToken;

use pagewalk::{
    AppError, CollectionFetcher, CommandLineInput, FetchConfig, FetchSummary, FetchVerdict,
    GraphHttpClient, GraphPageSource, GraphSession, ResourceKind, ResourceQuery, Sites, Users,
};

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("pagewalk.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {M} - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Cancels `cancel` on Ctrl-C or once `timeout` has passed.
fn spawn_watchdog(
    cancel: CancellationToken,
    timeout: Option<std::time::Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => log::warn!("Interrupted, cancelling running fetches"),
            _ = deadline => log::warn!("Timeout reached, cancelling running fetches"),
        }
        cancel.cancel();
    })
}

/// Walks one collection and condenses the outcome.
async fn fetch_resource(
    kind: ResourceKind,
    session: &Arc<GraphSession>,
    fetcher: &CollectionFetcher,
    page_size: Option<u32>,
) -> FetchSummary {
    match kind {
        ResourceKind::User => {
            let query = ResourceQuery::users().with_top(page_size);
            let source = GraphPageSource::for_query(Arc::clone(session), &query);
            let outcome = Users::new(&source, fetcher)
                .page_size(page_size)
                .get_all()
                .await;
            for user in &outcome.items {
                log::debug!("user {} ({})", user.principal_name, user.id);
            }
            outcome.summary()
        }
        ResourceKind::Site => {
            let query = ResourceQuery::sites().with_top(page_size);
            let source = GraphPageSource::for_query(Arc::clone(session), &query);
            let outcome = Sites::new(&source, fetcher)
                .page_size(page_size)
                .get_all()
                .await;
            for site in &outcome.items {
                log::debug!("site {} ({})", site.display_name, site.web_url);
            }
            outcome.summary()
        }
    }
}

/// Runs every requested fetch concurrently against one session.
async fn execute_fetches(config: &FetchConfig) -> Result<Vec<FetchSummary>, AppError> {
    let http = GraphHttpClient::new()?;
    let session = Arc::new(
        GraphSession::issue(http, config.credentials.clone(), config.endpoints.clone()).await?,
    );

    let cancel = CancellationToken::new();
    let watchdog = spawn_watchdog(cancel.clone(), config.timeout);
    let fetcher = CollectionFetcher::new(config.fetch.clone(), cancel);

    let runs = config
        .resources
        .iter()
        .map(|kind| fetch_resource(*kind, &session, &fetcher, config.page_size));
    let summaries = futures::future::join_all(runs).await;

    watchdog.abort();
    Ok(summaries)
}

fn print_summary(summary: &FetchSummary) {
    println!(
        "{}s: {} ({} accepted, {} skipped, {} failed over {} page(s){})",
        summary.resource,
        summary.verdict,
        summary.accepted,
        summary.skipped,
        summary.failed,
        summary.pages,
        if summary.truncated { ", truncated" } else { "" }
    );
    for failure in &summary.failures {
        println!("  ✗ {}", failure);
    }
    if let Some(fatal) = &summary.fatal {
        println!("  ⚠️  aborted: {}", fatal);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = FetchConfig::resolve(cli)?;

    let summaries = execute_fetches(&config).await?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        summaries.iter().for_each(print_summary);
    }

    if summaries.iter().any(|s| s.verdict == FetchVerdict::Fatal) {
        std::process::exit(1);
    }

    Ok(())
}
