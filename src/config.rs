// src/config.rs
use crate::api::pagination::WalkOptions;
use crate::api::{Credentials, GraphEndpoints};
use crate::constants::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};
use crate::directory::ResourceKind;
use crate::error::AppError;
use crate::fault::ErrorBudget;
use crate::fetcher::FetchOptions;
use crate::retry::RetryPolicy;
use clap::Parser;
use std::time::Duration;
use url::Url;

/// Parses a resource name given on the command line.
fn parse_resource_kind(input: &str) -> Result<ResourceKind, String> {
    match input.to_ascii_lowercase().as_str() {
        "users" | "user" => Ok(ResourceKind::User),
        "sites" | "site" => Ok(ResourceKind::Site),
        other => Err(format!("unknown resource '{}' (expected users or sites)", other)),
    }
}

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Collections to fetch: users, sites (defaults to both)
    #[arg(value_parser = parse_resource_kind)]
    pub resources: Vec<ResourceKind>,

    /// Total attempts per page request, the first one included
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds (doubles afterwards)
    #[arg(long, default_value_t = DEFAULT_INITIAL_DELAY.as_millis() as u64)]
    pub initial_delay_ms: u64,

    /// Ceiling for any single retry delay, in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_DELAY.as_secs())]
    pub max_delay_secs: u64,

    /// Abandon a fetch on its first invalid item
    #[arg(long, default_value_t = false, conflicts_with = "max_failures")]
    pub fail_fast: bool,

    /// Abandon a fetch once more than this many items are invalid
    #[arg(long)]
    pub max_failures: Option<usize>,

    /// Stop each walk after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Cancel every fetch still running after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Requested page size ($top)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Graph service root, for national clouds
    #[arg(long)]
    pub graph_endpoint: Option<Url>,

    /// Identity platform root, for national clouds
    #[arg(long)]
    pub login_endpoint: Option<Url>,

    /// Print fetch summaries as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved fetch configuration, validated and ready to drive every fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub resources: Vec<ResourceKind>,
    pub credentials: Credentials,
    pub endpoints: GraphEndpoints,
    pub fetch: FetchOptions,
    pub page_size: Option<u32>,
    pub timeout: Option<Duration>,
    pub json: bool,
    pub verbose: bool,
}

impl FetchConfig {
    /// Resolves a complete configuration from CLI input and the process
    /// environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |name| std::env::var(name).ok())
    }

    /// Resolves a configuration, reading variables through `env`.
    pub fn resolve_with<F>(cli: CommandLineInput, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = credentials_from(&env)?;

        if cli.max_attempts == 0 {
            return Err(AppError::InvalidConfiguration(
                "--max-attempts must be at least 1".to_string(),
            ));
        }
        if cli.page_size == Some(0) {
            return Err(AppError::InvalidConfiguration(
                "--page-size must be at least 1".to_string(),
            ));
        }
        if cli.max_pages == Some(0) {
            return Err(AppError::InvalidConfiguration(
                "--max-pages must be at least 1".to_string(),
            ));
        }

        let public = GraphEndpoints::public_cloud()?;
        let endpoints = GraphEndpoints::new(
            cli.graph_endpoint.unwrap_or(public.graph),
            cli.login_endpoint.unwrap_or(public.login),
        );

        let retry = RetryPolicy {
            max_attempts: cli.max_attempts,
            initial_delay: Duration::from_millis(cli.initial_delay_ms),
            max_delay: Duration::from_secs(cli.max_delay_secs),
            jitter: true,
        };

        let budget = match (cli.fail_fast, cli.max_failures) {
            (true, _) => ErrorBudget::FailFast,
            (false, Some(n)) => ErrorBudget::AtMost(n),
            (false, None) => ErrorBudget::Unlimited,
        };

        let mut resources = Vec::new();
        for kind in cli.resources {
            if !resources.contains(&kind) {
                resources.push(kind);
            }
        }
        if resources.is_empty() {
            resources = vec![ResourceKind::User, ResourceKind::Site];
        }

        Ok(FetchConfig {
            resources,
            credentials,
            endpoints,
            fetch: FetchOptions {
                walk: WalkOptions {
                    retry,
                    max_pages: cli.max_pages,
                },
                budget,
            },
            page_size: cli.page_size,
            timeout: cli.timeout_secs.map(Duration::from_secs),
            json: cli.json,
            verbose: cli.verbose,
        })
    }
}

/// Reads credentials: a ready token wins over an app registration.
fn credentials_from<F>(env: &F) -> Result<Credentials, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("GRAPH_ACCESS_TOKEN") {
        return Ok(Credentials::AccessToken(token));
    }

    match (
        non_empty("GRAPH_TENANT_ID"),
        non_empty("GRAPH_CLIENT_ID"),
        non_empty("GRAPH_CLIENT_SECRET"),
    ) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Credentials::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        }),
        _ => Err(AppError::MissingConfiguration(
            "set GRAPH_ACCESS_TOKEN, or GRAPH_TENANT_ID, GRAPH_CLIENT_ID and GRAPH_CLIENT_SECRET"
                .to_string(),
        )),
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            resources: vec![ResourceKind::User, ResourceKind::Site],
            credentials: Credentials::AccessToken("token_for_testing_only".to_string()),
            endpoints: GraphEndpoints::public_cloud()
                .expect("Built-in endpoints should always be valid"),
            fetch: FetchOptions::default(),
            page_size: None,
            timeout: None,
            json: false,
            verbose: false,
        }
    }
}
