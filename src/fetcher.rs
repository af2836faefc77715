// src/fetcher.rs
//! Collection fetching: walking, validating and accounting for one collection.
//!
//! [`CollectionFetcher`] wires a validator and a fresh
//! [`FailureAggregator`] into a page walk. One bad item never ends a fetch;
//! only a page that cannot be fetched, or a caller-imposed error budget,
//! does. Either way the items accepted so far are returned.

use serde::Serialize;
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;

use crate::api::pagination::{walk_pages, WalkError, WalkOptions, WalkProgress};
use crate::api::{PageSource, ResourceQuery};
use crate::directory::ResourceKind;
use crate::error::AppError;
use crate::fault::{ErrorBudget, FailureAggregator, FetchVerdict, RecoverableFailure};
use crate::retry::RetryPolicy;
use crate::validate::{ItemValidator, SkipReason, Validation};

/// An item left out for a known, benign reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub item_id: Option<String>,
    pub reason: SkipReason,
}

/// Everything that happened during one fetch.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub resource: ResourceKind,
    /// Accepted items, in server order.
    pub items: Vec<T>,
    pub verdict: FetchVerdict,
    /// Recoverable failures, in discovery order.
    pub failures: Vec<RecoverableFailure>,
    pub skipped: Vec<SkippedItem>,
    /// Why the fetch was abandoned, when `verdict` is `Fatal`.
    pub fatal: Option<AppError>,
    pub progress: WalkProgress,
}

impl<T> FetchOutcome<T> {
    /// Raw items delivered by the walk, whatever became of them.
    pub fn delivered(&self) -> usize {
        self.items.len() + self.skipped.len() + self.failures.len()
    }

    pub fn is_fatal(&self) -> bool {
        self.verdict == FetchVerdict::Fatal
    }

    /// Collapses the outcome into a pass/fail answer: fatal fetches become
    /// their error, everything else yields the accepted items.
    pub fn into_result(self) -> Result<Vec<T>, AppError> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(self.items),
        }
    }

    pub fn summary(&self) -> FetchSummary {
        FetchSummary {
            resource: self.resource,
            verdict: self.verdict,
            accepted: self.items.len(),
            skipped: self.skipped.len(),
            failed: self.failures.len(),
            pages: self.progress.pages,
            truncated: self.progress.truncated,
            failures: self.failures.iter().map(ToString::to_string).collect(),
            fatal: self.fatal.as_ref().map(ToString::to_string),
        }
    }
}

/// A serializable digest of a [`FetchOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub resource: ResourceKind,
    pub verdict: FetchVerdict,
    pub accepted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pages: u32,
    pub truncated: bool,
    pub failures: Vec<String>,
    pub fatal: Option<String>,
}

/// Settings shared by every fetch a fetcher runs.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub walk: WalkOptions,
    pub budget: ErrorBudget,
}

impl FetchOptions {
    pub fn with_retry(self, retry: RetryPolicy) -> Self {
        Self {
            walk: WalkOptions { retry, ..self.walk },
            ..self
        }
    }

    pub fn with_budget(self, budget: ErrorBudget) -> Self {
        Self { budget, ..self }
    }
}

/// Runs validated, fault-tolerant fetches of whole collections.
#[derive(Debug, Clone, Default)]
pub struct CollectionFetcher {
    options: FetchOptions,
    cancel: CancellationToken,
}

impl CollectionFetcher {
    pub fn new(options: FetchOptions, cancel: CancellationToken) -> Self {
        Self { options, cancel }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Walks the collection described by `query`, validating every item.
    pub async fn fetch<S, V>(
        &self,
        source: &S,
        query: &ResourceQuery,
        validator: &V,
    ) -> FetchOutcome<V::Item>
    where
        S: PageSource + ?Sized,
        V: ItemValidator,
    {
        let mut aggregator = FailureAggregator::new(self.options.budget);
        let mut items = Vec::new();
        let mut skipped = Vec::new();

        log::info!("Fetching all {}s", query.kind);

        let walk = walk_pages(source, query, &self.options.walk, &self.cancel, |raw| {
            match validator.validate(&raw) {
                Validation::Accepted(item) => items.push(item),
                Validation::Skipped(reason) => {
                    log::debug!("skipping {} {:?}: {}", query.kind, raw.id(), reason);
                    skipped.push(SkippedItem {
                        item_id: raw.id().map(str::to_string),
                        reason,
                    });
                }
                Validation::Invalid(failure) => {
                    if !aggregator.record(failure) {
                        return ControlFlow::Break(());
                    }
                }
            }
            ControlFlow::Continue(())
        })
        .await;

        let progress = match walk {
            Ok(progress) => progress,
            Err(WalkError { error, progress }) => {
                aggregator.abort(error);
                progress
            }
        };

        let (verdict, failures, fatal) = aggregator.into_parts();

        log::info!(
            "{} fetch {}: {} accepted, {} skipped, {} failed over {} page(s)",
            query.kind,
            verdict,
            items.len(),
            skipped.len(),
            failures.len(),
            progress.pages
        );

        FetchOutcome {
            resource: query.kind,
            items,
            verdict,
            failures,
            skipped,
            fatal,
            progress,
        }
    }
}
