// src/fault.rs
//! Failure accounting for a single fetch.
//!
//! A [`FailureAggregator`] collects item-level problems in discovery order
//! and decides, once the walk is over, whether the fetch was clean, partial,
//! or fatal. Each fetch owns its aggregator; nothing here is shared, so no
//! locking is needed.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::directory::ResourceKind;
use crate::error::AppError;

/// What was wrong with a single raw item.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", content = "detail", rename_all = "snake_case")]
pub enum ItemProblem {
    #[error("unexpected type: {found}")]
    UnexpectedType { found: String },

    #[error("missing ID")]
    MissingId,

    #[error("invalid ID: {0}")]
    InvalidId(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// One item's validation error, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoverableFailure {
    pub resource: ResourceKind,
    pub item_id: Option<String>,
    pub problem: ItemProblem,
}

impl RecoverableFailure {
    pub fn new(resource: ResourceKind, item_id: Option<&str>, problem: ItemProblem) -> Self {
        Self {
            resource,
            item_id: item_id.filter(|id| !id.is_empty()).map(str::to_string),
            problem,
        }
    }
}

impl fmt::Display for RecoverableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item_id {
            Some(id) => write!(f, "validating {} {}: {}", self.resource, id, self.problem),
            None => write!(f, "validating {}: {}", self.resource, self.problem),
        }
    }
}

impl std::error::Error for RecoverableFailure {}

/// The terminal state of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchVerdict {
    /// Every delivered item was accepted or knowingly skipped.
    Clean,
    /// The walk completed but some items failed validation.
    Partial,
    /// The walk was abandoned before the collection was exhausted.
    Fatal,
}

impl fmt::Display for FetchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchVerdict::Clean => write!(f, "clean"),
            FetchVerdict::Partial => write!(f, "partial"),
            FetchVerdict::Fatal => write!(f, "fatal"),
        }
    }
}

/// How many recoverable failures a caller tolerates before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorBudget {
    #[default]
    Unlimited,
    /// The first recoverable failure aborts the fetch.
    FailFast,
    /// Up to `n` failures are tolerated; failure `n + 1` aborts.
    AtMost(usize),
}

impl ErrorBudget {
    fn is_exceeded_by(&self, failures: usize) -> bool {
        match self {
            ErrorBudget::Unlimited => false,
            ErrorBudget::FailFast => failures > 0,
            ErrorBudget::AtMost(max) => failures > *max,
        }
    }
}

impl fmt::Display for ErrorBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBudget::Unlimited => write!(f, "unlimited"),
            ErrorBudget::FailFast => write!(f, "fail-fast"),
            ErrorBudget::AtMost(max) => write!(f, "at most {}", max),
        }
    }
}

/// Accumulates recoverable failures and the optional fatal error of a fetch.
#[derive(Debug, Default)]
pub struct FailureAggregator {
    budget: ErrorBudget,
    failures: Vec<RecoverableFailure>,
    fatal: Option<AppError>,
}

impl FailureAggregator {
    pub fn new(budget: ErrorBudget) -> Self {
        Self {
            budget,
            failures: Vec::new(),
            fatal: None,
        }
    }

    /// Records one item's failure. Returns `false` when the fetch should
    /// stop: either it was already aborted, or this failure blew the budget.
    pub fn record(&mut self, failure: RecoverableFailure) -> bool {
        log::info!("recoverable error: {}", failure);
        self.failures.push(failure);

        if self.fatal.is_some() {
            return false;
        }

        if self.budget.is_exceeded_by(self.failures.len()) {
            self.abort(AppError::ErrorBudgetExceeded {
                failures: self.failures.len(),
                budget: self.budget.to_string(),
            });
            return false;
        }

        true
    }

    /// Marks the fetch as fatally failed. Only the first fatal error is
    /// kept; later ones are logged and dropped.
    pub fn abort(&mut self, err: AppError) {
        match self.fatal {
            None => {
                log::error!("fetch aborted: {}", err);
                self.fatal = Some(err);
            }
            Some(ref first) => {
                log::warn!("ignoring fatal error after abort ({}): {}", first, err);
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn should_continue(&self) -> bool {
        !self.is_aborted()
    }

    pub fn verdict(&self) -> FetchVerdict {
        if self.fatal.is_some() {
            FetchVerdict::Fatal
        } else if self.failures.is_empty() {
            FetchVerdict::Clean
        } else {
            FetchVerdict::Partial
        }
    }

    /// Recorded failures, in the order they were discovered.
    pub fn failures(&self) -> &[RecoverableFailure] {
        &self.failures
    }

    pub fn fatal(&self) -> Option<&AppError> {
        self.fatal.as_ref()
    }

    /// Consumes the aggregator, yielding the failures and the fatal error.
    pub fn into_parts(self) -> (FetchVerdict, Vec<RecoverableFailure>, Option<AppError>) {
        let verdict = self.verdict();
        (verdict, self.failures, self.fatal)
    }
}
