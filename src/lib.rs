// src/lib.rs
//! pagewalk library: resilient enumeration of paginated Microsoft Graph
//! collections into validated, typed records.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `GraphErrorCode`, `ValidationError`
//! - **Configuration**: `FetchConfig`, `CommandLineInput`
//! - **Retry**: `RetryPolicy`, `Retryable`, `retry_with_backoff`
//! - **Paging**: `PageSource`, `Page`, `PageCursor`, `RawItem`, `walk_pages`
//! - **Validation**: `ItemValidator`, `Validation`, `SkipReason`
//! - **Fault accounting**: `FailureAggregator`, `ErrorBudget`, `FetchVerdict`
//! - **Fetching**: `CollectionFetcher`, `FetchOutcome`, `Users`, `Sites`

pub mod api;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod fault;
pub mod fetcher;
pub mod resources;
pub mod retry;
pub mod types;
pub mod validate;

// --- Error Handling ---
pub use crate::error::{AppError, GraphErrorCode, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, FetchConfig};

// --- Domain Model ---
pub use crate::directory::{IdNameLookup, ResourceKind, Site, User};
pub use crate::types::{Id, SiteId, UserId};

// --- Retry ---
pub use crate::retry::{retry_with_backoff, RetryPolicy, Retryable};

// --- Paging ---
pub use crate::api::pagination::{walk_pages, WalkError, WalkOptions, WalkProgress, WalkState};
pub use crate::api::{
    Credentials, GraphEndpoints, GraphHttpClient, GraphPageSource, GraphSession, ObjectSource,
    Page, PageCursor, PageSource, RawItem, ResourceQuery,
};

// --- Validation ---
pub use crate::validate::{ItemValidator, SiteValidator, SkipReason, UserValidator, Validation};

// --- Fault Accounting ---
pub use crate::fault::{ErrorBudget, FailureAggregator, FetchVerdict, ItemProblem, RecoverableFailure};

// --- Fetching ---
pub use crate::fetcher::{CollectionFetcher, FetchOptions, FetchOutcome, FetchSummary, SkippedItem};
pub use crate::resources::{Sites, Users};
