// src/api/mod.rs
//! Directory service interaction: reading paginated collections.
//!
//! This module separates I/O (the HTTP client and session), parsing of wire
//! payloads into pages, and the walk over a cursor-linked page chain.

pub mod client;
pub mod graph_source;
pub mod pagination;
pub mod parser;
mod responses;
pub mod session;
pub mod types;

use crate::directory::ResourceKind;
use crate::error::AppError;

pub use types::{Page, PageCursor, RawItem, ResourceQuery};

/// The ability to read one page of a collection at a time.
///
/// Both calls must be safe to repeat: the walk retries them wholesale on
/// transient failures.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the first page of the collection described by `query`.
    async fn first_page(&self, query: &ResourceQuery) -> Result<Page<RawItem>, AppError>;

    /// Fetches the page a previous page's cursor points at.
    async fn next_page(&self, cursor: &PageCursor) -> Result<Page<RawItem>, AppError>;
}

/// The ability to read a single object by its identifier.
#[async_trait::async_trait]
pub trait ObjectSource: Send + Sync {
    async fn get_object(&self, kind: ResourceKind, id: &str) -> Result<RawItem, AppError>;
}

// Re-export the public interface
pub use client::GraphHttpClient;
pub use graph_source::GraphPageSource;
pub use session::{Credentials, GraphEndpoints, GraphSession};
