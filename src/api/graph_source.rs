// src/api/graph_source.rs
//! [`PageSource`] and [`ObjectSource`] over the live Graph API.

use std::sync::Arc;

use url::Url;

use super::parser::{parse_collection_page, parse_object};
use super::session::GraphSession;
use super::types::{Page, PageCursor, RawItem, ResourceQuery};
use super::{ObjectSource, PageSource};
use crate::directory::ResourceKind;
use crate::error::AppError;

/// Reads Graph collections one page at a time.
///
/// Holds no walk state of its own: the cursor a page hands back is the full
/// `@odata.nextLink` URL, so the same source serves any number of walks.
#[derive(Debug, Clone)]
pub struct GraphPageSource {
    session: Arc<GraphSession>,
    /// Headers to send on follow-up pages, per collection.
    follow_headers: Vec<(&'static str, &'static str)>,
}

impl GraphPageSource {
    pub fn new(session: Arc<GraphSession>) -> Self {
        Self {
            session,
            follow_headers: Vec::new(),
        }
    }

    /// A source that repeats the query's extra headers on every next-page
    /// request. Graph requires `ConsistencyLevel` on each page of an
    /// advanced query, not just the first.
    pub fn for_query(session: Arc<GraphSession>, query: &ResourceQuery) -> Self {
        Self {
            session,
            follow_headers: query.headers.clone(),
        }
    }

    pub fn session(&self) -> &GraphSession {
        &self.session
    }

    /// Builds the first-page URL for a query.
    pub fn collection_url(&self, query: &ResourceQuery) -> Result<Url, AppError> {
        let mut url = self
            .session
            .graph_base()
            .join(query.kind.collection_path())?;
        url.query_pairs_mut()
            .extend_pairs(query.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, &'static str)],
    ) -> Result<super::client::ApiResponse<String>, AppError> {
        let bearer = self.session.bearer_token().await?;
        self.session.http().get(url, &bearer, headers).await
    }
}

#[async_trait::async_trait]
impl PageSource for GraphPageSource {
    async fn first_page(&self, query: &ResourceQuery) -> Result<Page<RawItem>, AppError> {
        let url = self.collection_url(query)?;
        let response = self.get(url.as_str(), &query.headers).await?;
        parse_collection_page(response)
    }

    async fn next_page(&self, cursor: &PageCursor) -> Result<Page<RawItem>, AppError> {
        let response = self.get(cursor.as_str(), &self.follow_headers).await?;
        parse_collection_page(response)
    }
}

#[async_trait::async_trait]
impl ObjectSource for GraphPageSource {
    async fn get_object(&self, kind: ResourceKind, id: &str) -> Result<RawItem, AppError> {
        let mut url = self.session.graph_base().join(kind.collection_path())?;
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidConfiguration("graph endpoint cannot be a base".into()))?
            .push(id);

        let response = self.get(url.as_str(), &[]).await?;
        parse_object(response)
    }
}
