// src/api/pagination.rs
//! Cursor-driven walk over a paginated collection.
//!
//! The walk is a sequence of explicit state transitions: `Start` fetches the
//! first page, `Next(cursor)` fetches the page a cursor names, and
//! `Exhausted` ends the walk. Every page fetch goes through the retry policy
//! as a whole, so a retried page replaces, never extends, the items it
//! would have delivered.

use std::ops::ControlFlow;

use tokio_util::sync::CancellationToken;

use super::types::{Page, PageCursor, RawItem, ResourceQuery};
use super::PageSource;
use crate::error::AppError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Where the walk stands between page fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkState {
    Start,
    Next(PageCursor),
    Exhausted,
}

impl WalkState {
    /// The state that follows a successfully consumed page.
    pub fn after(page_cursor: Option<PageCursor>) -> Self {
        match page_cursor {
            Some(cursor) => WalkState::Next(cursor),
            None => WalkState::Exhausted,
        }
    }
}

/// How far a walk got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkProgress {
    /// Pages fetched and fully or partially delivered.
    pub pages: u32,
    /// Items handed to the callback.
    pub items: usize,
    /// The callback asked to stop.
    pub stopped_early: bool,
    /// The `max_pages` limit ended the walk before the server did.
    pub truncated: bool,
}

/// A page fetch that failed for good, with the progress made before it.
#[derive(Debug)]
pub struct WalkError {
    pub error: AppError,
    pub progress: WalkProgress,
}

/// Options that shape one walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub retry: RetryPolicy,
    /// Stop (normally) after this many pages.
    pub max_pages: Option<u32>,
}

/// Fetches the page for `state`, retrying transient failures.
///
/// Returns `Ok(None)` for `Exhausted`.
pub async fn fetch_page<S>(
    source: &S,
    query: &ResourceQuery,
    state: &WalkState,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Option<Page<RawItem>>, AppError>
where
    S: PageSource + ?Sized,
{
    match state {
        WalkState::Start => {
            let label = format!("fetching first {} page", query.kind);
            retry_with_backoff(retry, cancel, &label, || source.first_page(query))
                .await
                .map(Some)
        }
        WalkState::Next(cursor) => {
            let label = format!("fetching next {} page", query.kind);
            retry_with_backoff(retry, cancel, &label, || source.next_page(cursor))
                .await
                .map(Some)
        }
        WalkState::Exhausted => Ok(None),
    }
}

/// Walks the collection, handing every item to `on_item` in server order.
///
/// The walk ends when the server sends no cursor, when `on_item` returns
/// `Break`, or when `max_pages` is reached. A page fetch that fails after
/// retries ends it with a [`WalkError`]; items delivered before that are
/// the caller's to keep.
pub async fn walk_pages<S, F>(
    source: &S,
    query: &ResourceQuery,
    options: &WalkOptions,
    cancel: &CancellationToken,
    mut on_item: F,
) -> Result<WalkProgress, WalkError>
where
    S: PageSource + ?Sized,
    F: FnMut(RawItem) -> ControlFlow<()>,
{
    let mut progress = WalkProgress::default();
    let mut state = WalkState::Start;

    loop {
        if let Some(max) = options.max_pages {
            if progress.pages >= max && state != WalkState::Exhausted {
                log::debug!("Reached maximum page limit: {}", max);
                progress.truncated = true;
                return Ok(progress);
            }
        }

        let page = match fetch_page(source, query, &state, &options.retry, cancel).await {
            Ok(Some(page)) => page,
            Ok(None) => return Ok(progress),
            Err(error) => return Err(WalkError { error, progress }),
        };

        progress.pages += 1;
        log::debug!(
            "{} page {}: {} items (more: {})",
            query.kind,
            progress.pages,
            page.items.len(),
            !page.is_last()
        );

        let Page { items, next_cursor } = page;
        for item in items {
            progress.items += 1;
            if on_item(item).is_break() {
                progress.stopped_early = true;
                return Ok(progress);
            }
        }

        state = WalkState::after(next_cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_after_page() {
        assert_eq!(WalkState::after(None), WalkState::Exhausted);
        assert_eq!(
            WalkState::after(Some(PageCursor::new("c1"))),
            WalkState::Next(PageCursor::new("c1"))
        );
    }

    struct TwoPages;

    #[async_trait::async_trait]
    impl PageSource for TwoPages {
        async fn first_page(&self, _query: &ResourceQuery) -> Result<Page<RawItem>, AppError> {
            Ok(Page::new(
                vec![RawItem::new(json!({"id": "1"})), RawItem::new(json!({"id": "2"}))],
                Some(PageCursor::new("p2")),
            ))
        }

        async fn next_page(&self, cursor: &PageCursor) -> Result<Page<RawItem>, AppError> {
            assert_eq!(cursor.as_str(), "p2");
            Ok(Page::last(vec![RawItem::new(json!({"id": "3"}))]))
        }
    }

    fn ids_of(items: &[RawItem]) -> Vec<String> {
        items.iter().filter_map(|i| i.id().map(String::from)).collect()
    }

    #[tokio::test]
    async fn test_walk_delivers_in_order_across_pages() {
        let mut seen = Vec::new();
        let progress = walk_pages(
            &TwoPages,
            &ResourceQuery::users(),
            &WalkOptions::default(),
            &CancellationToken::new(),
            |item| {
                seen.push(item);
                ControlFlow::Continue(())
            },
        )
        .await
        .unwrap();

        assert_eq!(ids_of(&seen), vec!["1", "2", "3"]);
        assert_eq!(progress.pages, 2);
        assert_eq!(progress.items, 3);
        assert!(!progress.stopped_early);
    }

    #[tokio::test]
    async fn test_break_stops_immediately() {
        let mut seen = Vec::new();
        let progress = walk_pages(
            &TwoPages,
            &ResourceQuery::users(),
            &WalkOptions::default(),
            &CancellationToken::new(),
            |item| {
                seen.push(item);
                ControlFlow::Break(())
            },
        )
        .await
        .unwrap();

        assert_eq!(ids_of(&seen), vec!["1"]);
        assert_eq!(progress.pages, 1);
        assert!(progress.stopped_early);
    }

    #[tokio::test]
    async fn test_max_pages_truncates() {
        let options = WalkOptions {
            max_pages: Some(1),
            ..WalkOptions::default()
        };
        let mut count = 0;
        let progress = walk_pages(
            &TwoPages,
            &ResourceQuery::sites(),
            &options,
            &CancellationToken::new(),
            |_| {
                count += 1;
                ControlFlow::Continue(())
            },
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert!(progress.truncated);
    }
}
