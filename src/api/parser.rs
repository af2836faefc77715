// src/api/parser.rs
//! Parsing of Graph responses into pages, objects and typed errors.

use super::client::ApiResponse;
use super::responses::{ODataCollection, ODataError};
use super::types::{Page, PageCursor, RawItem};
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, GraphErrorCode};

/// Shortens a body for inclusion in an error message.
pub(crate) fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let cut: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

/// Turns a non-success response into a typed service error.
pub fn parse_error(result: &ApiResponse<String>) -> AppError {
    let status = result.status.as_u16();

    match serde_json::from_str::<ODataError>(&result.data) {
        Ok(odata) => AppError::GraphService {
            code: GraphErrorCode::resolve(status, Some(&odata.error.code)),
            message: odata.error.message,
            status,
            retry_after: result.retry_after,
        },
        Err(_) => AppError::GraphService {
            code: GraphErrorCode::from_http_status(status),
            message: format!("HTTP {} from {}: {}", status, result.url, preview(&result.data)),
            status,
            retry_after: result.retry_after,
        },
    }
}

/// Parses one page of a collection.
pub fn parse_collection_page(result: ApiResponse<String>) -> Result<Page<RawItem>, AppError> {
    if !result.status.is_success() {
        return Err(parse_error(&result));
    }

    let collection: ODataCollection = serde_json::from_str(&result.data).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", result.url, e);
        AppError::MalformedResponse(format!("{} (body: {})", e, preview(&result.data)))
    })?;

    Ok(Page::new(
        collection.value.into_iter().map(RawItem::new).collect(),
        collection
            .next_link
            .filter(|link| !link.is_empty())
            .map(PageCursor::new),
    ))
}

/// Parses a single object.
pub fn parse_object(result: ApiResponse<String>) -> Result<RawItem, AppError> {
    if !result.status.is_success() {
        return Err(parse_error(&result));
    }

    let value: serde_json::Value = serde_json::from_str(&result.data)?;
    Ok(RawItem::new(value))
}
