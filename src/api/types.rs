// src/api/types.rs
//! Type definitions for the paging layer.
//!
//! A walk only ever sees these types: pages of raw items, the cursor that
//! links them, and the query that starts the chain.

use serde_json::Value;
use std::fmt;

use crate::constants::{USERS_MAX_PAGE_SIZE, USER_FILTER_NO_GUESTS};
use crate::directory::ResourceKind;

// --- Page Types ---

/// Opaque continuation token naming the next page of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One batch of results plus the cursor to the next batch, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<PageCursor>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// A weakly typed element of a page, exactly as the service returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem(Value);

impl RawItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// A string field, treating JSON `null`, absence and `""` alike.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The `@odata.type` annotation, when the service included one.
    pub fn odata_type(&self) -> Option<&str> {
        self.str_field("@odata.type")
    }

    /// The `id` field, for labelling failures.
    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    /// A short description of the JSON shape, for type-mismatch reports.
    pub fn shape(&self) -> &'static str {
        match &self.0 {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<Value> for RawItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// --- Query Types ---

/// Everything needed to request the first page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuery {
    pub kind: ResourceKind,
    pub select: Vec<&'static str>,
    pub filter: Option<String>,
    pub search: Option<String>,
    pub count: bool,
    pub top: Option<u32>,
    /// Extra request headers, e.g. `ConsistencyLevel: eventual`.
    pub headers: Vec<(&'static str, &'static str)>,
}

impl ResourceQuery {
    /// All member (non-guest) users, including on-prem synced accounts.
    pub fn users() -> Self {
        Self {
            kind: ResourceKind::User,
            select: vec!["id", "userPrincipalName", "displayName", "mail"],
            filter: Some(USER_FILTER_NO_GUESTS.to_string()),
            search: None,
            count: true,
            top: Some(USERS_MAX_PAGE_SIZE),
            headers: vec![("ConsistencyLevel", "eventual")],
        }
    }

    /// Every site visible to the session.
    pub fn sites() -> Self {
        Self {
            kind: ResourceKind::Site,
            select: vec!["id", "webUrl", "displayName", "name", "createdDateTime"],
            filter: None,
            search: Some("*".to_string()),
            count: false,
            top: None,
            headers: Vec::new(),
        }
    }

    pub fn with_top(self, top: Option<u32>) -> Self {
        Self {
            top: top.or(self.top),
            ..self
        }
    }

    /// The OData query parameters, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if !self.select.is_empty() {
            pairs.push(("$select", self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("$filter", filter.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if self.count {
            pairs.push(("$count", "true".to_string()));
        }
        if let Some(top) = self.top {
            pairs.push(("$top", top.to_string()));
        }

        pairs
    }
}
