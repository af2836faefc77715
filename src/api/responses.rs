// src/api/responses.rs
//! Wire shapes of Graph responses.

use serde::Deserialize;
use serde_json::Value;

/// A page of a Graph collection.
///
/// Items are kept as raw JSON: classifying them is the validators' job, and
/// one malformed element must not fail the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataCollection {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// `OData` error response from Graph.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Token endpoint response for the client-credentials grant.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}
