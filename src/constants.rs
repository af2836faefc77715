// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the engine
//! talks to the directory service: how hard it retries, how long it waits,
//! and which items it knows to leave alone.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Directory service endpoints
// ---------------------------------------------------------------------------

/// Base URL of the Microsoft Graph API (without version segment).
pub const GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

/// The Graph API version every request targets.
pub const GRAPH_API_VERSION: &str = "v1.0";

/// Base URL of the identity platform that issues access tokens.
pub const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Per-request transport timeout.
///
/// A timed-out request is treated as transient and handed to the retry
/// policy, so this bounds a single attempt, not the whole call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Retry boundaries
// ---------------------------------------------------------------------------

/// Total attempts (first try included) for one remote call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry. Subsequent delays double.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Ceiling for any single backoff delay, including server `Retry-After` hints.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(180);

// ---------------------------------------------------------------------------
// Collection boundaries
// ---------------------------------------------------------------------------

/// Largest `$top` the users collection accepts.
pub const USERS_MAX_PAGE_SIZE: u32 = 999;

/// Excludes guest accounts while keeping pre-2014 accounts whose `userType`
/// is null, and on-prem synced accounts. The `ne` operator requires
/// `$count=true` and the `ConsistencyLevel: eventual` header.
pub const USER_FILTER_NO_GUESTS: &str = "onPremisesSyncEnabled eq true OR userType ne 'Guest'";

// ---------------------------------------------------------------------------
// Known skippable items
// ---------------------------------------------------------------------------

/// Path fragment marking a personal (OneDrive) site.
///
/// Personal sites belong to a single user and are never part of the
/// collaborative site collection.
pub const PERSONAL_SITE_PATH: &str = "sharepoint.com/personal/";

/// URL suffix of the built-in tenant search site, which has no display name.
pub const SEARCH_SITE_SUFFIX: &str = "/search";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
