// src/api/session.rs
//! Authenticated access to one Graph tenant.
//!
//! A [`GraphSession`] owns the HTTP client, the endpoints and the bearer
//! token. Tokens obtained through the client-credentials grant are cached
//! and re-acquired shortly before they expire, so long walks keep working.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use url::Url;

use super::client::{parse_retry_after, GraphHttpClient};
use super::parser::preview;
use super::responses::TokenResponse;
use crate::constants::{GRAPH_API_VERSION, GRAPH_ENDPOINT, LOGIN_ENDPOINT};
use crate::error::{AppError, GraphErrorCode};

/// Refresh tokens this long before the service says they expire.
const TOKEN_GRACE_PERIOD_MINUTES: i64 = 5;

/// How the session authenticates.
#[derive(Clone)]
pub enum Credentials {
    /// A token issued elsewhere, used as-is.
    AccessToken(String),
    /// An app registration using the client-credentials grant.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(***)"),
            Self::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Service roots for one national cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEndpoints {
    pub graph: Url,
    pub login: Url,
}

impl GraphEndpoints {
    pub fn new(graph: Url, login: Url) -> Self {
        Self { graph, login }
    }

    /// The worldwide commercial cloud.
    pub fn public_cloud() -> Result<Self, AppError> {
        Ok(Self::new(
            Url::parse(GRAPH_ENDPOINT)?,
            Url::parse(LOGIN_ENDPOINT)?,
        ))
    }

    /// The versioned API root, e.g. `https://graph.microsoft.com/v1.0/`.
    pub fn api_base(&self) -> Result<Url, AppError> {
        Ok(self.graph.join(&format!("{}/", GRAPH_API_VERSION))?)
    }

    fn token_url(&self, tenant_id: &str) -> Result<Url, AppError> {
        Ok(self
            .login
            .join(&format!("{}/oauth2/v2.0/token", tenant_id))?)
    }

    fn scope(&self) -> String {
        format!("{}/.default", self.graph.as_str().trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// `None` for tokens we did not issue ourselves.
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + grace_period >= expires_at,
            None => false,
        }
    }
}

/// An authenticated connection to Graph, shared by every fetch.
#[derive(Debug)]
pub struct GraphSession {
    http: GraphHttpClient,
    endpoints: GraphEndpoints,
    api_base: Url,
    credentials: Credentials,
    token: RwLock<CachedToken>,
}

impl GraphSession {
    /// Authenticates and returns a ready session.
    ///
    /// With [`Credentials::ClientSecret`] this performs the token exchange
    /// immediately, so bad credentials fail here rather than mid-walk.
    pub async fn issue(
        http: GraphHttpClient,
        credentials: Credentials,
        endpoints: GraphEndpoints,
    ) -> Result<Self, AppError> {
        let token = acquire_token(&http, &credentials, &endpoints).await?;
        let api_base = endpoints.api_base()?;

        Ok(Self {
            http,
            endpoints,
            api_base,
            credentials,
            token: RwLock::new(token),
        })
    }

    pub fn http(&self) -> &GraphHttpClient {
        &self.http
    }

    /// The versioned API root all resource paths are joined to.
    pub fn graph_base(&self) -> &Url {
        &self.api_base
    }

    /// A currently valid bearer token, re-acquired when close to expiry.
    pub async fn bearer_token(&self) -> Result<String, AppError> {
        let grace = Duration::minutes(TOKEN_GRACE_PERIOD_MINUTES);
        {
            let cached = self.token.read().await;
            if !cached.is_expired(grace) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if cached.is_expired(grace) {
            log::debug!("Access token near expiry, refreshing");
            *cached = acquire_token(&self.http, &self.credentials, &self.endpoints).await?;
        }
        Ok(cached.access_token.clone())
    }
}

async fn acquire_token(
    http: &GraphHttpClient,
    credentials: &Credentials,
    endpoints: &GraphEndpoints,
) -> Result<CachedToken, AppError> {
    let (tenant_id, client_id, client_secret) = match credentials {
        Credentials::AccessToken(token) => {
            return Ok(CachedToken {
                access_token: token.clone(),
                expires_at: None,
            })
        }
        Credentials::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => (tenant_id, client_id, client_secret),
    };

    let token_url = endpoints.token_url(tenant_id)?;
    let scope = endpoints.scope();
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("scope", scope.as_str()),
    ];

    let response = http.inner().post(token_url).form(&params).send().await?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(token_request_error(status.as_u16(), &body, retry_after));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::Authentication(format!("unreadable token response: {}", e)))?;

    let expires_at = expiry_after(token.expires_in)?;
    log::debug!(
        "Acquired token for tenant {}, expires at {}",
        tenant_id,
        expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(CachedToken {
        access_token: token.access_token,
        expires_at: Some(expires_at),
    })
}

/// Classifies a failed token request.
///
/// Throttling and service-side failures keep their transport
/// classification so a refresh mid-walk is retried like any page request.
/// Other 4xx answers mean the credentials were rejected.
fn token_request_error(
    status: u16,
    body: &str,
    retry_after: Option<std::time::Duration>,
) -> AppError {
    let code = GraphErrorCode::from_http_status(status);
    if (400..500).contains(&status) && !code.is_retryable() {
        return AppError::Authentication(format!(
            "token request failed with status {}: {}",
            status,
            preview(body)
        ));
    }

    AppError::GraphService {
        code,
        message: format!("token request failed: {}", preview(body)),
        status,
        retry_after,
    }
}

/// The instant a token issued now with lifetime `expires_in` seconds expires.
fn expiry_after(expires_in: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::Authentication(format!(
                "token response has an invalid expires_in: {}",
                expires_in
            ))
        })
}
