// tests/graph_source.rs
//! The live Graph page source against a mock Graph service.

use std::sync::Arc;
use std::time::Duration;

use pagewalk::{
    AppError, CollectionFetcher, Credentials, FetchOptions, FetchVerdict, GraphEndpoints,
    GraphErrorCode, GraphHttpClient, GraphPageSource, GraphSession, ResourceQuery, RetryPolicy,
    SkipReason, Sites, Users,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer) -> GraphEndpoints {
    let root = Url::parse(&server.uri()).unwrap();
    GraphEndpoints::new(root.clone(), root)
}

async fn session(server: &MockServer, credentials: Credentials) -> Arc<GraphSession> {
    let http = GraphHttpClient::with_timeout(Duration::from_secs(5)).unwrap();
    Arc::new(
        GraphSession::issue(http, credentials, endpoints(server))
            .await
            .unwrap(),
    )
}

async fn token_session(server: &MockServer) -> Arc<GraphSession> {
    session(server, Credentials::AccessToken("test-token".to_string())).await
}

fn fetcher() -> CollectionFetcher {
    CollectionFetcher::new(
        FetchOptions::default().with_retry(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            jitter: false,
        }),
        CancellationToken::new(),
    )
}

fn odata_error(code: &str, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}

fn user(id: &str) -> Value {
    json!({"id": id, "userPrincipalName": format!("{}@contoso.com", id)})
}

#[tokio::test]
async fn test_users_walk_follows_next_link_with_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .and(query_param("$count", "true"))
        .and(query_param("$top", "999"))
        .and(query_param("$select", "id,userPrincipalName,displayName,mail"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("ConsistencyLevel", "eventual"))
        .and(header_exists("client-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [user("u1"), user("u2")],
            "@odata.nextLink": format!("{}/v1.0/users?$skiptoken=p2", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .and(query_param("$skiptoken", "p2"))
        .and(header("ConsistencyLevel", "eventual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [user("u3"), {"id": "u4"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::users());
    let fetcher = fetcher();

    let outcome = Users::new(&source, &fetcher).get_all().await;

    let names: Vec<_> = outcome
        .items
        .iter()
        .map(|u| u.principal_name.as_str())
        .collect();
    assert_eq!(names, vec!["u1@contoso.com", "u2@contoso.com", "u3@contoso.com"]);
    assert_eq!(outcome.verdict, FetchVerdict::Partial);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.progress.pages, 2);
}

#[tokio::test]
async fn test_throttled_page_is_retried_after_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/sites"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(odata_error("TooManyRequests", "slow down")),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/sites"))
        .and(query_param("search", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "s1", "webUrl": "https://contoso.sharepoint.com/sites/hr", "displayName": "HR"},
                {"id": "s2", "webUrl": "https://contoso-my.sharepoint.com/personal/bob", "displayName": "Bob"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::sites());
    let fetcher = fetcher();

    let outcome = Sites::new(&source, &fetcher).get_all().await;

    assert_eq!(outcome.verdict, FetchVerdict::Clean);
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].display_name, "HR");
    assert_eq!(outcome.skipped[0].reason, SkipReason::PersonalSite);
}

#[tokio::test]
async fn test_permanent_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(odata_error("Authorization_RequestDenied", "Insufficient privileges")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::users());
    let fetcher = fetcher();

    let outcome = Users::new(&source, &fetcher).get_all().await;

    assert_eq!(outcome.verdict, FetchVerdict::Fatal);
    assert!(outcome.items.is_empty());
    let fatal = outcome.fatal.expect("fatal error");
    assert_eq!(fatal.graph_code(), Some(&GraphErrorCode::AccessDenied));
    assert_eq!(
        fatal.to_string(),
        "Graph API returned an error (access_denied): Insufficient privileges"
    );
}

#[tokio::test]
async fn test_persistent_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::users());
    let fetcher = fetcher();

    let outcome = Users::new(&source, &fetcher).get_all().await;

    assert_eq!(outcome.verdict, FetchVerdict::Fatal);
    assert!(matches!(
        outcome.fatal,
        Some(AppError::GraphService { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_get_site_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/sites/contoso.sharepoint.com,abc,def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "contoso.sharepoint.com,abc,def",
            "webUrl": "https://contoso.sharepoint.com/sites/legal",
            "displayName": "Legal",
            "createdDateTime": "2020-01-02T03:04:05Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::new(session);
    let fetcher = fetcher();

    let site = Sites::new(&source, &fetcher)
        .get_by_id("contoso.sharepoint.com,abc,def")
        .await
        .unwrap();

    assert_eq!(site.display_name, "Legal");
    assert!(site.created.is_some());
}

#[tokio::test]
async fn test_get_missing_user_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users/nobody"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(odata_error("Request_ResourceNotFound", "Resource 'nobody' does not exist")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = token_session(&server).await;
    let source = GraphPageSource::new(session);
    let fetcher = fetcher();

    let err = Users::new(&source, &fetcher)
        .get_by_id("nobody")
        .await
        .unwrap_err();

    assert!(err.graph_code().is_some_and(|code| code.is_not_found()));
}

#[tokio::test]
async fn test_client_credentials_token_is_used() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "minted-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .and(header("authorization", "Bearer minted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [user("u1")]})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::ClientSecret {
        tenant_id: "contoso".to_string(),
        client_id: "app".to_string(),
        client_secret: "secret".to_string(),
    };
    let session = session(&server, credentials).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::users());
    let fetcher = fetcher();

    let outcome = Users::new(&source, &fetcher).get_all().await;
    assert_eq!(outcome.verdict, FetchVerdict::Clean);
    assert_eq!(outcome.items.len(), 1);
}

#[tokio::test]
async fn test_rejected_credentials_fail_at_issue() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let credentials = Credentials::ClientSecret {
        tenant_id: "contoso".to_string(),
        client_id: "app".to_string(),
        client_secret: "wrong".to_string(),
    };
    let http = GraphHttpClient::new().unwrap();
    let err = GraphSession::issue(http, credentials, endpoints(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Authentication(_)));
}

#[tokio::test]
async fn test_token_refresh_outage_is_retried() {
    let server = MockServer::start().await;

    // Inside the refresh grace period, so the first page request refreshes.
    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "stale-token",
            "expires_in": 60
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("temporarily unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [user("u1")]})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::ClientSecret {
        tenant_id: "contoso".to_string(),
        client_id: "app".to_string(),
        client_secret: "secret".to_string(),
    };
    let session = session(&server, credentials).await;
    let source = GraphPageSource::for_query(session, &ResourceQuery::users());
    let fetcher = fetcher();

    let outcome = Users::new(&source, &fetcher).get_all().await;

    assert_eq!(outcome.verdict, FetchVerdict::Clean);
    assert_eq!(outcome.items.len(), 1);
}
