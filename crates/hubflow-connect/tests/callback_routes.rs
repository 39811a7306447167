//! Integration tests for the connection routes.
//!
//! The identity provider and the marketplace token endpoint are served by a
//! local mock server; credentials land in the in-memory store.
//!
//! Run with: cargo test --package hubflow-connect --test callback_routes

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use hubflow_connect::{
    AdminCredentialStore, AuthorizationInitiator, ConnectSettings, ConnectState,
    MemoryCredentialStore, MercadoLivreClient, StoreError, SupabaseIdentityResolver,
    create_router,
};
use hubflow_core::{CredentialRecord, MarketplaceCredentials, UserId};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_COOKIE: &str = "sb-access-token=sess-1";

/// Always refuses writes.
struct FailingStore;

#[async_trait]
impl AdminCredentialStore for FailingStore {
    async fn upsert(
        &self,
        _user_id: &UserId,
        _credentials: &MarketplaceCredentials,
    ) -> Result<(), StoreError> {
        Err(StoreError::Rejected {
            status: 500,
            payload: "relation \"profiles\" does not exist".to_string(),
        })
    }

    async fn get(&self, _user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(None)
    }

    async fn delete(&self, _user_id: &UserId) -> Result<bool, StoreError> {
        Ok(false)
    }
}

fn app(server: &MockServer, store: Arc<dyn AdminCredentialStore>) -> Router {
    let http = Client::new();
    let initiator = AuthorizationInitiator::new(
        "https://auth.mercadolivre.com.br/authorization",
        "app-123",
        "https://hub.example.com/api/ml/callback",
    )
    .unwrap();
    let identity = SupabaseIdentityResolver::new(
        http.clone(),
        &server.uri(),
        SecretString::new("anon-key".to_string()),
    );
    let tokens = MercadoLivreClient::new(
        http,
        format!("{}/oauth/token", server.uri()),
        "app-123",
        SecretString::new("shh".to_string()),
        "https://hub.example.com/api/ml/callback",
    );
    let state = ConnectState::new(
        initiator,
        Arc::new(identity),
        Arc::new(tokens),
        store,
        ConnectSettings::default(),
    );
    create_router(state)
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("authorization", "Bearer sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "seller@example.com"
        })))
        .mount(server)
        .await;
}

async fn mount_code(server: &MockServer, code: &str, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 21600,
            "scope": "offline_access read write",
            "user_id": "MLU1",
            "refresh_token": refresh
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn send(app: &Router, method: Method, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Test that the connect route redirects to the consent screen.
#[tokio::test]
async fn test_connect_redirects_to_provider() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryCredentialStore::new()));

    let response = send(&app, Method::GET, "/api/ml/connect", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "https://auth.mercadolivre.com.br/authorization?response_type=code&client_id=app-123\
         &redirect_uri=https%3A%2F%2Fhub.example.com%2Fapi%2Fml%2Fcallback"
    );
}

/// Test the full callback: session resolved, code exchanged, tokens stored.
#[tokio::test]
async fn test_callback_links_account() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_code(&server, "AUTH123", "AT1", "RT1").await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    let response = send(
        &app,
        Method::GET,
        "/api/ml/callback?code=AUTH123",
        Some(SESSION_COOKIE),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/dashboard?ml_connected=true");

    let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
    assert_eq!(
        record.credentials,
        MarketplaceCredentials::new("AT1", "RT1", "MLU1")
    );
    assert_eq!(store.len(), 1);
}

/// Test that a missing code never reaches the provider.
#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    for uri in [
        "/api/ml/callback",
        "/api/ml/callback?code=",
        "/api/ml/callback?error=access_denied",
    ] {
        let response = send(&app, Method::GET, uri, Some(SESSION_COOKIE)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Invalid or missing authorization code."
        );
    }
    assert!(store.is_empty());
}

/// Test that an anonymous callback is refused before the exchange.
#[tokio::test]
async fn test_callback_without_session_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    let response = send(&app, Method::GET, "/api/ml/callback?code=AUTH123", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Session the identity provider does not recognise.
    let response = send(
        &app,
        Method::GET,
        "/api/ml/callback?code=AUTH123",
        Some("sb-access-token=forged"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_text(response).await,
        "Could not identify the user. Please sign in again."
    );
    assert!(store.is_empty());
}

/// Test that a rejected code ends on the failure redirect without a write.
#[tokio::test]
async fn test_callback_rejected_code_redirects_with_error() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "message": "Error validating grant. Your authorization code or refresh token may be expired or it was already used"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    let response = send(
        &app,
        Method::GET,
        "/api/ml/callback?code=USED",
        Some(SESSION_COOKIE),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/dashboard?ml_error=true");
    assert!(!body_text(response).await.contains("invalid_grant"));
    assert!(store.is_empty());
}

/// Test that a store failure ends on the failure redirect.
#[tokio::test]
async fn test_callback_store_failure_redirects_with_error() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_code(&server, "AUTH123", "AT1", "RT1").await;
    let app = app(&server, Arc::new(FailingStore));

    let response = send(
        &app,
        Method::GET,
        "/api/ml/callback?code=AUTH123",
        Some(SESSION_COOKIE),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/dashboard?ml_error=true");
}

/// Test that reconnecting overwrites the previous token set.
#[tokio::test]
async fn test_reconnect_overwrites_record() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_code(&server, "FIRST", "AT1", "RT1").await;
    mount_code(&server, "SECOND", "AT2", "RT2").await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    for code in ["FIRST", "SECOND"] {
        let uri = format!("/api/ml/callback?code={code}");
        let response = send(&app, Method::GET, &uri, Some(SESSION_COOKIE)).await;
        assert_eq!(location(&response), "/dashboard?ml_connected=true");
    }

    assert_eq!(store.len(), 1);
    let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
    assert_eq!(
        record.credentials,
        MarketplaceCredentials::new("AT2", "RT2", "MLU1")
    );
}

/// Test status, refresh and disconnect after linking.
#[tokio::test]
async fn test_account_lifecycle() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_code(&server, "AUTH123", "AT1", "RT1").await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT2",
            "expires_in": 21600,
            "user_id": "MLU1",
            "refresh_token": "RT2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let app = app(&server, store.clone());

    let response = send(&app, Method::GET, "/api/ml/status", Some(SESSION_COOKIE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(status["connected"], json!(false));

    send(
        &app,
        Method::GET,
        "/api/ml/callback?code=AUTH123",
        Some(SESSION_COOKIE),
    )
    .await;

    let response = send(&app, Method::GET, "/api/ml/status", Some(SESSION_COOKIE)).await;
    let body = body_text(response).await;
    assert!(!body.contains("AT1"));
    let status: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["connected"], json!(true));
    assert_eq!(status["external_account_id"], json!("MLU1"));

    let response = send(&app, Method::POST, "/api/ml/refresh", Some(SESSION_COOKIE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
    assert_eq!(
        record.credentials,
        MarketplaceCredentials::new("AT2", "RT2", "MLU1")
    );

    let response = send(&app, Method::POST, "/api/ml/disconnect", Some(SESSION_COOKIE)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.is_empty());

    let response = send(&app, Method::POST, "/api/ml/refresh", Some(SESSION_COOKIE)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test that account routes require a session.
#[tokio::test]
async fn test_account_routes_require_session() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryCredentialStore::new()));

    for (method, uri) in [
        (Method::GET, "/api/ml/status"),
        (Method::POST, "/api/ml/disconnect"),
        (Method::POST, "/api/ml/refresh"),
    ] {
        let response = send(&app, method, uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
