use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use tower::ServiceExt;
use url::Url;

use token_gate::app;
use token_gate::config::{AppEnv, Config, IdpConfig};
use token_gate::middleware::http::REQUEST_ID_HEADER;
use token_gate::services::auth::{
    IdentityProvider, RejectReason, TokenVerifier, VerifiedClaims, VerifyError,
};
use token_gate::state::AppState;

/// "slow" never answers in time; "abc123" is user-42.
struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        if token == "slow" {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if token != "abc123" {
            return Err(VerifyError::rejected(RejectReason::BadSignature));
        }

        Ok(VerifiedClaims {
            subject: "user-42".to_string(),
            issuer: "https://issuer.example.com".to_string(),
            audience: vec!["demo".to_string()],
            expires_at: Utc::now() + chrono::Duration::hours(1),
            issued_at: None,
            auth_time: None,
            email: None,
            email_verified: false,
            name: None,
            picture: None,
            custom: Default::default(),
        })
    }
}

fn config(request_timeout: Duration, body_limit: usize) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        app_env: AppEnv::Development,
        auth_scheme_prefix: "Bearer ".to_string(),
        idp: IdpConfig::Remote {
            verify_url: Url::parse("https://idp.example.com/verify").unwrap(),
            expected_audience: None,
        },
        idp_timeout: Duration::from_secs(30),
        http_request_timeout: request_timeout,
        http_body_limit_bytes: body_limit,
    }
}

fn full_app(config: &Config) -> axum::Router {
    let verifier =
        Arc::new(TokenVerifier::new(Arc::new(StubProvider)).with_timeout(config.idp_timeout));
    app::build_router(AppState::new(verifier), config)
}

#[tokio::test]
async fn generates_a_request_id_when_missing() {
    let app = full_app(&config(Duration::from_secs(5), 1024));

    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let id = resp.headers().get(REQUEST_ID_HEADER).unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn propagates_the_callers_request_id() {
    let app = full_app(&config(Duration::from_secs(5), 1024));

    let req = Request::builder()
        .uri("/api/v1/me")
        .header(REQUEST_ID_HEADER, "req-7")
        .header(header::AUTHORIZATION, "Bearer abc123")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[REQUEST_ID_HEADER], "req-7");
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let app = full_app(&config(Duration::from_secs(5), 16));

    let payload = vec![b'x'; 64];
    let req = Request::builder()
        .uri("/api/v1/health")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn request_timeout_maps_to_408() {
    let app = full_app(&config(Duration::from_millis(100), 1024));

    let req = Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, "Bearer slow")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
}
