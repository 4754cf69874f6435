use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tower::ServiceExt;

use token_gate::app;
use token_gate::services::auth::{
    IdentityProvider, RejectReason, TokenVerifier, VerifiedClaims, VerifyError,
    jwt_provider::{JwtIdentityProvider, KeyMaterial},
};
use token_gate::state::AppState;

/// Accepts "abc123" as user-42, "expired" fails as expired, "down" as an outage.
struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedClaims, VerifyError> {
        match token {
            "abc123" => Ok(VerifiedClaims {
                subject: "user-42".to_string(),
                issuer: "https://issuer.example.com".to_string(),
                audience: vec!["demo".to_string()],
                expires_at: Utc::now() + Duration::hours(1),
                issued_at: None,
                auth_time: None,
                email: Some("user42@example.com".to_string()),
                email_verified: true,
                name: Some("User 42".to_string()),
                picture: None,
                custom: Default::default(),
            }),
            "expired" => Err(VerifyError::rejected(RejectReason::Expired)),
            "down" => Err(VerifyError::unavailable("connection refused")),
            _ => Err(VerifyError::rejected(RejectReason::BadSignature)),
        }
    }
}

fn stub_app() -> axum::Router {
    let verifier = Arc::new(TokenVerifier::new(Arc::new(StubProvider)));
    app::router(AppState::new(verifier))
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let resp = stub_app()
        .oneshot(get("/api/v1/health", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
}

#[tokio::test]
async fn me_requires_authorization_header() {
    let resp = stub_app().oneshot(get("/api/v1/me", None)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    assert_eq!(json_body(resp).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn me_returns_verified_principal() {
    let resp = stub_app()
        .oneshot(get("/api/v1/me", Some("Bearer abc123")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["uid"], "user-42");
    assert_eq!(json["issuer"], "https://issuer.example.com");
    assert_eq!(json["email"], "user42@example.com");
    assert_eq!(json["email_verified"], true);
}

#[tokio::test]
async fn scheme_prefix_is_optional() {
    let resp = stub_app()
        .oneshot(get("/api/v1/me", Some("abc123")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["uid"], "user-42");
}

#[tokio::test]
async fn rejected_tokens_get_401() {
    for value in ["Bearer expired", "Bearer forged", "Bearer "] {
        let resp = stub_app()
            .oneshot(get("/api/v1/me", Some(value)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{value}");
    }
}

#[tokio::test]
async fn provider_outage_gets_503() {
    let resp = stub_app()
        .oneshot(get("/api/v1/me", Some("Bearer down")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(resp).await["error"]["code"], "IDP_UNAVAILABLE");
}

#[tokio::test]
async fn unknown_route_is_404_not_401() {
    let resp = stub_app()
        .oneshot(get("/api/v1/nope", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn jwt_provider_end_to_end() {
    let secret = b"integration-test-secret-0123456789";
    let provider = JwtIdentityProvider::new(
        Algorithm::HS256,
        &KeyMaterial::Secret(secret.to_vec()),
        "https://securetoken.google.com/demo",
        "demo",
        0,
    )
    .unwrap();
    let verifier = Arc::new(TokenVerifier::new(Arc::new(provider)));
    let router = app::router(AppState::new(verifier));

    let now = Utc::now().timestamp();
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "iss": "https://securetoken.google.com/demo",
            "aud": "demo",
            "sub": "firebase-uid-1",
            "iat": now,
            "exp": now + 600
        }),
        &EncodingKey::from_secret(secret),
    )
    .unwrap();

    let resp = router
        .oneshot(get("/api/v1/me", Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["uid"], "firebase-uid-1");
}
