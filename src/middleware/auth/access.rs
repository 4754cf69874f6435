//! Bearer credential 検証 → Principal を extensions に入れる
//!
//! - `Authorization` ヘッダを取り出し、TokenVerifier (identity provider) に委譲する。
//! - 成功時: provider が返した claims から Principal を作り、request extensions に格納。
//! - 失敗時: 401 (provider が拒否) / 503 (provider に到達できない)。リトライはしない。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// 保護したい Router に認証を掛ける。
///
/// 例：
/// ```ignore
/// let protected = middleware::auth::access::apply(protected_routes(), state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!("missing or non-ascii authorization header");
            AppError::Unauthorized
        })?;

    // scheme prefix の除去と provider への委譲は TokenVerifier 側で実施
    let claims = match state.verifier.authenticate(auth).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                provider = state.verifier.provider_name(),
                error = %err,
                "bearer credential verification failed"
            );
            return Err(err.into());
        }
    };

    let principal = Principal::from(claims);
    tracing::debug!(principal_id = %principal.id, "request authenticated");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
