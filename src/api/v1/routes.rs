/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は公開、/me は Bearer 必須
 * - Bearer が必要な範囲は route_layer で適用する (未定義パスは 404 のまま)
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{health::health, me::me};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health));

    let protected = access::apply(Router::new().route("/me", get(me)), state);

    public.merge(protected)
}
