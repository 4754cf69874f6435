/*
 * Responsibility
 * - GET /me: 検証済み主体 (Principal) をそのまま返す
 */
use axum::Json;

use crate::api::v1::{dto::me::MeResponse, extractors::PrincipalExtractor};

pub async fn me(PrincipalExtractor(principal): PrincipalExtractor) -> Json<MeResponse> {
    Json(MeResponse::from(principal))
}
