/*
 * Responsibility
 * - Handler から見える「認証済み主体」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - token の検証そのものは services::auth (identity provider) の責務
 * - リクエスト単位でのみ保持し、永続化しない
 */
use crate::services::auth::VerifiedClaims;

/// 認証済みのリクエストに付与される主体
///
/// - `id` は provider が検証した `sub`
/// - `claims` は provider が返したクレーム一式 (issuer / expiry / email など)
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub claims: VerifiedClaims,
}

impl From<VerifiedClaims> for Principal {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            id: claims.subject.clone(),
            claims,
        }
    }
}
