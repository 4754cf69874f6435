/*
 * Responsibility
 * - GET /me の response DTO
 */
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::v1::extractors::Principal;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub uid: String,
    pub issuer: String,
    pub expires_at: DateTime<Utc>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
}

impl From<Principal> for MeResponse {
    fn from(p: Principal) -> Self {
        Self {
            uid: p.id,
            issuer: p.claims.issuer,
            expires_at: p.claims.expires_at,
            email: p.claims.email,
            email_verified: p.claims.email_verified,
            name: p.claims.name,
        }
    }
}
