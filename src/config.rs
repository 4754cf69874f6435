/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, identity provider, timeouts など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::services::auth::jwt_provider::KeyMaterial;
use crate::services::auth::token_verifier::DEFAULT_SCHEME_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which identity provider verifies tokens.
#[derive(Debug, Clone)]
pub enum IdpConfig {
    /// Verify locally with `jsonwebtoken` and configured key material.
    Jwt {
        algorithm: Algorithm,
        key: KeyMaterial,
        issuer: String,
        audience: String,
        leeway_seconds: u64,
    },
    /// Ask an external verification endpoint.
    Remote {
        verify_url: Url,
        expected_audience: Option<String>,
    },
}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_scheme_prefix: String,
    pub idp: IdpConfig,
    pub idp_timeout: Duration,

    pub http_request_timeout: Duration,
    pub http_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (env vars in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        // Not trimmed: the trailing space is part of the prefix.
        let auth_scheme_prefix =
            lookup("AUTH_SCHEME_PREFIX").unwrap_or_else(|| DEFAULT_SCHEME_PREFIX.to_string());
        if auth_scheme_prefix.is_empty() {
            return Err(ConfigError::Invalid("AUTH_SCHEME_PREFIX"));
        }

        let idp = match lookup("IDP_MODE")
            .unwrap_or_else(|| "jwt".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "jwt" => jwt_idp(&lookup)?,
            "remote" => remote_idp(&lookup)?,
            _ => return Err(ConfigError::Invalid("IDP_MODE")),
        };

        let idp_timeout = match lookup("IDP_TIMEOUT_MS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::Invalid("IDP_TIMEOUT_MS"))?,
            None => Duration::from_millis(5000),
        };

        let http_request_timeout = match lookup("HTTP_REQUEST_TIMEOUT_SECONDS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid("HTTP_REQUEST_TIMEOUT_SECONDS"))?,
            None => Duration::from_secs(30),
        };

        // A slow provider must surface as 503 from the verifier, not 408 from the HTTP layer.
        if http_request_timeout <= idp_timeout {
            return Err(ConfigError::Invalid("HTTP_REQUEST_TIMEOUT_SECONDS"));
        }

        let http_body_limit_bytes = lookup("HTTP_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            auth_scheme_prefix,
            idp,
            idp_timeout,
            http_request_timeout,
            http_body_limit_bytes,
        })
    }
}

fn jwt_idp<F>(lookup: &F) -> Result<IdpConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let issuer = lookup("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
    let audience = lookup("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

    let algorithm = match lookup("ID_TOKEN_ALGORITHM") {
        Some(v) => Algorithm::from_str(v.trim())
            .map_err(|_| ConfigError::Invalid("ID_TOKEN_ALGORITHM"))?,
        None => Algorithm::RS256,
    };

    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            let secret = lookup("ID_TOKEN_HMAC_SECRET")
                .ok_or(ConfigError::Missing("ID_TOKEN_HMAC_SECRET"))?;
            KeyMaterial::Secret(secret.into_bytes())
        }
        _ => {
            let pem = lookup("ID_TOKEN_PUBLIC_KEY_PEM")
                .ok_or(ConfigError::Missing("ID_TOKEN_PUBLIC_KEY_PEM"))?
                .replace("\\n", "\n");
            KeyMaterial::PublicPem(pem)
        }
    };

    let leeway_seconds = lookup("ID_TOKEN_LEEWAY_SECONDS")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);

    Ok(IdpConfig::Jwt {
        algorithm,
        key,
        issuer,
        audience,
        leeway_seconds,
    })
}

fn remote_idp<F>(lookup: &F) -> Result<IdpConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let verify_url = lookup("IDP_VERIFY_URL").ok_or(ConfigError::Missing("IDP_VERIFY_URL"))?;
    let verify_url = Url::parse(&verify_url).map_err(|_| ConfigError::Invalid("IDP_VERIFY_URL"))?;
    if !matches!(verify_url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid("IDP_VERIFY_URL"));
    }

    let expected_audience = lookup("AUTH_AUDIENCE").filter(|s| !s.trim().is_empty());

    Ok(IdpConfig::Remote {
        verify_url,
        expected_audience,
    })
}
