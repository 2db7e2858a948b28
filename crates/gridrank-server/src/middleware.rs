use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use gridrank_provider::RequestBudget;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const API_KEYS_VAR: &str = "GRIDRANK_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth settings used by middleware.
///
/// Only SHA-256 digests of the configured keys are held in memory.
#[derive(Debug, Clone)]
pub struct AuthState {
    key_hashes: Arc<Vec<[u8; 32]>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `GRIDRANK_API_KEYS` (comma-separated bearer tokens).
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_raw(&raw, is_development)
    }

    pub fn from_raw(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut key_hashes: Vec<[u8; 32]> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(hash_key)
            .collect();
        key_hashes.sort_unstable();
        key_hashes.dedup();

        if key_hashes.is_empty() {
            if is_development {
                tracing::warn!(
                    "{API_KEYS_VAR} not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    key_hashes: Arc::new(Vec::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            key_hashes: Arc::new(key_hashes),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        let candidate = hash_key(token);
        self.key_hashes
            .iter()
            .fold(subtle::Choice::from(0), |found, key| {
                found | key[..].ct_eq(&candidate[..])
            })
            .into()
    }
}

fn hash_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Inbound request limit for the protected routes.
///
/// Uses the same fixed window as the provider budget, but refuses requests
/// over the limit instead of queueing them.
#[derive(Debug, Clone)]
pub struct RateLimitState(RequestBudget);

impl RateLimitState {
    /// `max_requests == 0` disables the limit.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self(RequestBudget::new(max_requests, window))
    }
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    error: Rejection,
}

#[derive(Debug, Serialize)]
struct Rejection {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(RejectionBody {
            error: Rejection { code, message },
        }),
    )
        .into_response()
}

/// Tags each request with a [`RequestId`].
///
/// A caller-supplied `x-request-id` is kept; otherwise a `UUIDv4` is minted.
/// The id is echoed on the response header.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Rejects requests without an accepted bearer token, unless auth is off.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = !auth.enabled
        || bearer_token(req.headers().get(AUTHORIZATION)).is_some_and(|t| auth.allows(t));
    if !authorized {
        return reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        );
    }
    next.run(req).await
}

/// Answers 429 once the current window's budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if !limit.0.try_acquire().await {
        tracing::debug!(path = %req.uri().path(), "request rate limited");
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }
    next.run(req).await
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let token = value?.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
