//! Pass-through caller identity
//!
//! Credentials are read from `Authorization`, `X-API-Key` and `X-Client-ID` but
//! never enforced. They identify the caller for request de-duplication and are
//! remembered per streamable client between `initialize` and stream close.

use std::collections::hash_map::DefaultHasher;
use std::convert::Infallible;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const CLIENT_ID_HEADER: &str = "x-client-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    Bearer,
    Custom,
    ApiKey,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerCredentials {
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub scheme: AuthScheme,
}

impl CallerCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let authorization = header_value(headers, AUTHORIZATION.as_str());
        let api_key = header_value(headers, API_KEY_HEADER);
        let client_id = header_value(headers, CLIENT_ID_HEADER);

        let scheme = if headers.typed_get::<Authorization<Bearer>>().is_some() {
            AuthScheme::Bearer
        } else if authorization.is_some() {
            AuthScheme::Custom
        } else if api_key.is_some() {
            AuthScheme::ApiKey
        } else {
            AuthScheme::Anonymous
        };

        Self {
            authorization,
            api_key,
            client_id,
            scheme,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.scheme == AuthScheme::Anonymous
    }

    /// Stable within one process: `Authorization`, else `X-API-Key`, else empty.
    pub fn caller_hash(&self) -> u64 {
        let identity = self
            .authorization
            .as_deref()
            .or(self.api_key.as_deref())
            .unwrap_or_default();

        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        hasher.finish()
    }

    pub fn client_id_or_generate(&self) -> String {
        self.client_id.clone().unwrap_or_else(generate_client_id)
    }
}

impl<S> FromRequestParts<S> for CallerCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// `client_` followed by 32 lowercase hex digits.
pub fn generate_client_id() -> String {
    format!("client_{}", Uuid::new_v4().simple())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Credentials presented at `initialize`, keyed by streamable client id.
#[derive(Clone, Default)]
pub struct CredentialStore {
    records: Arc<DashMap<String, CallerCredentials>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, client_id: &str, credentials: CallerCredentials) {
        debug!(client_id, scheme = ?credentials.scheme, "caller credentials recorded");
        self.records.insert(client_id.to_string(), credentials);
    }

    pub fn get(&self, client_id: &str) -> Option<CallerCredentials> {
        self.records.get(client_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, client_id: &str) -> bool {
        self.records.remove(client_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
