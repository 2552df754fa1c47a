//! Back-office authentication handshake.
//!
//! Exchanges an admin identity and password for a bearer token, looks up the
//! admin's member id, and trades that for the member-scoped token. The result
//! is a plain [`Session`] value; nothing is cached on the authenticator.

use async_trait::async_trait;
use clip_core::error::{ReportError, Result};
use clip_core::session::{Credentials, Session};
use clip_core::settings::Settings;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::http::{anonymous_headers, bearer_headers, build_client};

/// Anything that can turn credentials into a [`Session`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with [`ReportError::AuthFailed`] on rejected credentials or a
    /// malformed response.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session>;
}

// ── HttpAuthenticator ─────────────────────────────────────────────────────────

/// Three-step handshake against the back-office API.
pub struct HttpAuthenticator {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpAuthenticator {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http_client: build_client(settings)?,
            base_url: settings.resolved_api_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_access_token(&self, credentials: &Credentials) -> Result<String> {
        let url = format!("{}/auth", self.base_url);
        debug!(url = %url, "requesting access token");

        let response = self
            .http_client
            .post(&url)
            .headers(anonymous_headers())
            .json(&auth_payload(credentials))
            .send()
            .await
            .map_err(|e| ReportError::AuthFailed(e.to_string()))?;

        parse_access_token(&read_json(response, "auth").await?)
    }

    async fn request_member_id(&self, identity: &str, access_token: &str) -> Result<Value> {
        let url = format!("{}/member/login", self.base_url);
        debug!(url = %url, "looking up admin member id");

        let response = self
            .http_client
            .get(&url)
            .headers(bearer_headers(access_token)?)
            .query(&[
                ("name", identity),
                ("type", "ADMIN"),
                ("state", "NORMAL"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| ReportError::AuthFailed(e.to_string()))?;

        parse_login_member_id(&read_json(response, "member login").await?)
    }

    async fn request_member_token(&self, member_id: Value, access_token: &str) -> Result<String> {
        let url = format!("{}/member/token", self.base_url);
        debug!(url = %url, "requesting member token");

        let response = self
            .http_client
            .post(&url)
            .headers(bearer_headers(access_token)?)
            .json(&json!({ "memberId": member_id }))
            .send()
            .await
            .map_err(|e| ReportError::AuthFailed(e.to_string()))?;

        parse_member_token(&read_json(response, "member token").await?)
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;

        let access_token = self.request_access_token(credentials).await?;
        let member_id = self
            .request_member_id(&credentials.identity, &access_token)
            .await?;
        let member_token = self.request_member_token(member_id, &access_token).await?;

        info!("authenticated as {}", credentials.identity);
        Ok(Session::new(access_token, member_token))
    }
}

// ── Wire helpers ──────────────────────────────────────────────────────────────

/// Body of the initial `POST /auth` call.
pub fn auth_payload(credentials: &Credentials) -> Value {
    json!({
        "name": credentials.identity,
        "state": "COMPLETED",
        "extras": { "password": credentials.secret },
    })
}

/// The access token from a `/auth` response. Both `access_token` and
/// `expires_in` must be present.
pub fn parse_access_token(body: &Value) -> Result<String> {
    let token = non_empty_str(body.get("access_token"));
    match (token, body.get("expires_in")) {
        (Some(token), Some(expires)) if !expires.is_null() => Ok(token.to_string()),
        _ => Err(ReportError::AuthFailed(
            "invalid access token response".to_string(),
        )),
    }
}

/// The `id` of the first member in a `/member/login` response.
pub fn parse_login_member_id(body: &Value) -> Result<Value> {
    body.as_array()
        .and_then(|members| members.first())
        .and_then(|member| member.get("id"))
        .filter(|id| !id.is_null())
        .cloned()
        .ok_or_else(|| ReportError::AuthFailed("member not found".to_string()))
}

/// The member-scoped token from a `/member/token` response.
pub fn parse_member_token(body: &Value) -> Result<String> {
    non_empty_str(body.get("access_token"))
        .map(str::to_string)
        .ok_or_else(|| ReportError::AuthFailed("invalid member token response".to_string()))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

async fn read_json(response: reqwest::Response, step: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(ReportError::AuthFailed(format!("{} returned HTTP {}", step, status)));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| ReportError::AuthFailed(format!("{} response unreadable: {}", step, e)))
}
