//! Shared HTTP plumbing for the back-office adapters.

use std::time::Duration;

use clip_core::error::{ReportError, Result};
use clip_core::session::Session;
use clip_core::settings::Settings;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

const USER_AGENT: &str = concat!("clip-progress-report/", env!("CARGO_PKG_VERSION"));

/// Accept header the back-office expects on every call.
pub const ACCEPT_ANY_JSON: &str = "application/json, text/plain, */*";

/// Header carrying the member-scoped token.
pub const MEMBER_TOKEN_HEADER: &str = "x-bpo-member-token";

/// Build the HTTP client shared by all adapters of one pipeline.
pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(|e| ReportError::Transport(e.to_string()))
}

/// Headers for requests made before any token exists. The member-token
/// header is sent empty.
pub fn anonymous_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_ANY_JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(MEMBER_TOKEN_HEADER),
        HeaderValue::from_static(""),
    );
    headers
}

/// Headers for a call made with only the bearer token, during the handshake.
pub fn bearer_headers(access_token: &str) -> Result<HeaderMap> {
    let mut headers = anonymous_headers();
    headers.insert(AUTHORIZATION, header_value(&format!("bearer {}", access_token))?);
    Ok(headers)
}

/// Headers for a fully authenticated call.
///
/// Fails with [`ReportError::AuthRequired`] unless `session` carries both
/// tokens.
pub fn session_headers(session: &Session) -> Result<HeaderMap> {
    let session = session.require()?;
    let mut headers = anonymous_headers();
    headers.insert(
        AUTHORIZATION,
        header_value(&format!("Bearer {}", session.bearer_token))?,
    );
    headers.insert(
        HeaderName::from_static(MEMBER_TOKEN_HEADER),
        header_value(&session.member_token)?,
    );
    Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| ReportError::InvalidInput("token contains characters not allowed in a header".to_string()))
}
