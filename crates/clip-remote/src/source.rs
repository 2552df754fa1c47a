//! Remote record source: the course-content progress API.

use async_trait::async_trait;
use clip_core::error::{ReportError, Result};
use clip_core::models::SourceQuery;
use clip_core::session::Session;
use clip_core::settings::Settings;
use serde_json::Value;
use tracing::{debug, info};

use crate::http::{build_client, session_headers};

/// Delivers raw progress rows for a query.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Raw rows in source order. Empty and non-array bodies yield an empty
    /// vector; transport and HTTP failures are [`ReportError::Source`].
    async fn fetch_records(&self, session: &Session, query: &SourceQuery) -> Result<Vec<Value>>;
}

// ── HttpRecordSource ──────────────────────────────────────────────────────────

pub struct HttpRecordSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRecordSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http_client: build_client(settings)?,
            base_url: settings.resolved_source_base_url(),
        })
    }

    /// Full URL of the progress endpoint.
    pub fn progress_url(&self) -> String {
        format!("{}/api/backoffice/course-content/progress", self.base_url)
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_records(&self, session: &Session, query: &SourceQuery) -> Result<Vec<Value>> {
        let headers = session_headers(session)?;
        let url = self.progress_url();
        debug!(url = %url, group_id = %query.group_id, "fetching progress rows");

        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| ReportError::Source(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Source(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::Source(e.to_string()))?;
        let rows = parse_rows_body(&body)?;

        info!("Fetched {} progress rows", rows.len());
        Ok(rows)
    }
}

// ── Wire helpers ──────────────────────────────────────────────────────────────

/// Query-string pairs for the progress endpoint.
pub fn query_params(query: &SourceQuery) -> [(&'static str, &str); 5] {
    [
        ("groupId", query.group_id.as_str()),
        ("productId", query.product_id.as_str()),
        ("courseId", query.course_id.as_str()),
        ("startedAt", query.start_date.as_str()),
        ("endedAt", query.end_date.as_str()),
    ]
}

/// Rows from a JSON value: the array itself, or nothing.
pub fn normalize_rows(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        _ => Vec::new(),
    }
}

/// Rows from a response body. A blank body is an empty result; a body that
/// is not JSON at all is a source failure.
pub fn parse_rows_body(body: &str) -> Result<Vec<Value>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ReportError::Source(format!("malformed response: {}", e)))?;
    Ok(normalize_rows(value))
}
