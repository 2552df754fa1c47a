//! Metadata service client.
//!
//! Looks up courses, products and contents one ID at a time and members in
//! batches, and extracts the display names the report needs from the raw
//! service records.

use async_trait::async_trait;
use clip_core::conversions::value_to_int;
use clip_core::error::{ReportError, Result};
use clip_core::models::{EntityKind, EntityName, NameMap};
use clip_core::session::Session;
use clip_core::settings::Settings;
use serde_json::Value;
use tracing::debug;

use crate::http::{build_client, session_headers};

/// Read access to entity metadata.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Raw record for a single product, course or content. `Ok(None)` when the
    /// service has no such entity.
    async fn fetch_by_id(&self, session: &Session, kind: EntityKind, id: i64) -> Result<Option<Value>>;

    /// Names for a batch of members. IDs the service does not know are simply
    /// absent from the map.
    async fn fetch_members(&self, session: &Session, ids: &[i64]) -> Result<NameMap>;
}

/// Resource path for per-ID lookups. Members have no per-ID endpoint.
pub fn resource_path(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Member => None,
        EntityKind::Product => Some("/product"),
        EntityKind::Course => Some("/course"),
        EntityKind::Content => Some("/course-content"),
    }
}

// ── HttpMetadataClient ────────────────────────────────────────────────────────

pub struct HttpMetadataClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http_client: build_client(settings)?,
            base_url: settings.resolved_api_base_url(),
        })
    }

    /// URL of the per-ID record for `kind`, if that kind has one.
    pub fn record_url(&self, kind: EntityKind, id: i64) -> Option<String> {
        resource_path(kind).map(|path| format!("{}{}/{}", self.base_url, path, id))
    }
}

#[async_trait]
impl MetadataService for HttpMetadataClient {
    async fn fetch_by_id(&self, session: &Session, kind: EntityKind, id: i64) -> Result<Option<Value>> {
        let headers = session_headers(session)?;
        let url = self.record_url(kind, id).ok_or_else(|| ReportError::Lookup {
            kind,
            message: "no per-id endpoint".to_string(),
        })?;
        debug!(kind = %kind, id, "fetching metadata record");

        let lookup_err = |e: reqwest::Error| ReportError::Lookup {
            kind,
            message: e.to_string(),
        };
        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(lookup_err)?;

        if !response.status().is_success() {
            debug!(kind = %kind, id, status = %response.status(), "metadata record unavailable");
            return Ok(None);
        }
        let record = response.json::<Value>().await.map_err(lookup_err)?;
        Ok(Some(record))
    }

    async fn fetch_members(&self, session: &Session, ids: &[i64]) -> Result<NameMap> {
        let headers = session_headers(session)?;
        let url = format!("{}/member/ids", self.base_url);
        debug!(count = ids.len(), "fetching member batch");

        let lookup_err = |message: String| ReportError::Lookup {
            kind: EntityKind::Member,
            message,
        };
        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .query(&[("ids", join_ids(ids))])
            .send()
            .await
            .map_err(|e| lookup_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_err(format!("HTTP {}", status)));
        }
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| lookup_err(e.to_string()))?;
        Ok(parse_member_batch(&body))
    }
}

// ── Name extraction ───────────────────────────────────────────────────────────

/// Comma-joined ID list for the member batch query.
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Display name of a per-ID record.
///
/// Courses prefer `publicName`, products prefer `extras.publicName`, and
/// both fall back to `name`; contents use `name`.
pub fn extract_name(kind: EntityKind, record: &Value) -> Option<EntityName> {
    let name = match kind {
        EntityKind::Member => text_at(record, &["name"]),
        EntityKind::Course => text_at(record, &["publicName"]).or_else(|| text_at(record, &["name"])),
        EntityKind::Product => {
            text_at(record, &["extras", "publicName"]).or_else(|| text_at(record, &["name"]))
        }
        EntityKind::Content => text_at(record, &["name"]),
    }?;
    Some(EntityName::named(name))
}

/// Member names from a `/member/ids` response. Rows without a positive id
/// are skipped; a non-array body yields an empty map.
pub fn parse_member_batch(body: &Value) -> NameMap {
    let mut mapping = NameMap::new();
    let Some(rows) = body.as_array() else {
        return mapping;
    };

    for row in rows {
        let id = row.get("id").map(value_to_int).unwrap_or(0);
        if id <= 0 {
            continue;
        }
        let login_name = text_at(row, &["name"]).unwrap_or_default();
        let display_name = text_at(row, &["extras", "name"]);
        mapping.insert(id, EntityName::member(login_name, display_name));
    }
    mapping
}

/// Non-empty string at `path` inside nested objects.
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
