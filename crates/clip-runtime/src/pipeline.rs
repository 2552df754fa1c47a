//! End-to-end report pipeline.
//!
//! One [`ReportPipeline::run`] call authenticates once, reads records from a
//! CSV export or the progress API, aggregates them per month, resolves names
//! and renders the CSV. Nothing is written to disk; callers that want a file
//! use [`ReportArtifact::write_to`](crate::artifact::ReportArtifact::write_to).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clip_core::error::Result;
use clip_core::formatting::report_file_name;
use clip_core::models::{EntityKind, InputRecord, SourceQuery};
use clip_core::session::{Credentials, Session};
use clip_core::settings::Settings;
use clip_data::aggregator::MonthlyAggregator;
use clip_data::ids::extract_ids;
use clip_data::reader::{load_csv_file, parse_delimited, parse_source_rows};
use clip_data::report::render_report;
use clip_remote::auth::{Authenticator, HttpAuthenticator};
use clip_remote::metadata::{HttpMetadataClient, MetadataService};
use clip_remote::resolver::MetadataResolver;
use clip_remote::source::{HttpRecordSource, RecordSource};
use tracing::{debug, info};

use crate::artifact::{ReportArtifact, RunStats};

/// Where a run takes its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportInput {
    /// CSV export text already in memory.
    Csv(String),
    /// CSV export on disk.
    CsvFile(PathBuf),
    /// Rows fetched from the progress API.
    Remote(SourceQuery),
}

impl ReportInput {
    fn validate(&self) -> Result<()> {
        match self {
            ReportInput::Remote(query) => query.validate(),
            ReportInput::Csv(_) | ReportInput::CsvFile(_) => Ok(()),
        }
    }
}

// ── ReportPipeline ────────────────────────────────────────────────────────────

pub struct ReportPipeline<A, S, M> {
    settings: Settings,
    authenticator: A,
    source: S,
    metadata: M,
}

/// The pipeline wired to the back-office HTTP adapters.
pub type HttpReportPipeline = ReportPipeline<HttpAuthenticator, HttpRecordSource, HttpMetadataClient>;

impl HttpReportPipeline {
    /// Validate `settings` and build the HTTP adapters from them.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let authenticator = HttpAuthenticator::new(&settings)?;
        let source = HttpRecordSource::new(&settings)?;
        let metadata = HttpMetadataClient::new(&settings)?;
        info!(
            "Using back-office API at {} ({:?})",
            authenticator.base_url(),
            settings.environment
        );
        Ok(ReportPipeline::new(settings, authenticator, source, metadata))
    }
}

impl<A, S, M> ReportPipeline<A, S, M>
where
    A: Authenticator,
    S: RecordSource,
    M: MetadataService,
{
    pub fn new(settings: Settings, authenticator: A, source: S, metadata: M) -> Self {
        Self {
            settings,
            authenticator,
            source,
            metadata,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the whole pipeline, stamping the file name with the current time.
    pub async fn run(&self, input: ReportInput, credentials: &Credentials) -> Result<ReportArtifact> {
        self.run_at(input, credentials, Utc::now()).await
    }

    /// Same as [`Self::run`] with an explicit run time.
    pub async fn run_at(
        &self,
        input: ReportInput,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<ReportArtifact> {
        credentials.validate()?;
        input.validate()?;

        let session = self.authenticator.authenticate(credentials).await?;
        debug!(?session, "session established");

        let records = self.read_records(&input, &session).await?;
        info!("Read {} records", records.len());
        let mut stats = RunStats {
            records_read: records.len(),
            ..RunStats::default()
        };

        let ids = extract_ids(&records);
        info!(
            "Required IDs: members={}, products={}, courses={}, contents={}",
            ids.members.len(),
            ids.products.len(),
            ids.courses.len(),
            ids.contents.len()
        );

        let buckets = MonthlyAggregator::aggregate(&records);
        stats.aggregate_rows = buckets.len();
        info!("Aggregated into {} monthly rows", buckets.len());

        let names = MetadataResolver::new(&self.metadata, &session)
            .with_settings(&self.settings)
            .resolve_all(&ids)
            .await?;
        for kind in EntityKind::ALL {
            stats.set_coverage(kind, ids.get(kind).len(), names.get(kind).len());
        }

        let csv = render_report(&buckets, &names)?;
        let file_name = report_file_name(now);
        info!("Report ready: {}", file_name);

        Ok(ReportArtifact {
            file_name,
            csv,
            stats,
        })
    }

    async fn read_records(&self, input: &ReportInput, session: &Session) -> Result<Vec<InputRecord>> {
        match input {
            ReportInput::Csv(text) => parse_delimited(text),
            ReportInput::CsvFile(path) => load_csv_file(path),
            ReportInput::Remote(query) => {
                let rows = self.source.fetch_records(session, query).await?;
                Ok(parse_source_rows(&rows))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use clip_core::error::ReportError;
    use clip_core::models::{EntityName, NameMap};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── Fakes ─────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeAuth {
        reject: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ReportError::AuthFailed("member not found".to_string()));
            }
            Ok(Session::new("bearer-tok", "member-tok"))
        }
    }

    #[derive(Default)]
    struct FakeSource {
        rows: Vec<Value>,
        fail: bool,
        sessions: Mutex<Vec<Session>>,
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_records(&self, session: &Session, _query: &SourceQuery) -> Result<Vec<Value>> {
            self.sessions.lock().unwrap().push(session.clone());
            if self.fail {
                return Err(ReportError::Source("HTTP 502 Bad Gateway".to_string()));
            }
            Ok(self.rows.clone())
        }
    }

    #[derive(Default)]
    struct FakeMetadata {
        failing_member: Option<i64>,
        sessions: Mutex<Vec<Session>>,
    }

    #[async_trait]
    impl MetadataService for FakeMetadata {
        async fn fetch_by_id(&self, session: &Session, kind: EntityKind, id: i64) -> Result<Option<Value>> {
            self.sessions.lock().unwrap().push(session.clone());
            let record = match (kind, id) {
                (EntityKind::Product, 10) => json!({ "name": "SKU", "extras": { "publicName": "All Access" } }),
                (EntityKind::Course, 100) => json!({ "name": "rust-101", "publicName": "Intro to Rust" }),
                (EntityKind::Content, 1000) => json!({ "name": "Ownership" }),
                _ => return Ok(None),
            };
            Ok(Some(record))
        }

        async fn fetch_members(&self, _session: &Session, ids: &[i64]) -> Result<NameMap> {
            if let Some(bad) = self.failing_member {
                if ids.contains(&bad) {
                    return Err(ReportError::Lookup {
                        kind: EntityKind::Member,
                        message: "HTTP 500".to_string(),
                    });
                }
            }
            let mut mapping = NameMap::new();
            for id in ids {
                let name = match id {
                    1 => EntityName::member("lee@example.com", Some("Lee".to_string())),
                    2 => EntityName::member("bo@example.com", Some("Bo".to_string())),
                    _ => continue,
                };
                mapping.insert(*id, name);
            }
            Ok(mapping)
        }
    }

    type TestPipeline = ReportPipeline<FakeAuth, FakeSource, FakeMetadata>;

    fn pipeline(source: FakeSource, metadata: FakeMetadata) -> TestPipeline {
        ReportPipeline::new(Settings::default(), FakeAuth::default(), source, metadata)
    }

    fn credentials() -> Credentials {
        Credentials::new("ops@example.com", "s3cret")
    }

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap()
    }

    fn query() -> SourceQuery {
        SourceQuery {
            group_id: "7".to_string(),
            product_id: "10".to_string(),
            course_id: "100".to_string(),
            start_date: "2024-03-01".to_string(),
            end_date: "2024-04-30".to_string(),
        }
    }

    const EXPORT: &str = "\
targetId,productId,courseId,courseContentId,dailyDate,cumulativePlayTime,totalPlayTime,totalContentPlayTime
2,10,100,1000,2024-04-01,60,60,0
1,10,100,1000,2024-03-05,1800,30,100
1,10,100,1000,2024-03-28,1861,20,80
";

    const HEADER: &str = "month,memberId,memberEmail,memberName,productId,productName,courseId,courseName,courseContentId,contentName,cumulativePlayTimeHms,totalPlayTimeHms,totalContentPlayTimeHms,progressPercent,rowCount";

    fn source_rows() -> Vec<Value> {
        vec![
            json!({
                "targetId": 1, "productId": 10, "courseId": 100, "courseContentId": 1000,
                "dailyDate": "2024-03-05", "cumulativePlayTime": 1800,
                "totalPlayTime": 30, "totalContentPlayTime": 100
            }),
            json!({
                "targetId": "1", "productId": "10", "courseId": "100", "courseContentId": "1000",
                "dailyDate": "2024-03-28", "cumulativePlayTime": "1861",
                "totalPlayTime": "20", "totalContentPlayTime": "80"
            }),
        ]
    }

    // ── CSV input ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_csv_run_renders_report() {
        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let artifact = p
            .run_at(ReportInput::Csv(EXPORT.to_string()), &credentials(), run_time())
            .await
            .unwrap();

        let expected = format!(
            "{}\n{}\n{}",
            HEADER,
            "2024-03,1,lee@example.com,Lee,10,All Access,100,Intro to Rust,1000,Ownership,01:01:01,00:00:50,00:01:40,50.00%,2",
            "2024-04,2,bo@example.com,Bo,10,All Access,100,Intro to Rust,1000,Ownership,00:01:00,00:01:00,00:00:00,,1"
        );
        assert_eq!(artifact.csv, expected);
        assert_eq!(
            artifact.file_name,
            "course_clip_progress_monthly_2024-05-01T09-30-15.csv"
        );
        assert_eq!(artifact.stats.records_read, 3);
        assert_eq!(artifact.stats.aggregate_rows, 2);
        assert_eq!(artifact.stats.coverage(EntityKind::Member), (2, 2));
    }

    #[tokio::test]
    async fn test_csv_file_input() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path = tmp.path().join("export.csv");
        std::fs::write(&path, EXPORT).expect("write export");

        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let artifact = p
            .run_at(ReportInput::CsvFile(path), &credentials(), run_time())
            .await
            .unwrap();
        assert_eq!(artifact.stats.records_read, 3);
    }

    #[tokio::test]
    async fn test_missing_csv_file_is_fatal() {
        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let err = p
            .run(ReportInput::CsvFile(PathBuf::from("/no/such/export.csv")), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_empty_export_gives_header_only() {
        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let artifact = p
            .run_at(ReportInput::Csv(String::new()), &credentials(), run_time())
            .await
            .unwrap();
        assert_eq!(artifact.csv, HEADER);
        assert_eq!(artifact.stats.records_read, 0);
    }

    // ── Remote input ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_remote_run_shares_one_session() {
        let source = FakeSource {
            rows: source_rows(),
            ..FakeSource::default()
        };
        let p = pipeline(source, FakeMetadata::default());
        let artifact = p
            .run_at(ReportInput::Remote(query()), &credentials(), run_time())
            .await
            .unwrap();

        assert_eq!(p.authenticator.calls.load(Ordering::SeqCst), 1);
        let expected_session = Session::new("bearer-tok", "member-tok");
        assert_eq!(p.source.sessions.lock().unwrap().as_slice(), &[expected_session.clone()]);
        assert!(p
            .metadata
            .sessions
            .lock()
            .unwrap()
            .iter()
            .all(|s| *s == expected_session));

        let lines: Vec<&str> = artifact.csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2024-03,1,lee@example.com,Lee,10,All Access,"));
        assert!(lines[1].ends_with(",01:01:01,00:00:50,00:01:40,50.00%,2"));
    }

    #[tokio::test]
    async fn test_source_failure_aborts_run() {
        let source = FakeSource {
            fail: true,
            ..FakeSource::default()
        };
        let p = pipeline(source, FakeMetadata::default());
        let err = p
            .run(ReportInput::Remote(query()), &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Source(_)));
        assert!(err.is_fatal());
        assert!(p.metadata.sessions.lock().unwrap().is_empty());
    }

    // ── Validation and auth ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_invalid_query_fails_before_auth() {
        let mut bad = query();
        bad.end_date = "2024-02-01".to_string();

        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let err = p
            .run(ReportInput::Remote(bad), &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert_eq!(p.authenticator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_credentials_fail_before_auth() {
        let p = pipeline(FakeSource::default(), FakeMetadata::default());
        let err = p
            .run(ReportInput::Csv(EXPORT.to_string()), &Credentials::new("ops", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::InvalidInput(_)));
        assert_eq!(p.authenticator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_login_aborts_run() {
        let auth = FakeAuth {
            reject: true,
            ..FakeAuth::default()
        };
        let p = ReportPipeline::new(
            Settings::default(),
            auth,
            FakeSource {
                rows: source_rows(),
                ..FakeSource::default()
            },
            FakeMetadata::default(),
        );
        let err = p
            .run(ReportInput::Remote(query()), &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::AuthFailed(_)));
        assert!(p.source.sessions.lock().unwrap().is_empty());
    }

    // ── Degraded lookups ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_failed_member_chunk_leaves_names_blank() {
        let settings = Settings {
            member_batch_size: 1,
            ..Settings::default()
        };
        let metadata = FakeMetadata {
            failing_member: Some(2),
            ..FakeMetadata::default()
        };
        let p = ReportPipeline::new(settings, FakeAuth::default(), FakeSource::default(), metadata);
        let artifact = p
            .run_at(ReportInput::Csv(EXPORT.to_string()), &credentials(), run_time())
            .await
            .unwrap();

        let lines: Vec<&str> = artifact.csv.lines().collect();
        assert!(lines[1].starts_with("2024-03,1,lee@example.com,Lee,"));
        assert!(lines[2].starts_with("2024-04,2,,,10,All Access,"));
        assert_eq!(artifact.stats.coverage(EntityKind::Member), (2, 1));
    }
}
