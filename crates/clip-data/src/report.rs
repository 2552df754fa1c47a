//! Monthly report rendering.
//!
//! Joins aggregate buckets with resolved names, derives the duration and
//! progress columns, orders rows and writes CSV text.

use std::cmp::Ordering;

use clip_core::error::{ReportError, Result};
use clip_core::formatting::{progress_percent, seconds_to_hms};
use clip_core::models::{EntityKind, NameMaps};
use serde::Serialize;

use crate::aggregator::AggregateBucket;

/// Column names of the report, in output order.
pub const REPORT_HEADERS: [&str; 15] = [
    "month",
    "memberId",
    "memberEmail",
    "memberName",
    "productId",
    "productName",
    "courseId",
    "courseName",
    "courseContentId",
    "contentName",
    "cumulativePlayTimeHms",
    "totalPlayTimeHms",
    "totalContentPlayTimeHms",
    "progressPercent",
    "rowCount",
];

// ── ReportRow ─────────────────────────────────────────────────────────────────

/// One rendered report line. Field order matches [`REPORT_HEADERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub month: String,
    pub member_id: i64,
    pub member_email: String,
    pub member_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub course_id: i64,
    pub course_name: String,
    pub content_id: i64,
    pub content_name: String,
    pub cumulative_play_time_hms: String,
    pub total_play_time_hms: String,
    pub total_content_play_time_hms: String,
    pub progress_percent: String,
    pub row_count: u32,
}

impl ReportRow {
    fn from_bucket(bucket: &AggregateBucket, names: &NameMaps) -> Self {
        let key = &bucket.key;
        Self {
            month: key.month.clone(),
            member_id: key.member_id,
            member_email: names.name(EntityKind::Member, key.member_id).to_string(),
            member_name: names
                .display_name(EntityKind::Member, key.member_id)
                .to_string(),
            product_id: key.product_id,
            product_name: names.name(EntityKind::Product, key.product_id).to_string(),
            course_id: key.course_id,
            course_name: names.name(EntityKind::Course, key.course_id).to_string(),
            content_id: key.content_id,
            content_name: names.name(EntityKind::Content, key.content_id).to_string(),
            cumulative_play_time_hms: seconds_to_hms(bucket.cumulative_play_time_sec),
            total_play_time_hms: seconds_to_hms(bucket.total_play_time_sec),
            total_content_play_time_hms: seconds_to_hms(bucket.total_content_play_time_sec),
            progress_percent: progress_percent(
                bucket.total_play_time_sec,
                bucket.total_content_play_time_sec,
            ),
            row_count: bucket.row_count,
        }
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

/// Report order: member, month, course, product, content.
pub fn compare_buckets(a: &AggregateBucket, b: &AggregateBucket) -> Ordering {
    let (a, b) = (&a.key, &b.key);
    a.member_id
        .cmp(&b.member_id)
        .then_with(|| a.month.cmp(&b.month))
        .then_with(|| a.course_id.cmp(&b.course_id))
        .then_with(|| a.product_id.cmp(&b.product_id))
        .then_with(|| a.content_id.cmp(&b.content_id))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Build the sorted report rows for `buckets`.
pub fn build_rows(buckets: &[AggregateBucket], names: &NameMaps) -> Vec<ReportRow> {
    let mut sorted: Vec<&AggregateBucket> = buckets.iter().collect();
    sorted.sort_by(|a, b| compare_buckets(a, b));
    sorted
        .into_iter()
        .map(|bucket| ReportRow::from_bucket(bucket, names))
        .collect()
}

/// Serialize rows as CSV: header line first, `\n` separated, no trailing
/// newline. Cells are quoted only when they contain a comma, quote or line
/// break.
pub fn write_csv(rows: &[ReportRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(REPORT_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
    let mut text = String::from_utf8(bytes).map_err(|e| ReportError::Other(e.into()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Render the full report for `buckets`.
pub fn render_report(buckets: &[AggregateBucket], names: &NameMaps) -> Result<String> {
    write_csv(&build_rows(buckets, names))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
