//! Monthly aggregation of viewing records.

use std::collections::BTreeMap;

use clip_core::conversions::month_key;
use clip_core::models::InputRecord;
use serde::Serialize;
use tracing::debug;

// ── AggregateKey ──────────────────────────────────────────────────────────────

/// Identity of one report row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AggregateKey {
    /// `"YYYY-MM"`.
    pub month: String,
    pub member_id: i64,
    pub product_id: i64,
    pub course_id: i64,
    pub content_id: i64,
}

impl AggregateKey {
    /// Key for `record`, or `None` when its day has no parsable month.
    pub fn for_record(record: &InputRecord) -> Option<Self> {
        let month = month_key(&record.day)?;
        Some(Self {
            month,
            member_id: record.member_id,
            product_id: record.product_id,
            course_id: record.course_id,
            content_id: record.content_id,
        })
    }
}

// ── AggregateBucket ───────────────────────────────────────────────────────────

/// Running totals for one [`AggregateKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateBucket {
    pub key: AggregateKey,
    /// Sum over matching records.
    pub cumulative_play_time_sec: i64,
    /// Sum over matching records.
    pub total_play_time_sec: i64,
    /// Largest content duration seen across matching records.
    pub total_content_play_time_sec: i64,
    pub row_count: u32,
}

impl AggregateBucket {
    fn new(key: AggregateKey) -> Self {
        Self {
            key,
            cumulative_play_time_sec: 0,
            total_play_time_sec: 0,
            total_content_play_time_sec: 0,
            row_count: 0,
        }
    }

    /// Fold one record into the bucket: play times add up, the content
    /// duration keeps its maximum.
    fn add_record(&mut self, record: &InputRecord) {
        self.cumulative_play_time_sec = self
            .cumulative_play_time_sec
            .saturating_add(record.cumulative_play_time_sec);
        self.total_play_time_sec = self
            .total_play_time_sec
            .saturating_add(record.total_play_time_sec);
        self.total_content_play_time_sec = self
            .total_content_play_time_sec
            .max(record.total_content_play_time_sec);
        self.row_count += 1;
    }
}

// ── MonthlyAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that groups records by month and entity IDs.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Aggregate `records` into one bucket per [`AggregateKey`].
    ///
    /// Records without a parsable day are skipped. Buckets come back in key
    /// order (month first); the report applies its own ordering.
    pub fn aggregate(records: &[InputRecord]) -> Vec<AggregateBucket> {
        let mut map: BTreeMap<AggregateKey, AggregateBucket> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(key) = AggregateKey::for_record(record) else {
                skipped += 1;
                continue;
            };
            map.entry(key.clone())
                .or_insert_with(|| AggregateBucket::new(key))
                .add_record(record);
        }

        debug!(
            buckets = map.len(),
            skipped, "aggregated records by month"
        );
        map.into_values().collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
