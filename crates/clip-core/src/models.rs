use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::{ReportError, Result};

/// The four entity families whose IDs appear in viewing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Member,
    Product,
    Course,
    Content,
}

impl EntityKind {
    /// Every kind, in resolution order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Member,
        EntityKind::Product,
        EntityKind::Course,
        EntityKind::Content,
    ];

    /// Lowercase identifier used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Member => "member",
            EntityKind::Product => "product",
            EntityKind::Course => "course",
            EntityKind::Content => "content",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One course-viewing row: play-time counters for a single member, content
/// and day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Viewing member (`targetId` in the source export). `0` when absent.
    pub member_id: i64,
    pub product_id: i64,
    pub course_id: i64,
    /// Course content, i.e. the clip (`courseContentId` in the source export).
    pub content_id: i64,
    /// Raw day string as delivered by the source; parsed lazily for the month.
    pub day: String,
    /// Seconds of cumulative play time reported for the day.
    pub cumulative_play_time_sec: i64,
    /// Seconds of total play time reported for the day.
    pub total_play_time_sec: i64,
    /// Duration of the content itself, in seconds.
    pub total_content_play_time_sec: i64,
}

impl InputRecord {
    /// The ID this record carries for `kind`.
    pub fn id_for(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Member => self.member_id,
            EntityKind::Product => self.product_id,
            EntityKind::Course => self.course_id,
            EntityKind::Content => self.content_id,
        }
    }
}

/// Deduplicated positive IDs per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet {
    pub members: BTreeSet<i64>,
    pub products: BTreeSet<i64>,
    pub courses: BTreeSet<i64>,
    pub contents: BTreeSet<i64>,
}

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id` into the set for `kind`. Non-positive IDs are ignored.
    ///
    /// Returns `true` when the ID was newly added.
    pub fn insert(&mut self, kind: EntityKind, id: i64) -> bool {
        if id <= 0 {
            return false;
        }
        self.get_mut(kind).insert(id)
    }

    pub fn get(&self, kind: EntityKind) -> &BTreeSet<i64> {
        match kind {
            EntityKind::Member => &self.members,
            EntityKind::Product => &self.products,
            EntityKind::Course => &self.courses,
            EntityKind::Content => &self.contents,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<i64> {
        match kind {
            EntityKind::Member => &mut self.members,
            EntityKind::Product => &mut self.products,
            EntityKind::Course => &mut self.courses,
            EntityKind::Content => &mut self.contents,
        }
    }

    /// `true` when no kind holds any ID.
    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|k| self.get(*k).is_empty())
    }
}

/// Human-readable labels for one entity.
///
/// Members carry a login name in `name` and a display name in
/// `display_name`; the other kinds only use `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntityName {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }

    pub fn member(login_name: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            name: login_name.into(),
            display_name,
        }
    }
}

/// ID → labels for a single entity kind.
pub type NameMap = HashMap<i64, EntityName>;

/// Resolved labels for all four entity kinds. Missing IDs are valid and
/// render as empty strings.
#[derive(Debug, Clone, Default)]
pub struct NameMaps {
    pub members: NameMap,
    pub products: NameMap,
    pub courses: NameMap,
    pub contents: NameMap,
}

impl NameMaps {
    pub fn get(&self, kind: EntityKind) -> &NameMap {
        match kind {
            EntityKind::Member => &self.members,
            EntityKind::Product => &self.products,
            EntityKind::Course => &self.courses,
            EntityKind::Content => &self.contents,
        }
    }

    /// Replace the map for `kind`.
    pub fn set(&mut self, kind: EntityKind, map: NameMap) {
        match kind {
            EntityKind::Member => self.members = map,
            EntityKind::Product => self.products = map,
            EntityKind::Course => self.courses = map,
            EntityKind::Content => self.contents = map,
        }
    }

    /// Primary name for `id`, or `""` when unresolved.
    pub fn name(&self, kind: EntityKind, id: i64) -> &str {
        self.get(kind)
            .get(&id)
            .map(|n| n.name.as_str())
            .unwrap_or("")
    }

    /// Secondary display name for `id`, or `""` when unresolved.
    pub fn display_name(&self, kind: EntityKind, id: i64) -> &str {
        self.get(kind)
            .get(&id)
            .and_then(|n| n.display_name.as_deref())
            .unwrap_or("")
    }
}

/// Filter for the remote record source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuery {
    pub group_id: String,
    pub product_id: String,
    pub course_id: String,
    /// Inclusive `YYYY-MM-DD` start date.
    pub start_date: String,
    /// Inclusive `YYYY-MM-DD` end date.
    pub end_date: String,
}

impl SourceQuery {
    /// Check that every field is filled in and the date range is ordered.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("groupId", &self.group_id),
            ("productId", &self.product_id),
            ("courseId", &self.course_id),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ReportError::InvalidInput(format!("{} is required", name)));
        }

        let start = parse_query_date(&self.start_date)?;
        let end = parse_query_date(&self.end_date)?;
        if start > end {
            return Err(ReportError::InvalidInput(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

fn parse_query_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidInput(format!("invalid date: {}", s)))
}
