//! Metadata resolution: entity IDs → display names.
//!
//! Every kind goes through [`MetadataResolver::resolve_ids`]; members are
//! fetched in fixed-size batches, the other kinds one ID per call. Lookup
//! failures never abort a run: a failed batch or ID just leaves its names
//! out of the map.

use std::collections::BTreeSet;

use clip_core::error::Result;
use clip_core::models::{EntityKind, IdSet, NameMap, NameMaps};
use clip_core::session::Session;
use clip_core::settings::{Settings, DEFAULT_MAX_CONCURRENT_LOOKUPS, DEFAULT_MEMBER_BATCH_SIZE};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::metadata::{extract_name, MetadataService};

/// Resolves IDs against a [`MetadataService`] using an explicit session.
pub struct MetadataResolver<'a, M: MetadataService + ?Sized> {
    service: &'a M,
    session: &'a Session,
    member_batch_size: usize,
    max_concurrent: usize,
}

impl<'a, M: MetadataService + ?Sized> MetadataResolver<'a, M> {
    pub fn new(service: &'a M, session: &'a Session) -> Self {
        Self {
            service,
            session,
            member_batch_size: DEFAULT_MEMBER_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }

    /// Take batch size and concurrency from `settings`.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.member_batch_size = settings.member_batch_size.max(1);
        self.max_concurrent = settings.max_concurrent_lookups.max(1);
        self
    }

    pub fn with_member_batch_size(mut self, size: usize) -> Self {
        self.member_batch_size = size.max(1);
        self
    }

    /// Resolve all four kinds concurrently.
    ///
    /// Fails only with `AuthRequired`, before any request is made.
    pub async fn resolve_all(&self, ids: &IdSet) -> Result<NameMaps> {
        self.session.require()?;

        let (members, products, courses, contents) = tokio::join!(
            self.resolve_ids(EntityKind::Member, ids.get(EntityKind::Member)),
            self.resolve_ids(EntityKind::Product, ids.get(EntityKind::Product)),
            self.resolve_ids(EntityKind::Course, ids.get(EntityKind::Course)),
            self.resolve_ids(EntityKind::Content, ids.get(EntityKind::Content)),
        );

        let mut maps = NameMaps::default();
        maps.set(EntityKind::Member, members?);
        maps.set(EntityKind::Product, products?);
        maps.set(EntityKind::Course, courses?);
        maps.set(EntityKind::Content, contents?);

        for kind in EntityKind::ALL {
            info!(
                "Resolved {} names: {} / {}",
                kind,
                maps.get(kind).len(),
                ids.get(kind).len()
            );
        }
        Ok(maps)
    }

    /// Resolve `ids` of one kind. Unresolvable IDs are absent from the result.
    pub async fn resolve_ids(&self, kind: EntityKind, ids: &BTreeSet<i64>) -> Result<NameMap> {
        self.session.require()?;
        if ids.is_empty() {
            return Ok(NameMap::new());
        }

        let mapping = match kind {
            EntityKind::Member => self.resolve_members(ids).await,
            _ => self.resolve_individually(kind, ids).await,
        };
        Ok(mapping)
    }

    async fn resolve_members(&self, ids: &BTreeSet<i64>) -> NameMap {
        let all: Vec<i64> = ids.iter().copied().collect();
        let chunks: Vec<&[i64]> = all.chunks(self.member_batch_size).collect();
        debug!(
            members = all.len(),
            batches = chunks.len(),
            "resolving members in batches"
        );

        let partials: Vec<NameMap> = stream::iter(chunks)
            .map(|chunk| async move {
                match self.service.fetch_members(self.session, chunk).await {
                    Ok(mapping) => mapping,
                    Err(e) => {
                        warn!(
                            first_id = chunk.first().copied().unwrap_or_default(),
                            size = chunk.len(),
                            error = %e,
                            "member batch lookup failed; names left blank"
                        );
                        NameMap::new()
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut mapping = NameMap::new();
        for partial in partials {
            mapping.extend(partial);
        }
        mapping
    }

    async fn resolve_individually(&self, kind: EntityKind, ids: &BTreeSet<i64>) -> NameMap {
        let results: Vec<(i64, Result<Option<serde_json::Value>>)> = stream::iter(ids.iter().copied())
            .map(|id| async move { (id, self.service.fetch_by_id(self.session, kind, id).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut mapping = NameMap::new();
        for (id, result) in results {
            match result {
                Ok(Some(record)) => {
                    if let Some(name) = extract_name(kind, &record) {
                        mapping.insert(id, name);
                    }
                }
                Ok(None) => debug!(kind = %kind, id, "no metadata record"),
                Err(e) => warn!(kind = %kind, id, error = %e, "metadata lookup failed"),
            }
        }
        mapping
    }
}
