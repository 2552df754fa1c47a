//! Collects the entity IDs that need name resolution.

use clip_core::models::{EntityKind, IdSet, InputRecord};
use tracing::debug;

/// Scan `records` once and collect the distinct positive ID per kind.
///
/// Records whose day cannot be parsed still contribute their IDs.
pub fn extract_ids(records: &[InputRecord]) -> IdSet {
    let mut ids = IdSet::new();
    for record in records {
        for kind in EntityKind::ALL {
            ids.insert(kind, record.id_for(kind));
        }
    }

    debug!(
        members = ids.members.len(),
        products = ids.products.len(),
        courses = ids.courses.len(),
        contents = ids.contents.len(),
        "extracted required ids"
    );
    ids
}
