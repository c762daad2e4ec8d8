use indexmap::IndexMap;
use tracing::debug;

use crate::model::{BomRecord, IdentityKey};

/// Merge records sharing the same seven-field identity into one output row,
/// preserving first-seen order. PDF line wrapping splits one logical BOM row
/// across several extracted rows, each carrying a different subset of color
/// cells; the merge unions them. For a color both rows carry, the first
/// non-empty value wins. The first non-empty image wins likewise.
pub fn group_records(records: Vec<BomRecord>) -> Vec<BomRecord> {
    let input_count = records.len();
    let mut grouped: IndexMap<IdentityKey, BomRecord> = IndexMap::new();

    for record in records {
        let key = record.identity_key();
        match grouped.entry(key) {
            indexmap::map::Entry::Occupied(mut entry) => {
                merge_into(entry.get_mut(), record);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }
    }

    if grouped.len() != input_count {
        debug!(
            raw = input_count,
            grouped = grouped.len(),
            "merged wrapped BOM rows by identity"
        );
    }
    grouped.into_values().collect()
}

fn merge_into(existing: &mut BomRecord, incoming: BomRecord) {
    for (header, value) in incoming.colors {
        if header.is_empty() {
            continue;
        }
        let keep_existing = existing
            .colors
            .get(&header)
            .is_some_and(|current| !current.is_empty());
        if !keep_existing {
            existing.colors.insert(header, value);
        }
    }
    if existing.image.is_none() {
        existing.image = incoming.image;
    }
    for (header, bytes) in incoming.color_images {
        if header.is_empty() || bytes.is_empty() {
            continue;
        }
        existing.color_images.entry(header).or_insert(bytes);
    }
}
