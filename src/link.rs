//! Joins film records to free-text summaries through the composite key.

use rustc_hash::FxHashMap;

use crate::models::CanonicalRecord;
use crate::normalize::{CompositeKey, SummaryEntry};

/// Composite key -> first summary entry seen for that key.
pub type SummaryIndex<'a> = FxHashMap<CompositeKey, &'a SummaryEntry>;

/// Index summaries by key, skipping entries without text. On collision the
/// first entry wins, silently.
pub fn index_summaries(summaries: &[SummaryEntry]) -> SummaryIndex<'_> {
    let mut index = SummaryIndex::default();
    for entry in summaries.iter().filter(|e| e.text.is_some()) {
        index.entry(entry.key.clone()).or_insert(entry);
    }
    index
}

/// Attach summary text to every film whose key has a non-empty summary.
/// Episodes pass through untouched. Returns the records and the number linked.
pub fn link_summaries(
    records: Vec<CanonicalRecord>,
    summaries: &[SummaryEntry],
) -> (Vec<CanonicalRecord>, usize) {
    let index = index_summaries(summaries);
    let mut linked = 0;

    let records = records
        .into_iter()
        .map(|record| {
            if !record.is_film() {
                return record;
            }
            let text = index
                .get(&CompositeKey::of_record(&record))
                .and_then(|entry| entry.text.clone());
            match text {
                Some(text) => {
                    linked += 1;
                    CanonicalRecord {
                        summary: Some(text),
                        ..record
                    }
                }
                None => record,
            }
        })
        .collect();

    (records, linked)
}
