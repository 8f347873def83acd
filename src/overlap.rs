//! @ai:module:intent Find pairwise line-range intersections between resolved anchors of the same file
//! @ai:module:layer domain
//! @ai:module:public_api OverlapEntry, detect_overlaps
//! @ai:module:stateless true

use std::collections::{BTreeMap, HashMap};

/// @ai:intent One resolved anchor as seen by overlap detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapEntry {
    pub anchor_id: String,
    pub file: Option<String>,
    pub range: Option<(usize, usize)>,
}

/// @ai:intent Compute which anchors overlap which, per file
/// @ai:pre ranges are inclusive
/// @ai:post the relation is symmetric and never lists an anchor as overlapping itself
/// @ai:post anchors without a file or range never appear in the result
/// @ai:effects pure
pub fn detect_overlaps(entries: &[OverlapEntry]) -> HashMap<String, Vec<String>> {
    let mut by_file: BTreeMap<&str, Vec<(&str, (usize, usize))>> = BTreeMap::new();
    for entry in entries {
        if let (Some(file), Some(range)) = (entry.file.as_deref(), entry.range) {
            by_file
                .entry(file)
                .or_default()
                .push((entry.anchor_id.as_str(), range));
        }
    }

    let mut overlaps: HashMap<String, Vec<String>> = HashMap::new();
    let mut record = |from: &str, to: &str| {
        let list = overlaps.entry(from.to_string()).or_default();
        if !list.iter().any(|id| id == to) {
            list.push(to.to_string());
        }
    };

    for group in by_file.values() {
        for (i, &(a_id, (a_start, a_end))) in group.iter().enumerate() {
            for &(b_id, (b_start, b_end)) in &group[i + 1..] {
                if a_id == b_id {
                    continue;
                }
                if a_start <= b_end && b_start <= a_end {
                    record(a_id, b_id);
                    record(b_id, a_id);
                }
            }
        }
    }

    overlaps
}
