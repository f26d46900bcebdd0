//! Detection of openings between two snapshots.

use crate::model::{NewOpening, Snapshot};

/// Openings in `current` that were not open in `previous`.
///
/// Without a previous snapshot nothing is reported, so the first poll only
/// establishes a baseline. Closed slots are never reported. The result follows
/// the iteration order of `current`.
#[must_use]
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<NewOpening> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    current
        .iter()
        .filter_map(|entry| match previous.get(&entry.time) {
            None => Some(NewOpening {
                time: entry.time.clone(),
                resources: entry.resources.clone(),
            }),
            Some(known) => {
                let fresh = entry.resources.difference(known);
                (!fresh.is_empty()).then(|| NewOpening {
                    time: entry.time.clone(),
                    resources: fresh,
                })
            }
        })
        .collect()
}
