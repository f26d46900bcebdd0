//! Conversion of raw upstream slots into a canonical [`Snapshot`].

use chrono::{DateTime, ParseError as ChronoParseError};
use chrono_tz::Tz;

use crate::model::{RawSlot, ResourceIndex, ResourceSet, Snapshot, TimeKey};

#[derive(thiserror::Error, Debug)]
/// Raw data that cannot be normalized. Any such record fails the whole poll.
pub enum NormalizeError {
    /// Start time is not an ISO-8601 instant.
    #[error("Malformed start time {value:?}: {source}")]
    StartTime {
        /// Offending value.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: ChronoParseError,
    },
    /// Resource tag is not of the form `<siteId>:<subId>`.
    #[error("Malformed resource tag {0:?}")]
    ResourceTag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Mapping from external resource tags to in-scope internal indices.
pub struct ResourceScope {
    /// Subtracted from a tag's numeric suffix to get the internal index.
    pub offset: u32,
    /// Indices at or above this bound are out of scope.
    pub upper_bound: ResourceIndex,
}

impl ResourceScope {
    /// Resolve a tag such as `"255904:3"` to an in-scope index.
    ///
    /// Returns `Ok(None)` for resources outside the scope.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::ResourceTag`] when the tag has no numeric second component.
    pub fn index_for(&self, tag: &str) -> Result<Option<ResourceIndex>, NormalizeError> {
        let suffix = tag
            .split(':')
            .nth(1)
            .and_then(|sub_id| sub_id.trim().parse::<u32>().ok())
            .ok_or_else(|| NormalizeError::ResourceTag(tag.to_owned()))?;

        Ok(suffix
            .checked_sub(self.offset)
            .filter(|index| *index < self.upper_bound))
    }
}

/// Build the snapshot for one poll.
///
/// Each start time is converted to `zone` and rendered as a [`TimeKey`]; resource tags
/// are mapped through `scope` and out-of-scope resources are dropped. When two slots
/// render to the same key, the later one replaces the earlier one's resources.
///
/// # Errors
///
/// Returns a [`NormalizeError`] for the first malformed start time or resource tag.
pub fn normalize(
    raw_slots: &[RawSlot],
    scope: ResourceScope,
    zone: Tz,
) -> Result<Snapshot, NormalizeError> {
    let mut snapshot = Snapshot::new();

    for slot in raw_slots {
        let start = DateTime::parse_from_rfc3339(&slot.start_time).map_err(|source| {
            NormalizeError::StartTime {
                value: slot.start_time.clone(),
                source,
            }
        })?;
        let time = TimeKey::from_local(&start.with_timezone(&zone).naive_local());

        let mut resources = Vec::with_capacity(slot.resource_tags.len());
        for tag in &slot.resource_tags {
            if let Some(index) = scope.index_for(tag)? {
                resources.push(index);
            }
        }

        snapshot.insert(time, ResourceSet::from(resources));
    }

    Ok(snapshot)
}
