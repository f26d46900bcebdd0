//! Domain data structures for slots, snapshots, openings, and credentials.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, ParseError as ChronoParseError};
use serde::{Deserialize, Serialize};

/// Format of a [`TimeKey`]: fixed width, second precision, local wall-clock time.
pub const TIME_KEY_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Format used to label a calendar day in notifications, e.g. `Sat 05/10`.
pub const DAY_LABEL_FORMAT: &str = "%a %m/%d";

/// Internal index of a bookable resource (a court).
pub type ResourceIndex = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One availability record as delivered by the upstream API.
pub struct RawSlot {
    /// Start time as an ISO-8601 UTC string, e.g. `2025-05-10T22:00:00Z`.
    pub start_time: String,
    /// Opaque resource tags of the form `"<siteId>:<subId>"`.
    pub resource_tags: Vec<String>,
}

impl RawSlot {
    /// Construct a raw slot from a start time and its resource tags.
    #[must_use]
    pub fn new<S, I, T>(start_time: S, resource_tags: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            start_time: start_time.into(),
            resource_tags: resource_tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Canonical local-time string identifying the start of a slot.
pub struct TimeKey(String);

impl TimeKey {
    /// Render a local wall-clock time as a key.
    #[must_use]
    pub fn from_local(local: &NaiveDateTime) -> Self {
        TimeKey(local.format(TIME_KEY_FORMAT).to_string())
    }

    /// Borrow the rendered key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the key back into the local wall-clock time it was rendered from.
    ///
    /// # Errors
    ///
    /// Returns a [`ChronoParseError`] when the key was not produced by [`TimeKey::from_local`].
    pub fn to_local(&self) -> Result<NaiveDateTime, ChronoParseError> {
        NaiveDateTime::parse_from_str(&self.0, TIME_KEY_FORMAT)
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Resources open at one time key, in discovery order.
pub struct ResourceSet(Vec<ResourceIndex>);

impl ResourceSet {
    /// Whether `index` is part of the set.
    #[must_use]
    pub fn contains(&self, index: ResourceIndex) -> bool {
        self.0.contains(&index)
    }

    /// Resources in `self` that are not in `other`, keeping the order of `self`.
    #[must_use]
    pub fn difference(&self, other: &ResourceSet) -> ResourceSet {
        self.0
            .iter()
            .copied()
            .filter(|index| !other.contains(*index))
            .collect()
    }

    /// Iterate over resource indices.
    pub fn iter(&self) -> impl Iterator<Item = ResourceIndex> + '_ {
        self.0.iter().copied()
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no resources are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ResourceIndex> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceIndex>>(iter: I) -> Self {
        ResourceSet(iter.into_iter().collect())
    }
}

impl From<Vec<ResourceIndex>> for ResourceSet {
    fn from(indices: Vec<ResourceIndex>) -> Self {
        ResourceSet(indices)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A time key together with the resources open at that time.
pub struct SlotEntry {
    /// Slot start.
    pub time: TimeKey,
    /// Open resources.
    pub resources: ResourceSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SlotEntry>", into = "Vec<SlotEntry>")]
/// Every bookable slot and its open resources at one poll instant.
///
/// Entries keep the order in which they were inserted.
pub struct Snapshot {
    entries: Vec<SlotEntry>,
    positions: HashMap<TimeKey, usize>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the resources open at `time`.
    ///
    /// A key that is already present has its resources replaced and keeps its position.
    pub fn insert(&mut self, time: TimeKey, resources: ResourceSet) {
        if let Some(entry) = self
            .positions
            .get(&time)
            .and_then(|position| self.entries.get_mut(*position))
        {
            entry.resources = resources;
            return;
        }

        self.positions.insert(time.clone(), self.entries.len());
        self.entries.push(SlotEntry { time, resources });
    }

    /// Resources open at `time`, if the key is present.
    #[must_use]
    pub fn get(&self, time: &TimeKey) -> Option<&ResourceSet> {
        self.positions
            .get(time)
            .and_then(|position| self.entries.get(*position))
            .map(|entry| &entry.resources)
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SlotEntry> {
        self.entries.iter()
    }

    /// Number of time keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no time keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Snapshot {}

impl From<Vec<SlotEntry>> for Snapshot {
    fn from(entries: Vec<SlotEntry>) -> Self {
        let mut snapshot = Snapshot::new();
        for entry in entries {
            snapshot.insert(entry.time, entry.resources);
        }
        snapshot
    }
}

impl From<Snapshot> for Vec<SlotEntry> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.entries
    }
}

impl FromIterator<(TimeKey, ResourceSet)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (TimeKey, ResourceSet)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (time, resources) in iter {
            snapshot.insert(time, resources);
        }
        snapshot
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A time key that is new, or resources newly open at a known time key.
pub struct NewOpening {
    /// Slot start.
    pub time: TimeKey,
    /// Resources that opened since the previous snapshot.
    pub resources: ResourceSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Merged run of contiguous openings, `[start, end)`.
pub struct ConsolidatedRange {
    /// First opening.
    pub start: NaiveDateTime,
    /// Last opening plus one polling interval.
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Ranges starting on one calendar day, in chronological order.
pub struct DayOpenings {
    /// Local calendar day of every range's start.
    pub day: NaiveDate,
    /// Ranges on that day.
    pub ranges: Vec<ConsolidatedRange>,
}

impl DayOpenings {
    /// Human-friendly label such as `Sat 05/10`.
    #[must_use]
    pub fn label(&self) -> String {
        self.day.format(DAY_LABEL_FORMAT).to_string()
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Opaque bearer credential for the availability API.
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new<S: Into<String>>(token: S) -> Self {
        AccessToken(token.into())
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(***)")
    }
}
