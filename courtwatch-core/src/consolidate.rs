//! Merging of openings into contiguous, day-grouped time ranges.

use chrono::{NaiveDateTime, ParseError as ChronoParseError, TimeDelta};

use crate::model::{ConsolidatedRange, DayOpenings, NewOpening};

#[derive(thiserror::Error, Debug)]
#[error("Unreadable time key {key:?}: {source}")]
/// A time key that does not parse back into a local time.
pub struct ConsolidateError {
    /// Offending key.
    pub key: String,
    /// Underlying parse failure.
    #[source]
    pub source: ChronoParseError,
}

/// Merge openings that are exactly one `interval` apart into `[start, end)` ranges.
///
/// Each opening counts once regardless of how many resources it carries. Ranges are
/// grouped under the calendar day of their start, days and ranges in chronological order.
///
/// # Errors
///
/// Returns a [`ConsolidateError`] when an opening's time key cannot be parsed.
pub fn consolidate(
    openings: &[NewOpening],
    interval: TimeDelta,
) -> Result<Vec<DayOpenings>, ConsolidateError> {
    let mut times = openings
        .iter()
        .map(|opening| {
            opening.time.to_local().map_err(|source| ConsolidateError {
                key: opening.time.as_str().to_owned(),
                source,
            })
        })
        .collect::<Result<Vec<NaiveDateTime>, _>>()?;
    times.sort_unstable();
    times.dedup();

    let mut days = Vec::new();
    let mut sorted = times.into_iter();
    let Some(first) = sorted.next() else {
        return Ok(days);
    };

    let (mut start, mut end) = (first, first);
    for time in sorted {
        if time - end == interval {
            end = time;
            continue;
        }
        push_range(&mut days, start, end + interval);
        start = time;
        end = time;
    }
    push_range(&mut days, start, end + interval);

    Ok(days)
}

fn push_range(days: &mut Vec<DayOpenings>, start: NaiveDateTime, end: NaiveDateTime) {
    let range = ConsolidatedRange { start, end };
    let day = start.date();

    match days.last_mut() {
        Some(current) if current.day == day => current.ranges.push(range),
        _ => days.push(DayOpenings {
            day,
            ranges: vec![range],
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{ResourceSet, TimeKey};

    fn fifteen_minutes() -> TimeDelta {
        TimeDelta::minutes(15)
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid local time")
    }

    fn opening(day: u32, hour: u32, minute: u32) -> NewOpening {
        NewOpening {
            time: TimeKey::from_local(&at(day, hour, minute)),
            resources: ResourceSet::from(vec![0]),
        }
    }

    #[test]
    fn merges_contiguous_openings() {
        let openings = vec![
            opening(10, 9, 0),
            opening(10, 9, 15),
            opening(10, 9, 30),
            opening(10, 10, 15),
        ];

        let days = consolidate(&openings, fifteen_minutes()).expect("valid keys");

        assert_eq!(
            days,
            vec![DayOpenings {
                day: at(10, 0, 0).date(),
                ranges: vec![
                    ConsolidatedRange {
                        start: at(10, 9, 0),
                        end: at(10, 9, 45),
                    },
                    ConsolidatedRange {
                        start: at(10, 10, 15),
                        end: at(10, 10, 30),
                    },
                ],
            }]
        );
    }

    #[test]
    fn single_opening_yields_one_interval_wide_range() {
        let days = consolidate(&[opening(10, 14, 0)], fifteen_minutes()).expect("valid keys");

        assert_eq!(days.len(), 1);
        let ranges: Vec<ConsolidatedRange> = days.into_iter().flat_map(|day| day.ranges).collect();
        assert_eq!(
            ranges,
            vec![ConsolidatedRange {
                start: at(10, 14, 0),
                end: at(10, 14, 15),
            }]
        );
    }

    #[test]
    fn sorts_before_merging() {
        let openings = vec![opening(10, 9, 30), opening(10, 9, 0), opening(10, 9, 15)];

        let days = consolidate(&openings, fifteen_minutes()).expect("valid keys");
        let ranges: Vec<ConsolidatedRange> = days.into_iter().flat_map(|day| day.ranges).collect();
        assert_eq!(
            ranges,
            vec![ConsolidatedRange {
                start: at(10, 9, 0),
                end: at(10, 9, 45),
            }]
        );
    }

    #[test]
    fn groups_ranges_under_their_own_start_day() {
        let openings = vec![opening(11, 8, 0), opening(10, 18, 0), opening(10, 20, 0)];

        let days = consolidate(&openings, fifteen_minutes()).expect("valid keys");

        let summary: Vec<(String, usize)> = days
            .iter()
            .map(|day| (day.label(), day.ranges.len()))
            .collect();
        assert_eq!(
            summary,
            vec![("Sat 05/10".to_owned(), 2), ("Sun 05/11".to_owned(), 1)]
        );
    }

    #[test]
    fn gap_must_equal_the_interval_exactly() {
        let openings = vec![opening(10, 9, 0), opening(10, 9, 10)];

        let days = consolidate(&openings, fifteen_minutes()).expect("valid keys");
        let ranges: Vec<ConsolidatedRange> = days.into_iter().flat_map(|day| day.ranges).collect();
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn no_openings_no_days() {
        let days = consolidate(&[], fifteen_minutes()).expect("nothing to parse");
        assert!(days.is_empty());
    }

    #[test]
    fn unreadable_key_is_reported() {
        let bad: TimeKey = serde_json::from_str(r#""half past nine""#).expect("json string");
        let openings = vec![NewOpening {
            time: bad,
            resources: ResourceSet::default(),
        }];

        let err = consolidate(&openings, fifteen_minutes()).expect_err("unparsable key");
        assert_eq!(err.key, "half past nine");
    }
}
