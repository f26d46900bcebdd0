//! Tunables for one venue, loaded once at startup and immutable afterwards.

use std::time::Duration;

use chrono::TimeDelta;
use chrono_tz::Tz;

use crate::normalize::ResourceScope;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Invalid settings.
pub enum ConfigError {
    /// The wait between polls must be positive.
    #[error("wait_seconds must be greater than zero")]
    ZeroWait,
    /// The slot interval must be positive.
    #[error("interval_minutes must be greater than zero")]
    ZeroInterval,
    /// At least one resource index must be in scope.
    #[error("in_scope_upper_bound must be greater than zero")]
    EmptyScope,
    /// Unknown IANA time zone name.
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Poll cadence, resource mapping, and rendering settings.
pub struct Settings {
    /// Seconds to sleep between polls.
    pub wait_seconds: u64,
    /// Length of one bookable slot; openings this far apart are merged.
    pub interval_minutes: u32,
    /// Subtracted from a resource tag's suffix to get the internal index.
    pub resource_offset: u32,
    /// Internal indices at or above this bound are ignored.
    pub in_scope_upper_bound: u32,
    /// Zone used for time keys and day labels.
    pub time_zone: Tz,
    /// Days with more ranges than this are summarized in notifications.
    pub max_ranges_per_day: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wait_seconds: 15,
            interval_minutes: 15,
            resource_offset: 2,
            in_scope_upper_bound: 8,
            time_zone: chrono_tz::US::Pacific,
            max_ranges_per_day: 2,
        }
    }
}

impl Settings {
    /// Check that the settings can drive a poll loop.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.wait_seconds == 0 {
            return Err(ConfigError::ZeroWait);
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.in_scope_upper_bound == 0 {
            return Err(ConfigError::EmptyScope);
        }
        Ok(self)
    }

    /// Parse an IANA zone name such as `US/Pacific`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTimeZone`] for names `chrono-tz` does not know.
    pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
        name.parse::<Tz>()
            .map_err(|_unknown| ConfigError::UnknownTimeZone(name.to_owned()))
    }

    /// Sleep between polls.
    #[must_use]
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }

    /// Slot length used to merge contiguous openings.
    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.interval_minutes))
    }

    /// Resource tag mapping.
    #[must_use]
    pub fn resource_scope(&self) -> ResourceScope {
        ResourceScope {
            offset: self.resource_offset,
            upper_bound: self.in_scope_upper_bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_indoor_courts() {
        let settings = Settings::default().validate().expect("valid defaults");
        assert_eq!(settings.wait(), Duration::from_secs(15));
        assert_eq!(settings.interval(), TimeDelta::minutes(15));
        assert_eq!(
            settings.resource_scope(),
            ResourceScope {
                offset: 2,
                upper_bound: 8,
            }
        );
    }

    #[test]
    fn rejects_zero_cadence() {
        let no_wait = Settings {
            wait_seconds: 0,
            ..Settings::default()
        };
        assert_eq!(no_wait.validate(), Err(ConfigError::ZeroWait));

        let no_interval = Settings {
            interval_minutes: 0,
            ..Settings::default()
        };
        assert_eq!(no_interval.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn parses_zone_names() {
        assert_eq!(
            Settings::parse_time_zone("US/Pacific"),
            Ok(chrono_tz::US::Pacific)
        );
        assert_eq!(
            Settings::parse_time_zone("Mars/Olympus"),
            Err(ConfigError::UnknownTimeZone("Mars/Olympus".to_owned()))
        );
    }
}
