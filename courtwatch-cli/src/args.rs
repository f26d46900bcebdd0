use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use courtwatch_core::config::{ConfigError, Settings};

/// Console log layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Multi-field human-readable lines.
    Pretty,
    /// Single-line output.
    Compact,
}

/// Poll court availability and announce newly opened bookings.
#[derive(Debug, Parser)]
#[command(name = "courtwatch", version, about)]
pub(crate) struct Args {
    /// Log announcements instead of posting them to Discord.
    #[arg(long)]
    pub no_discord: bool,

    /// Seconds to wait between polls.
    #[arg(long, default_value_t = 15)]
    pub wait_seconds: u64,

    /// Slot length in minutes; openings this far apart are merged.
    #[arg(long, default_value_t = 15)]
    pub interval_minutes: u32,

    /// IANA time zone of the venue.
    #[arg(long, default_value = "US/Pacific")]
    pub time_zone: String,

    /// Days with more ranges than this are summarized.
    #[arg(long, default_value_t = 2)]
    pub max_ranges_per_day: usize,

    /// Persist the previous snapshot here so restarts do not lose it.
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Console log layout.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    pub(crate) fn settings(&self) -> Result<Settings, ConfigError> {
        Settings {
            wait_seconds: self.wait_seconds,
            interval_minutes: self.interval_minutes,
            time_zone: Settings::parse_time_zone(&self.time_zone)?,
            max_ranges_per_day: self.max_ranges_per_day,
            ..Settings::default()
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_venue_settings() {
        let args = Args::try_parse_from(["courtwatch"]).expect("valid args");
        assert!(!args.no_discord);
        assert_eq!(args.settings(), Ok(Settings::default()));
    }

    #[test]
    fn overrides_cadence_and_zone() {
        let args = Args::try_parse_from([
            "courtwatch",
            "--no-discord",
            "--wait-seconds",
            "30",
            "--time-zone",
            "America/New_York",
            "--log-format",
            "compact",
        ])
        .expect("valid args");

        let settings = args.settings().expect("valid settings");
        assert!(args.no_discord);
        assert_eq!(args.log_format, LogFormat::Compact);
        assert_eq!(settings.wait_seconds, 30);
        assert_eq!(
            Ok(settings.time_zone),
            Settings::parse_time_zone("America/New_York")
        );
    }

    #[test]
    fn unknown_zone_is_a_config_error() {
        let args = Args::try_parse_from(["courtwatch", "--time-zone", "Nowhere/Land"])
            .expect("valid args");
        assert!(matches!(
            args.settings(),
            Err(ConfigError::UnknownTimeZone(_))
        ));
    }
}
