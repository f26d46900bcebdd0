//! Rendering of consolidated openings and delivery with size fallbacks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use crate::model::{ConsolidatedRange, DayOpenings};
use crate::ports::{NotificationSink, PortError};

/// First line of every announcement.
pub const HEADLINE: &str = "New availabilities!! Bookings freed up on:";
/// Last-resort announcement when nothing longer can be delivered.
pub const BARE_ALERT: &str = "New availabilities!!";
/// Replaces the range list of a day with too many ranges.
pub const MANY_OPENINGS: &str = "Lots of openings now!";

const TIME_FORMAT: &str = "%I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Renders day-grouped ranges into chat messages.
pub struct MessageFormatter {
    max_ranges_per_day: usize,
}

impl MessageFormatter {
    /// Create a formatter that collapses days with more than `max_ranges_per_day` ranges.
    #[must_use]
    pub fn new(max_ranges_per_day: usize) -> Self {
        Self { max_ranges_per_day }
    }

    /// Full announcement: headline followed by one line per day.
    #[must_use]
    pub fn format(&self, days: &[DayOpenings]) -> String {
        let mut message = String::from(HEADLINE);
        for day in days {
            message.push('\n');
            message.push_str(&self.format_day(day));
        }
        message
    }

    /// One line such as `Sat 05/10: 3:00 PM - 3:30 PM, 6:00 PM - 6:15 PM`.
    #[must_use]
    pub fn format_day(&self, day: &DayOpenings) -> String {
        let label = day.label();
        if day.ranges.len() > self.max_ranges_per_day {
            return format!("{label}: {MANY_OPENINGS}");
        }

        let mut line = format!("{label}: ");
        for (position, range) in day.ranges.iter().enumerate() {
            if position > 0 {
                line.push_str(", ");
            }
            line.push_str(&format_range(range));
        }
        line
    }

    /// Shorter announcement listing only the day labels.
    #[must_use]
    pub fn format_day_labels(days: &[DayOpenings]) -> String {
        let mut message = String::from(HEADLINE);
        for day in days {
            message.push('\n');
            message.push_str(&day.label());
        }
        message
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(2)
    }
}

fn format_range(range: &ConsolidatedRange) -> String {
    format!("{} - {}", format_time(&range.start), format_time(&range.end))
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT)
        .to_string()
        .trim_start_matches('0')
        .to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which message, if any, reached the sink.
pub enum Delivery {
    /// There was nothing to announce.
    Nothing,
    /// The full announcement was delivered.
    Full,
    /// Only the day labels were delivered.
    DayLabels,
    /// Only the bare alert was delivered.
    BareAlert,
    /// Every attempt failed.
    Failed,
}

/// Sends announcements through a sink, falling back to shorter messages on failure.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    formatter: MessageFormatter,
}

impl Notifier {
    /// Create a notifier delivering through `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, formatter: MessageFormatter) -> Self {
        Self { sink, formatter }
    }

    /// Send a plain status message.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`PortError`] unchanged.
    pub async fn send(&self, text: &str) -> Result<(), PortError> {
        self.sink.send(text).await
    }

    /// Announce new openings. Never fails; every failed attempt is logged.
    pub async fn announce(&self, days: &[DayOpenings]) -> Delivery {
        if days.is_empty() {
            return Delivery::Nothing;
        }

        let attempts = [
            (Delivery::Full, self.formatter.format(days)),
            (Delivery::DayLabels, MessageFormatter::format_day_labels(days)),
            (Delivery::BareAlert, BARE_ALERT.to_owned()),
        ];

        for (delivery, message) in attempts {
            match self.sink.send(&message).await {
                Ok(()) => {
                    info!(?delivery, days = days.len(), "Announced new openings");
                    return delivery;
                }
                Err(err) => {
                    warn!(?delivery, chars = message.chars().count(), error = %err, "Failed to deliver announcement");
                }
            }
        }

        error!("Every announcement attempt failed");
        Delivery::Failed
    }

    /// Send the bare alert alone, used when openings exist but cannot be rendered.
    pub async fn alert(&self) -> Delivery {
        match self.sink.send(BARE_ALERT).await {
            Ok(()) => Delivery::BareAlert,
            Err(err) => {
                error!(error = %err, "Failed to deliver alert");
                Delivery::Failed
            }
        }
    }
}

/// Sink that only logs messages, for runs without a chat channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, text: &str) -> Result<(), PortError> {
        info!(message = text, "Skipping chat delivery");
        Ok(())
    }
}
