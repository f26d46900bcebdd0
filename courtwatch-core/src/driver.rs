//! Poll driver: one request, diff, notify, and save cycle at a time until cancelled.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::consolidate::consolidate;
use crate::diff::diff;
use crate::model::{AccessToken, NewOpening, Snapshot};
use crate::normalize::normalize;
use crate::notify::{Delivery, MessageFormatter, Notifier};
use crate::ports::{Authenticator, AvailabilityPort, NotificationSink, SnapshotStore};

/// Sent once the driver starts polling.
pub const START_MESSAGE: &str = "Checking for court openings...";
/// Sent, best effort, when the driver is cancelled.
pub const STOP_MESSAGE: &str = "Bot stopped running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether the driver currently holds an access token.
pub enum DriverState {
    /// No token; the next cycle asks the authenticator first.
    Unauthenticated,
    /// A token is held and used for the next request.
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of a single poll cycle.
pub enum CycleOutcome {
    /// No token could be obtained; retried next cycle.
    AuthenticationFailed,
    /// The API rejected the token; it was discarded.
    TokenRejected,
    /// The request or its response failed; nothing was diffed or saved.
    Skipped,
    /// The snapshot was diffed, announced, and became the next baseline.
    Completed {
        /// Number of openings found.
        openings: usize,
        /// What reached the notification sink.
        delivery: Delivery,
    },
}

/// Collaborators wired into a [`PollDriver`].
pub struct DriverPorts {
    /// Source of access tokens.
    pub authenticator: Arc<dyn Authenticator>,
    /// Availability API.
    pub availability: Arc<dyn AvailabilityPort>,
    /// Previous-snapshot storage.
    pub store: Arc<dyn SnapshotStore>,
    /// Chat channel.
    pub sink: Arc<dyn NotificationSink>,
}

/// Drives the poll loop for one venue.
pub struct PollDriver {
    settings: Settings,
    authenticator: Arc<dyn Authenticator>,
    availability: Arc<dyn AvailabilityPort>,
    store: Arc<dyn SnapshotStore>,
    notifier: Notifier,
    token: Option<AccessToken>,
    consecutive_rejections: u32,
    previous: Option<Snapshot>,
    baseline_loaded: bool,
}

impl PollDriver {
    /// Create a driver with validated `settings`.
    #[must_use]
    pub fn new(settings: Settings, ports: DriverPorts) -> Self {
        let formatter = MessageFormatter::new(settings.max_ranges_per_day);
        Self {
            notifier: Notifier::new(ports.sink, formatter),
            authenticator: ports.authenticator,
            availability: ports.availability,
            store: ports.store,
            settings,
            token: None,
            consecutive_rejections: 0,
            previous: None,
            baseline_loaded: false,
        }
    }

    /// Current authentication state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        if self.token.is_some() {
            DriverState::Authenticated
        } else {
            DriverState::Unauthenticated
        }
    }

    /// Poll until `cancel` fires, then announce the stop and release the authenticator.
    ///
    /// Cancellation is observed between cycles and during the sleep, never mid-cycle.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            wait_seconds = self.settings.wait_seconds,
            interval_minutes = self.settings.interval_minutes,
            "Starting poll loop"
        );
        if let Err(err) = self.notifier.send(START_MESSAGE).await {
            warn!(error = %err, "Failed to announce start");
        }

        while !cancel.is_cancelled() {
            let outcome = self.run_cycle().await;
            debug!(?outcome, "Poll cycle finished");

            if !self.should_wait(outcome) {
                continue;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = sleep(self.settings.wait()) => {}
            }
        }

        self.shutdown().await;
    }

    /// Run one cycle: authenticate if needed, fetch, normalize, diff, announce, save.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let Some(token) = self.ensure_token().await else {
            return CycleOutcome::AuthenticationFailed;
        };

        let raw_slots = match self.availability.fetch_slots(&token).await {
            Ok(raw_slots) => raw_slots,
            Err(err) if err.is_auth_expired() => {
                warn!(error = %err, "Access token expired, discarding it");
                self.token = None;
                self.consecutive_rejections = self.consecutive_rejections.saturating_add(1);
                return CycleOutcome::TokenRejected;
            }
            Err(err) => {
                error!(error = %err, "Availability request failed, skipping cycle");
                return CycleOutcome::Skipped;
            }
        };
        self.consecutive_rejections = 0;

        let current = match normalize(
            &raw_slots,
            self.settings.resource_scope(),
            self.settings.time_zone,
        ) {
            Ok(current) => current,
            Err(err) => {
                error!(error = %err, "Unexpected availability data, skipping cycle");
                return CycleOutcome::Skipped;
            }
        };

        if !self.baseline_loaded {
            self.previous = self.load_previous().await;
            self.baseline_loaded = true;
        }
        let openings = diff(self.previous.as_ref(), &current);
        let delivery = self.announce(&openings).await;

        // The in-memory baseline advances even when persisting it fails.
        if let Err(err) = self.store.save(&current).await {
            error!(error = %err, "Failed to store snapshot");
        }
        self.previous = Some(current);

        CycleOutcome::Completed {
            openings: openings.len(),
            delivery,
        }
    }

    // A rejected token is retried at once, but a second rejection in a row waits
    // so a stale credential cannot spin the loop.
    fn should_wait(&self, outcome: CycleOutcome) -> bool {
        !matches!(outcome, CycleOutcome::TokenRejected) || self.consecutive_rejections > 1
    }

    async fn ensure_token(&mut self) -> Option<AccessToken> {
        if let Some(token) = &self.token {
            return Some(token.clone());
        }

        info!("No access token, requesting one");
        match self.authenticator.access_token().await {
            Ok(token) => {
                info!("Access token acquired");
                self.token = Some(token.clone());
                Some(token)
            }
            Err(err) => {
                error!(error = %err, "Failed to acquire access token");
                None
            }
        }
    }

    async fn load_previous(&self) -> Option<Snapshot> {
        match self.store.load().await {
            Ok(previous) => previous,
            Err(err) => {
                warn!(error = %err, "Stored snapshot unreadable, treating this poll as the first");
                None
            }
        }
    }

    async fn announce(&self, openings: &[NewOpening]) -> Delivery {
        if openings.is_empty() {
            debug!("No new availabilities");
            return Delivery::Nothing;
        }

        for opening in openings {
            info!(time = %opening.time, resources = ?opening.resources, "New opening");
        }

        match consolidate(openings, self.settings.interval()) {
            Ok(days) => self.notifier.announce(&days).await,
            Err(err) => {
                error!(error = %err, "Failed to consolidate openings");
                self.notifier.alert().await
            }
        }
    }

    async fn shutdown(self) {
        info!("Poll loop cancelled, shutting down");
        if let Err(err) = self.notifier.send(STOP_MESSAGE).await {
            warn!(error = %err, "Failed to announce stop");
        }
        self.authenticator.close().await;
    }
}
