//! Traits describing the collaborators of the poll driver and their shared error type.

use std::io::Error as IoError;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{AccessToken, RawSlot, Snapshot};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to external collaborators.
pub enum PortError {
    /// The availability API rejected the access token.
    #[error("Access token rejected with HTTP {0}")]
    AuthExpired(u16),
    /// The availability API answered with an unexpected status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// No access token could be obtained.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// The notification sink refused or failed to deliver a message.
    #[error("Notification failed: {0}")]
    Notification(String),
    /// Snapshot storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl PortError {
    /// Whether the error means the token must be discarded and fetched again.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, PortError::AuthExpired(_))
    }
}

#[async_trait]
/// Supplies bearer tokens for the availability API.
pub trait Authenticator: Send + Sync {
    /// Obtain a fresh access token. May take seconds and must be safe to retry.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Authentication`] when no token could be obtained.
    async fn access_token(&self) -> Result<AccessToken, PortError>;

    /// Release any session the authenticator holds.
    async fn close(&self) {}
}

#[async_trait]
/// Fetches the raw availability of the configured venue.
pub trait AvailabilityPort: Send + Sync {
    /// Request the currently bookable slots.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::AuthExpired`] when the token was rejected, or any other
    /// [`PortError`] when the request or the response decoding failed.
    async fn fetch_slots(&self, token: &AccessToken) -> Result<Vec<RawSlot>, PortError>;
}

#[async_trait]
/// Delivers finished text messages to a chat channel.
pub trait NotificationSink: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Notification`] or a network error when delivery failed.
    async fn send(&self, text: &str) -> Result<(), PortError>;
}

#[async_trait]
/// Keeps the snapshot of the previous successful poll.
pub trait SnapshotStore: Send + Sync {
    /// Load the previous snapshot, `None` when there is none yet.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the stored snapshot cannot be read.
    async fn load(&self) -> Result<Option<Snapshot>, PortError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the snapshot cannot be written.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), PortError>;
}
