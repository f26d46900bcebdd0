//! Provider implementation for court availability using the Mindbody marketplace gateway.

mod auth;

pub use auth::{CommandAuthenticator, StaticAuthenticator};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use courtwatch_core::{
    model::{AccessToken, RawSlot},
    ports::{AvailabilityPort, PortError},
};

const AVAILABILITY_URL: &str =
    "https://prod-mkt-gateway.mindbody.io/v1/location/appointment_services/availability";
const INVENTORY_SOURCE: &str = "MB";
const LOOKAHEAD_DAYS: i64 = 7;

/// Appointment service reference, sent as a JSON string.
#[derive(Debug, Clone, Serialize)]
struct ServiceRef {
    mb_appointment_type_id: u32,
    mb_service_category_id: u32,
    mb_site_id: u32,
    inventory_source: &'static str,
    inventory_category: &'static str,
}

/// Location reference, sent as a JSON string.
#[derive(Debug, Clone, Serialize)]
struct LocationRef {
    mb_site_id: u32,
    mb_location_id: u32,
    mb_master_location_id: u32,
    inventory_source: &'static str,
}

/// Staff reference, sent as a JSON string. `-1` means any staff member.
#[derive(Debug, Clone, Serialize)]
struct StaffRef {
    gateway_id: i32,
    inventory_source: &'static str,
}

/// Body of the availability request.
#[derive(Debug, Serialize)]
struct AvailabilityRequest {
    appointment_service_ref_json: String,
    inventory_source: &'static str,
    location_ref_json: String,
    staff_ref_json: String,
    start_time_from: String,
    start_time_to: String,
}

/// Response from the availability endpoint.
#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    data: AvailabilityData,
}

#[derive(Debug, Deserialize)]
struct AvailabilityData {
    attributes: AvailabilityAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityAttributes {
    start_times: Vec<StartTime>,
}

/// One bookable start time and the staff (courts) free at it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartTime {
    start_time: String, // "2025-05-10T22:00:00Z"
    staff_ids: Vec<String>, // "255904:3"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Mindbody identifiers of the watched venue and appointment type.
pub struct Venue {
    /// Site (business) id.
    pub site_id: u32,
    /// Location id within the site.
    pub location_id: u32,
    /// Marketplace-wide location id.
    pub master_location_id: u32,
    /// Appointment type id.
    pub appointment_type_id: u32,
    /// Service category id.
    pub service_category_id: u32,
}

impl Default for Venue {
    fn default() -> Self {
        Self {
            site_id: 255_904,
            location_id: 1,
            master_location_id: 2_170_439,
            appointment_type_id: 44,
            service_category_id: 8,
        }
    }
}

impl Venue {
    fn request_at(&self, now: DateTime<Utc>) -> Result<AvailabilityRequest, PortError> {
        let service = ServiceRef {
            mb_appointment_type_id: self.appointment_type_id,
            mb_service_category_id: self.service_category_id,
            mb_site_id: self.site_id,
            inventory_source: INVENTORY_SOURCE,
            inventory_category: "appointment",
        };
        let location = LocationRef {
            mb_site_id: self.site_id,
            mb_location_id: self.location_id,
            mb_master_location_id: self.master_location_id,
            inventory_source: INVENTORY_SOURCE,
        };
        let staff = StaffRef {
            gateway_id: -1,
            inventory_source: INVENTORY_SOURCE,
        };

        Ok(AvailabilityRequest {
            appointment_service_ref_json: serde_json::to_string(&service)?,
            inventory_source: INVENTORY_SOURCE,
            location_ref_json: serde_json::to_string(&location)?,
            staff_ref_json: serde_json::to_string(&staff)?,
            start_time_from: format_timestamp(now),
            start_time_to: format_timestamp(now + TimeDelta::days(LOOKAHEAD_DAYS)),
        })
    }
}

/// Availability lookups for one Mindbody venue.
pub struct MindbodyAvailability {
    client: Client,
    venue: Venue,
    url: String,
}

impl MindbodyAvailability {
    /// Create a port for `venue` bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, venue: Venue) -> Self {
        Self {
            client,
            venue,
            url: AVAILABILITY_URL.to_owned(),
        }
    }

    /// Point the port at a different endpoint, e.g. a staging gateway.
    #[must_use]
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl AvailabilityPort for MindbodyAvailability {
    async fn fetch_slots(&self, token: &AccessToken) -> Result<Vec<RawSlot>, PortError> {
        let body = self.venue.request_at(Utc::now())?;
        debug!(url = %self.url, from = %body.start_time_from, "Requesting availability");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        check_status(response.status())?;
        let bytes = response.bytes().await?;
        decode_slots(&bytes)
    }
}

/// UTC, millisecond precision, literal `Z` suffix.
fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// 400 and 401 both mean the gateway no longer accepts the token.
fn check_status(status: StatusCode) -> Result<(), PortError> {
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        return Err(PortError::AuthExpired(status.as_u16()));
    }
    if !status.is_success() {
        return Err(PortError::Status(status.as_u16()));
    }
    Ok(())
}

fn decode_slots(bytes: &[u8]) -> Result<Vec<RawSlot>, PortError> {
    let response: AvailabilityResponse = serde_json::from_slice(bytes)?;

    Ok(response
        .data
        .attributes
        .start_times
        .into_iter()
        .map(|entry| RawSlot {
            start_time: entry.start_time,
            resource_tags: entry.staff_ids,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 18, 30, 5)
            .single()
            .expect("unambiguous instant")
    }

    #[test]
    fn request_body_matches_the_gateway_contract() {
        let body = Venue::default().request_at(fixed_now()).expect("serializable");
        let json = serde_json::to_value(&body).expect("serializable");

        assert_eq!(json["inventory_source"], "MB");
        assert_eq!(json["start_time_from"], "2025-05-10T18:30:05.000Z");
        assert_eq!(json["start_time_to"], "2025-05-17T18:30:05.000Z");
        assert_eq!(
            json["appointment_service_ref_json"],
            r#"{"mb_appointment_type_id":44,"mb_service_category_id":8,"mb_site_id":255904,"inventory_source":"MB","inventory_category":"appointment"}"#
        );
        assert_eq!(
            json["location_ref_json"],
            r#"{"mb_site_id":255904,"mb_location_id":1,"mb_master_location_id":2170439,"inventory_source":"MB"}"#
        );
        assert_eq!(
            json["staff_ref_json"],
            r#"{"gateway_id":-1,"inventory_source":"MB"}"#
        );
    }

    #[test]
    fn timestamps_never_use_an_offset_suffix() {
        let rendered = format_timestamp(fixed_now());
        assert!(rendered.ends_with('Z'));
        assert!(!rendered.contains("+00:00"));
    }

    #[test]
    fn classifies_statuses() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED),
            Err(PortError::AuthExpired(401))
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_REQUEST),
            Err(PortError::AuthExpired(400))
        ));
        assert!(matches!(
            check_status(StatusCode::SERVICE_UNAVAILABLE),
            Err(PortError::Status(503))
        ));
    }

    #[test]
    fn decodes_start_times() {
        let body = br#"{
            "data": {
                "type": "availability",
                "attributes": {
                    "startTimes": [
                        {"startTime": "2025-05-10T22:00:00Z", "staffIds": ["255904:3", "255904:10"]},
                        {"startTime": "2025-05-10T22:15:00Z", "staffIds": ["255904:4"]}
                    ]
                }
            }
        }"#;

        let slots = decode_slots(body).expect("valid body");
        assert_eq!(
            slots,
            vec![
                RawSlot::new("2025-05-10T22:00:00Z", ["255904:3", "255904:10"]),
                RawSlot::new("2025-05-10T22:15:00Z", ["255904:4"]),
            ]
        );
    }

    #[test]
    fn unexpected_shape_is_a_decode_error() {
        let err = decode_slots(br#"{"errors": [{"detail": "nope"}]}"#).expect_err("wrong shape");
        assert!(matches!(err, PortError::Decode(_)));
    }
}
