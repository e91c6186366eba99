use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{CompletionCode, DriverId, RideId, RideStatus, RiderId};

/// Body of `POST /rides/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRideRequest {
    pub username: RiderId,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub num_passengers: u8,
    #[serde(rename = "ADA_required")]
    pub ada_required: bool,
    pub pickup_time: DateTime<Utc>,
}

/// Body returned by `POST /rides/create`. Which fields are present depends on
/// the status code: 201 carries the driver and code, 200 the queue position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRideResponse {
    #[serde(
        default,
        deserialize_with = "lenient_ride_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub ride_id: Option<RideId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_code: Option<CompletionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(
        rename = "inProgress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub in_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body returned by `GET /rides/queue-position/{rider}`: 200 carries the
/// position, 202 the assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueuePositionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_ride_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub ride_id: Option<RideId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_code: Option<CompletionCode>,
}

/// Body of `PUT /rides/edit/{ride}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRideRequest {
    pub status: RideStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EditRideRequest {
    pub fn status(status: RideStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            status: RideStatus::Cancelled,
            reason: Some(reason.into()),
        }
    }
}

/// A stored ride as returned by the lookup endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RideRecord {
    #[serde(
        default,
        alias = "id",
        deserialize_with = "lenient_ride_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub ride_id: Option<RideId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider: Option<RiderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverId>,
    #[serde(default)]
    pub pickup_location: String,
    #[serde(default)]
    pub dropoff_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_passengers: Option<u8>,
    #[serde(rename = "ADA_required", default, skip_serializing_if = "Option::is_none")]
    pub ada_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RideStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_code: Option<CompletionCode>,
}

/// Lookup endpoints answer with either a single record or a list of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RideRecords {
    Many(Vec<RideRecord>),
    One(RideRecord),
}

impl RideRecords {
    pub fn into_first(self) -> Option<RideRecord> {
        match self {
            Self::Many(records) => records.into_iter().next(),
            Self::One(record) => Some(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    pub place_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationSearchResponse {
    #[serde(default)]
    pub predictions: Vec<LocationSuggestion>,
}

/// Ride ids come back as integers from most endpoints and as strings from a
/// few; accept both.
fn lenient_ride_id<'de, D>(deserializer: D) -> Result<Option<RideId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(id)) => Ok(Some(RideId(id))),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(|id| Some(RideId(id)))
            .map_err(|_| serde::de::Error::custom(format!("invalid ride id {text:?}"))),
    }
}
