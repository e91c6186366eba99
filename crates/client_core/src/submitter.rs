//! Ride creation and interpretation of the immediate create response.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use shared::{
    domain::{CompletionCode, RideStatus, RiderId},
    protocol::{CreateRideRequest, CreateRideResponse},
};
use tracing::{debug, info};

use crate::{
    error::{LifecycleError, LifecycleResult},
    store::{Ride, MAX_PASSENGERS, MIN_PASSENGERS},
    transport::{ApiReply, RideApi},
};

/// What the rider filled in on the request form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub num_passengers: u8,
    pub ada_required: bool,
}

impl Default for RideRequest {
    fn default() -> Self {
        Self {
            pickup_location: String::new(),
            dropoff_location: String::new(),
            pickup_time: None,
            num_passengers: MIN_PASSENGERS,
            ada_required: false,
        }
    }
}

impl RideRequest {
    /// Checks the form locally and builds the create body. Pickup times in
    /// the past are accepted; the picker is expected to prevent them.
    pub fn validate(&self, rider: &RiderId) -> LifecycleResult<CreateRideRequest> {
        let pickup = self.pickup_location.trim();
        let dropoff = self.dropoff_location.trim();
        if pickup.is_empty() {
            return Err(LifecycleError::Validation("pickup location is required".into()));
        }
        if dropoff.is_empty() {
            return Err(LifecycleError::Validation("dropoff location is required".into()));
        }
        let Some(pickup_time) = self.pickup_time else {
            return Err(LifecycleError::Validation("pickup time is required".into()));
        };
        if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&self.num_passengers) {
            return Err(LifecycleError::Validation(format!(
                "passenger count must be between {MIN_PASSENGERS} and {MAX_PASSENGERS}"
            )));
        }
        if rider.as_str().trim().is_empty() {
            return Err(LifecycleError::Validation("rider username is required".into()));
        }

        Ok(CreateRideRequest {
            username: rider.clone(),
            pickup_location: pickup.to_string(),
            dropoff_location: dropoff.to_string(),
            num_passengers: self.num_passengers,
            ada_required: self.ada_required,
            pickup_time,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A driver was available immediately.
    Assigned(Ride),
    /// The ride joined the queue. A code sent along with the queued reply is
    /// held here until the assignment arrives.
    Queued {
        ride: Ride,
        held_code: Option<CompletionCode>,
    },
}

impl SubmitOutcome {
    pub fn ride(&self) -> &Ride {
        match self {
            Self::Assigned(ride) | Self::Queued { ride, .. } => ride,
        }
    }
}

pub struct RideSubmitter {
    api: Arc<dyn RideApi>,
}

impl RideSubmitter {
    pub fn new(api: Arc<dyn RideApi>) -> Self {
        Self { api }
    }

    /// Validates and sends one create request. Never retries: a second
    /// attempt is always an explicit user action.
    pub async fn submit(
        &self,
        rider: &RiderId,
        request: &RideRequest,
    ) -> LifecycleResult<SubmitOutcome> {
        let body = request.validate(rider)?;
        let reply = self.api.create_ride(&body).await?;
        debug!(status = reply.status.as_u16(), "ride: create reply");
        interpret_create_reply(&reply, &body)
    }
}

/// Branches on the status code only: 201 is an immediate assignment, 200 a
/// queued ride, anything else a rejection.
pub fn interpret_create_reply(
    reply: &ApiReply,
    request: &CreateRideRequest,
) -> LifecycleResult<SubmitOutcome> {
    let assigned = match reply.status {
        StatusCode::CREATED => true,
        StatusCode::OK => false,
        _ => return Err(reply.rejection("ride request failed")),
    };

    let body: CreateRideResponse = reply.json().map_err(|err| {
        LifecycleError::rejected(
            reply.status.as_u16(),
            format!("unexpected ride service response: {err}"),
        )
    })?;
    let malformed = |what: &str| {
        LifecycleError::rejected(
            reply.status.as_u16(),
            format!("ride service response is missing {what}"),
        )
    };

    let ride_id = body.ride_id.ok_or_else(|| malformed("the ride id"))?;
    let mut ride = Ride {
        id: ride_id,
        rider_id: request.username.clone(),
        driver_id: None,
        pickup_location: request.pickup_location.clone(),
        dropoff_location: request.dropoff_location.clone(),
        pickup_time: Some(request.pickup_time),
        num_passengers: request.num_passengers,
        ada_required: request.ada_required,
        queue_position: None,
        status: RideStatus::Queued,
        completion_code: None,
        cancel_reason: None,
    };

    if assigned {
        let driver = body.driver.ok_or_else(|| malformed("the driver"))?;
        let code = body
            .ride_code
            .ok_or_else(|| malformed("the completion code"))?;
        ride.status = if body.in_progress.unwrap_or(false) {
            RideStatus::InProgress
        } else {
            RideStatus::Assigned
        };
        ride.driver_id = Some(driver);
        ride.completion_code = Some(code);
        info!(ride_id = %ride.id, status = %ride.status, "ride: assigned on create");
        return Ok(SubmitOutcome::Assigned(ride));
    }

    let position = body
        .queue_position
        .ok_or_else(|| malformed("the queue position"))?;
    // Position 0 and 1 both mean "next up".
    ride.queue_position = Some(position.max(1));
    info!(ride_id = %ride.id, position, "ride: queued on create");
    Ok(SubmitOutcome::Queued {
        ride,
        held_code: body.ride_code,
    })
}

#[cfg(test)]
#[path = "tests/submitter_tests.rs"]
mod tests;
