//! Single source of truth for the active ride.
//!
//! Every write goes through [`RideStateStore::insert`] or
//! [`RideStateStore::set`], both of which re-check the ride invariants and
//! leave the stored ride untouched when a check fails.

use chrono::{DateTime, Utc};
use shared::domain::{CompletionCode, DriverId, RideId, RideStatus, RiderId};

use crate::error::{LifecycleError, LifecycleResult};

pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ride {
    pub id: RideId,
    pub rider_id: RiderId,
    pub driver_id: Option<DriverId>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_time: Option<DateTime<Utc>>,
    pub num_passengers: u8,
    pub ada_required: bool,
    pub queue_position: Option<u32>,
    pub status: RideStatus,
    pub completion_code: Option<CompletionCode>,
    pub cancel_reason: Option<String>,
}

/// One field of a [`RidePatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Field<T> {
    fn apply(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = Some(value),
            Self::Clear => *slot = None,
        }
    }
}

/// Partial update merged into the stored ride by [`RideStateStore::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RidePatch {
    pub status: Option<RideStatus>,
    pub driver_id: Field<DriverId>,
    pub queue_position: Field<u32>,
    pub completion_code: Field<CompletionCode>,
    pub cancel_reason: Field<String>,
}

impl RidePatch {
    pub fn queue_position(position: u32) -> Self {
        Self {
            queue_position: Field::Set(position),
            ..Self::default()
        }
    }

    pub fn assigned(driver_id: DriverId, code: CompletionCode) -> Self {
        Self {
            status: Some(RideStatus::Assigned),
            driver_id: Field::Set(driver_id),
            queue_position: Field::Clear,
            completion_code: Field::Set(code),
            ..Self::default()
        }
    }

    pub fn in_progress() -> Self {
        Self {
            status: Some(RideStatus::InProgress),
            ..Self::default()
        }
    }

    pub fn completed() -> Self {
        Self {
            status: Some(RideStatus::Completed),
            completion_code: Field::Clear,
            ..Self::default()
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            status: Some(RideStatus::Cancelled),
            completion_code: Field::Clear,
            cancel_reason: Field::Set(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct RideStateStore {
    ride: Option<Ride>,
}

impl RideStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Ride> {
        self.ride.as_ref()
    }

    pub fn status(&self) -> Option<RideStatus> {
        self.ride.as_ref().map(|ride| ride.status)
    }

    /// The ride that blocks a new request, if any.
    pub fn active(&self) -> Option<&Ride> {
        self.ride.as_ref().filter(|ride| ride.status.is_active())
    }

    /// Stores a freshly created or restored ride. A ride in a terminal
    /// status may be replaced; an active one may not.
    pub fn insert(&mut self, ride: Ride) -> LifecycleResult<Ride> {
        if let Some(current) = self.active() {
            return Err(LifecycleError::invalid_transition(format!(
                "ride {} is still {}",
                current.id, current.status
            )));
        }
        if !ride.status.is_active() {
            return Err(LifecycleError::invalid_transition(format!(
                "a new ride cannot start as {}",
                ride.status
            )));
        }
        check_invariants(&ride)?;
        self.ride = Some(ride.clone());
        Ok(ride)
    }

    pub fn set(&mut self, patch: RidePatch) -> LifecycleResult<Ride> {
        let Some(current) = self.ride.as_ref() else {
            return Err(LifecycleError::invalid_transition("no active ride to update"));
        };

        let mut next = current.clone();
        if let Some(status) = patch.status {
            if !is_allowed_transition(current.status, status) {
                return Err(LifecycleError::invalid_transition(format!(
                    "{} -> {status} is not allowed",
                    current.status
                )));
            }
            next.status = status;
        }
        patch.driver_id.apply(&mut next.driver_id);
        patch.queue_position.apply(&mut next.queue_position);
        patch.completion_code.apply(&mut next.completion_code);
        patch.cancel_reason.apply(&mut next.cancel_reason);

        check_invariants(&next)?;
        self.ride = Some(next.clone());
        Ok(next)
    }

    pub fn clear(&mut self) -> Option<Ride> {
        self.ride.take()
    }
}

pub fn is_allowed_transition(from: RideStatus, to: RideStatus) -> bool {
    use RideStatus::*;

    from == to
        || matches!(
            (from, to),
            (Queued, Assigned)
                | (Queued, InProgress)
                | (Assigned, InProgress)
                | (Assigned, Completed)
                | (Assigned, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
}

fn check_invariants(ride: &Ride) -> LifecycleResult<()> {
    let status = ride.status;

    if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&ride.num_passengers) {
        return Err(LifecycleError::invalid_transition(format!(
            "passenger count {} outside {MIN_PASSENGERS}..={MAX_PASSENGERS}",
            ride.num_passengers
        )));
    }

    if ride.completion_code.is_some() != status.holds_completion_code() {
        return Err(LifecycleError::invalid_transition(if status.holds_completion_code() {
            format!("{status} ride requires a completion code")
        } else {
            format!("{status} ride cannot hold a completion code")
        }));
    }

    match (status, ride.queue_position) {
        (RideStatus::Queued, None) => {
            return Err(LifecycleError::invalid_transition(
                "queued ride requires a queue position",
            ));
        }
        (RideStatus::Queued, Some(0)) => {
            return Err(LifecycleError::invalid_transition(
                "queue position starts at 1",
            ));
        }
        (RideStatus::Queued, Some(_)) | (_, None) => {}
        (_, Some(_)) => {
            return Err(LifecycleError::invalid_transition(format!(
                "{status} ride cannot hold a queue position"
            )));
        }
    }

    if status.holds_completion_code() && ride.driver_id.is_none() {
        return Err(LifecycleError::invalid_transition(format!(
            "{status} ride requires a driver"
        )));
    }

    if ride.cancel_reason.is_some() != (status == RideStatus::Cancelled) {
        return Err(LifecycleError::invalid_transition(
            "cancel reason is recorded exactly when a ride is cancelled",
        ));
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
