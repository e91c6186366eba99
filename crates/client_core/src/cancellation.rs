//! Two-step ride cancellation: pick a reason, then confirm.
//!
//! Only a [`ConfirmedCancellation`] can be submitted, and the only way to
//! get one is [`CancellationDraft::confirm`].

use std::sync::Arc;

use shared::{
    domain::{CancelReason, RideId},
    protocol::EditRideRequest,
};
use tracing::info;

use crate::{
    error::{LifecycleError, LifecycleResult},
    transport::RideApi,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationDraft {
    reason: Option<CancelReason>,
}

impl CancellationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, reason: CancelReason) {
        self.reason = Some(reason);
    }

    /// Picks "Other" with free text. Blank text is allowed.
    pub fn other(&mut self, text: impl Into<String>) {
        self.reason = Some(CancelReason::Other(text.into()));
    }

    pub fn reason(&self) -> Option<&CancelReason> {
        self.reason.as_ref()
    }

    pub fn confirm(self) -> LifecycleResult<ConfirmedCancellation> {
        self.reason
            .map(|reason| ConfirmedCancellation { reason })
            .ok_or_else(|| LifecycleError::Validation("choose a cancellation reason".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCancellation {
    reason: CancelReason,
}

impl ConfirmedCancellation {
    pub fn reason(&self) -> &CancelReason {
        &self.reason
    }

    pub fn text(&self) -> &str {
        self.reason.text()
    }

    fn request(&self) -> EditRideRequest {
        EditRideRequest::cancelled(self.text())
    }
}

pub struct CancellationFlow {
    api: Arc<dyn RideApi>,
}

impl CancellationFlow {
    pub fn new(api: Arc<dyn RideApi>) -> Self {
        Self { api }
    }

    pub async fn submit(
        &self,
        ride_id: RideId,
        cancellation: &ConfirmedCancellation,
    ) -> LifecycleResult<()> {
        self.api
            .edit_ride(ride_id, &cancellation.request())
            .await?
            .into_success("cancelling the ride failed")?;
        info!(ride_id = %ride_id, reason = cancellation.text(), "cancel: acknowledged by ride service");
        Ok(())
    }
}
