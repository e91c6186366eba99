use std::sync::Arc;

use shared::{
    domain::{CompletionCode, RideId, RideStatus, COMPLETION_CODE_LEN},
    protocol::EditRideRequest,
};
use tracing::{debug, info};

use crate::{
    error::{LifecycleError, LifecycleResult},
    transport::RideApi,
};

/// Four single-digit slots with a focus cursor, as on the driver's
/// completion screen. Navigation only; verification reads [`CodeEntry::value`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    slots: [Option<char>; COMPLETION_CODE_LEN],
    focus: usize,
}

impl CodeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn slots(&self) -> &[Option<char>; COMPLETION_CODE_LEN] {
        &self.slots
    }

    /// Fills the focused slot and moves focus to the next one. Anything but
    /// an ASCII digit is ignored.
    pub fn input(&mut self, ch: char) -> bool {
        if !ch.is_ascii_digit() {
            return false;
        }
        self.slots[self.focus] = Some(ch);
        if self.focus + 1 < COMPLETION_CODE_LEN {
            self.focus += 1;
        }
        true
    }

    /// Clears the focused slot, or steps back when it is already empty.
    pub fn backspace(&mut self) {
        if self.slots[self.focus].take().is_none() && self.focus > 0 {
            self.focus -= 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn value(&self) -> Option<String> {
        self.slots.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub struct CompletionCodeVerifier {
    api: Arc<dyn RideApi>,
}

impl CompletionCodeVerifier {
    pub fn new(api: Arc<dyn RideApi>) -> Self {
        Self { api }
    }

    /// Local comparison only. A wrong code can be retried any number of
    /// times.
    pub fn check(expected: Option<&CompletionCode>, entered: &str) -> LifecycleResult<()> {
        let entered = entered.trim();
        if entered.len() != COMPLETION_CODE_LEN || !entered.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LifecycleError::Validation(format!(
                "enter all {COMPLETION_CODE_LEN} digits of the completion code"
            )));
        }
        let Some(expected) = expected else {
            return Err(LifecycleError::invalid_transition(
                "ride has no completion code to verify against",
            ));
        };
        if expected.matches(entered) {
            Ok(())
        } else {
            debug!("completion: code mismatch");
            Err(LifecycleError::CodeMismatch)
        }
    }

    /// Asks the ride service to mark the ride completed.
    pub async fn confirm(&self, ride_id: RideId) -> LifecycleResult<()> {
        self.api
            .edit_ride(ride_id, &EditRideRequest::status(RideStatus::Completed))
            .await?
            .into_success("completing the ride failed")?;
        info!(ride_id = %ride_id, "completion: acknowledged by ride service");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/completion_tests.rs"]
mod tests;
