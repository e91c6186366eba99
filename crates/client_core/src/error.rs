use std::fmt;

use shared::domain::RideStatus;
use thiserror::Error;

use crate::transport::TransportError;

/// Which lifecycle operation currently holds the in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Submission,
    Polling,
    Verification,
    Cancellation,
    LeaveQueue,
    TripStart,
    Lookup,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submission => "ride submission",
            Self::Polling => "queue poll",
            Self::Verification => "completion verification",
            Self::Cancellation => "cancellation",
            Self::LeaveQueue => "queue leave",
            Self::TripStart => "trip start",
            Self::Lookup => "ride lookup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a call was turned away without touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    InFlight(Operation),
    ActiveRide(RideStatus),
}

impl fmt::Display for Busy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InFlight(operation) => write!(f, "{operation} already in progress"),
            Self::ActiveRide(status) => write!(f, "a ride is already active ({status})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid ride request: {0}")]
    Validation(String),
    /// The ride service declined; `message` is shown to the user verbatim.
    #[error("{message}")]
    RequestRejected { status: u16, message: String },
    #[error("failed to connect to ride service: {0}")]
    Connectivity(String),
    #[error("invalid ride transition: {0}")]
    InvalidTransition(String),
    #[error("completion code does not match")]
    CodeMismatch,
    #[error("{0}")]
    OperationInProgress(Busy),
}

impl LifecycleError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RequestRejected {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_transition(detail: impl Into<String>) -> Self {
        Self::InvalidTransition(detail.into())
    }

    /// Errors the user can resolve by simply trying again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connectivity(_) | Self::RequestRejected { .. } | Self::OperationInProgress(_)
        )
    }
}

impl From<TransportError> for LifecycleError {
    fn from(value: TransportError) -> Self {
        Self::Connectivity(value.to_string())
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
