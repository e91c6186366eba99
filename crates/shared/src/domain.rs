use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(RideId);
name_newtype!(RiderId);
name_newtype!(DriverId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rider" | "r" => Some(Self::Rider),
            "driver" | "d" => Some(Self::Driver),
            _ => None,
        }
    }
}

/// Lifecycle status of a ride as reported by the ride service.
///
/// The service calls the queued state `pending`; `queued` is accepted on
/// input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    #[serde(rename = "pending", alias = "queued")]
    Queued,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Queued => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Queued, assigned and in-progress rides block a new request.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Assigned | Self::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn holds_completion_code(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

pub const COMPLETION_CODE_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("completion code must be exactly {COMPLETION_CODE_LEN} digits, got {0:?}")]
pub struct InvalidCompletionCode(pub String);

/// The four-digit secret the rider hands to the driver to close a ride.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompletionCode(String);

impl CompletionCode {
    pub fn parse(value: &str) -> Result<Self, InvalidCompletionCode> {
        let trimmed = value.trim().trim_matches('"');
        if trimmed.len() == COMPLETION_CODE_LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(InvalidCompletionCode(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, entered: &str) -> bool {
        self.0 == entered
    }
}

impl fmt::Debug for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionCode(****)")
    }
}

impl fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CompletionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CompletionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u32),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            // Numeric codes lose their leading zeros on the wire.
            Raw::Number(number) => format!("{number:04}"),
        };
        CompletionCode::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Why a rider cancelled. The preset variants mirror the picker offered in
/// the rider view; `Other` carries free text and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    ChangeOfPlans,
    DriverDelay,
    FoundAlternateTransport,
    WrongPickup,
    RequestedByMistake,
    Other(String),
}

impl CancelReason {
    pub fn text(&self) -> &str {
        match self {
            Self::ChangeOfPlans => "Change of plans",
            Self::DriverDelay => "Driver delay",
            Self::FoundAlternateTransport => "Found alternate transport",
            Self::WrongPickup => "Wrong pickup location",
            Self::RequestedByMistake => "Requested by mistake",
            Self::Other(text) => text,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
