//! Discriminators for the commands protected by the idempotency ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The command an idempotency record belongs to.
///
/// Stored alongside each ledger row so a key reused across different
/// commands is recognisable when inspecting the table.
///
/// # Example
///
/// ```
/// # use booking_backend::domain::idempotency::CommandEndpoint;
/// let endpoint = CommandEndpoint::CreateReservation;
/// assert_eq!(endpoint.as_str(), "reservations.create");
/// assert_eq!("reservations.create".parse(), Ok(endpoint));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandEndpoint {
    /// Reservation creation.
    #[serde(rename = "reservations.create")]
    CreateReservation,
}

impl CommandEndpoint {
    /// All endpoint variants.
    pub const ALL: [Self; 1] = [Self::CreateReservation];

    /// Returns the database string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateReservation => "reservations.create",
        }
    }
}

impl fmt::Display for CommandEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid command endpoint '{input}'")]
pub struct ParseCommandEndpointError {
    /// The invalid input string.
    pub input: String,
}

impl FromStr for CommandEndpoint {
    type Err = ParseCommandEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| ParseCommandEndpointError {
                input: s.to_owned(),
            })
    }
}
