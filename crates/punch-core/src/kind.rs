//! Punch kind enum as the single source of truth for punch type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical punch kinds for attendance tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunchKind {
    CheckIn,
    CheckOut,
}

impl PunchKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }
}

impl fmt::Display for PunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PunchKind {
    type Err = UnknownPunchKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in" | "checkin" | "check-in" => Ok(Self::CheckIn),
            "check_out" | "checkout" | "check-out" => Ok(Self::CheckOut),
            _ => Err(UnknownPunchKind(s.to_string())),
        }
    }
}

impl Serialize for PunchKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PunchKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unrecognized punch kind strings.
///
/// A punch must be either a check-in or a check-out; anything else is a
/// caller error and is never coerced.
#[derive(Debug, Clone)]
pub struct UnknownPunchKind(String);

impl fmt::Display for UnknownPunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown punch kind: {}", self.0)
    }
}

impl std::error::Error for UnknownPunchKind {}
