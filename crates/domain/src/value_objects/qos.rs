//! Delivery quality-of-service level requested from the broker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// QoS level passed through to the transport on every send.
///
/// The outbound buffer never interprets it; acknowledgement handling
/// belongs to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery, duplicates possible
    AtLeastOnce,
    /// Assured single delivery
    ExactlyOnce,
}

impl QoS {
    /// Numeric level as used on the wire.
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }

    /// Convert from the numeric wire level.
    pub fn from_level(level: u8) -> Result<Self, DomainError> {
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(DomainError::parse(format!("Unknown QoS level: {}", other))),
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QoS::AtMostOnce => write!(f, "at_most_once"),
            QoS::AtLeastOnce => write!(f, "at_least_once"),
            QoS::ExactlyOnce => write!(f, "exactly_once"),
        }
    }
}

impl FromStr for QoS {
    type Err = DomainError;

    /// Accepts the numeric wire level or the variant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level);
        }
        match s.to_ascii_lowercase().as_str() {
            "at_most_once" | "atmostonce" => Ok(QoS::AtMostOnce),
            "at_least_once" | "atleastonce" => Ok(QoS::AtLeastOnce),
            "exactly_once" | "exactlyonce" => Ok(QoS::ExactlyOnce),
            other => Err(DomainError::parse(format!("Unknown QoS level: {}", other))),
        }
    }
}
