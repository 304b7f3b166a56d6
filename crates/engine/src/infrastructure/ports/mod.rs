//! Port traits for infrastructure boundaries.
//!
//! Ports exist for:
//! - The broker transport (could swap any MQTT client library)
//! - Clock (for testing)

mod error;
mod external;
mod testing;

pub use error::TransportError;
pub use external::TransportPort;
pub use testing::ClockPort;

#[cfg(test)]
pub use external::MockTransportPort;
#[cfg(test)]
pub use testing::MockClockPort;
