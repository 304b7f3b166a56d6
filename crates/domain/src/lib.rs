//! pubrelay domain types.
//!
//! Topics, QoS levels, the buffered-event entity and the application events
//! that get relayed to the broker. No I/O lives here.

pub mod entities;
pub mod error;
pub mod events;
pub mod value_objects;

pub use entities::BufferedEvent;
pub use error::DomainError;
pub use events::AppEvent;
pub use value_objects::{QoS, Topic};
