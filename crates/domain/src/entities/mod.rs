//! Domain entities

mod buffered_event;

pub use buffered_event::BufferedEvent;
