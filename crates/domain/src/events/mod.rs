//! Events raised by the application core.

mod app_event;

pub use app_event::AppEvent;
