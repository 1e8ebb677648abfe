//! Topic-based event bus for runtime events.
//!
//! Engine events are republished under the topic that matches their concern,
//! so a HUD can follow resources without seeing every effect tick.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::SessionEvent;
