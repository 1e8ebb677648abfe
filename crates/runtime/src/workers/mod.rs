//! Worker tasks that back the runtime orchestration.
//!
//! The session worker owns the engine; every command and timer tick is
//! serialised through its loop.

mod session;

pub use session::{Command, SessionClock, SessionWorker};
