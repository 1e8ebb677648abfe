//! Terminal client for a clicker session.
//!
//! # Architecture
//!
//! ```text
//! App (composition root)
//!   ├─→ ContentFactory (RON/TOML data)
//!   ├─→ Runtime (session worker, event bus)
//!   └─→ stdin command loop (via RuntimeHandle only)
//! ```

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;

pub use app::App;
pub use commands::{ParseError, Request};
pub use config::ClientConfig;
