//! Banking Assistant
//!
//! A demo conversational banking backend that:
//! - Masks PAN-shaped tokens before any text leaves the process
//! - Forwards each turn to a hosted dialog engine
//! - Acts on the lookup directives the engine leaves in its context
//! - Renders account, transaction and branch data as chat markup
//!
//! TURN LOOP:
//! REDACT → DIALOG → DIRECTIVE? → LOOKUP → APPEND | RE-ASK ONCE

pub mod agent;
pub mod api;
pub mod config;
pub mod data;
pub mod dialog;
pub mod directions;
pub mod directive;
pub mod error;
pub mod formatter;
pub mod models;
pub mod privacy;
pub mod vision;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::{TurnOrchestrator, TurnSettings};
