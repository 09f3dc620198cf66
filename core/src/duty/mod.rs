//! Duty timeline model
//!
//! This module provides:
//! - **DutyDescriptor**: static timeline definition fetched per zone
//!   (variables, mechanics, phases, transitions)
//! - **Trigger** matching: the authoritative event filter behind the
//!   listener index
//! - Load-time validation so the interpreter can index by position

mod definition;
mod error;
mod loader;

pub use definition::*;
pub use error::ConfigError;
pub use loader::load_descriptor_from_file;
