// Charles Control API
// Client and error types for the proxy's local administrative endpoints

pub mod client;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ControlClient, QuitOutcome};
pub use error::{ControlError, ControlResult};
