// Birdie - conversational relay for the disc golf stats dashboard
// Library exports

// Core modules
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod providers;
pub mod relay;
pub mod server;

pub use error::{RelayError, Result};
