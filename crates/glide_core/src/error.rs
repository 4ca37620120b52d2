//! Glide error types

use thiserror::Error;

/// Errors surfaced by targets and tick drivers
#[derive(Error, Debug)]
pub enum GlideError {
    /// A target rejected a write for a key it does not own
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// The target was dropped while an operation still needed it
    #[error("Animation target is no longer reachable")]
    TargetReleased,

    /// The frame ticker could not start its thread
    #[error("Failed to spawn ticker thread: {0}")]
    TickerSpawn(#[from] std::io::Error),

    /// The frame ticker has already been shut down
    #[error("Ticker has been stopped")]
    TickerStopped,
}

/// Result type for Glide operations
pub type Result<T> = std::result::Result<T, GlideError>;
