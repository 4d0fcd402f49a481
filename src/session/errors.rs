//! Error types for browsing sessions

/// Failures raised by a [`BrowserEngine`](super::BrowserEngine) or one of its sessions.
///
/// Only [`SessionError::Transport`] is fatal for a run; every other variant is
/// scoped to the task that hit it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The engine could not produce a session for the address
    #[error("Failed to open session for {address}: {reason}")]
    Open { address: String, reason: String },

    /// A browser operation exceeded its time budget
    #[error("{operation} timeout after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// A CDP command was rejected or failed mid-flight
    #[error("Browser command failed: {0}")]
    Command(String),

    /// The network event subscription could not be produced
    #[error("Event subscription unavailable: {0}")]
    Subscription(String),

    /// The shared browser process stopped answering
    #[error("Browser transport unreachable: {0}")]
    Transport(String),

    /// The session was used after `close()`
    #[error("Session already closed")]
    Closed,
}

impl SessionError {
    /// Whether this failure takes down the shared browser for every task.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
