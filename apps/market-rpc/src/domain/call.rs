//! Per-call deadline and cancellation.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Deadline and cancellation handed to the transport untouched.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Maximum duration of the whole call, connection included.
    pub timeout: Option<Duration>,
    /// Token that aborts the call when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    /// Options with no deadline and no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
