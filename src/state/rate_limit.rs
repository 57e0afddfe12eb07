use chrono::{DateTime, Utc};
use std::time::Duration;

/// Rate-limit counters reported by the API on one response
///
/// Each worker tracks its own window; nothing here is shared between
/// workers, even when they use the same credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Requests left in the current window
    pub remaining: i64,

    /// Epoch second at which the window resets, if the API sent it
    pub reset_at: Option<i64>,
}

impl RateLimitWindow {
    /// Returns true if the API wants the caller to wait for the reset
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }
}

/// Seconds left until `reset_at`, negative once the reset has passed
pub fn seconds_until_reset(reset_at: i64, now: DateTime<Utc>) -> i64 {
    reset_at - now.timestamp()
}

/// Blocks the calling worker until the rate-limit window has reset
///
/// Polls every `poll_interval` until the wall clock reaches `reset_at`.
/// Returns immediately when the reset time is already in the past.
///
/// # Returns
///
/// The number of polls performed
pub async fn wait_for_reset(reset_at: i64, poll_interval: Duration) -> u32 {
    let mut polls = 0;
    while seconds_until_reset(reset_at, Utc::now()) > 0 {
        tokio::time::sleep(poll_interval).await;
        polls += 1;
    }
    polls
}
