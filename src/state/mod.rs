//! State module for tracking fetch progress
//!
//! # Components
//!
//! - `FetchState`: where one target's pagination loop stands (fetching, rate limited, done, failed)
//! - `RateLimitWindow`: the API's rate-limit counters for one response, plus the reset wait

mod fetch_state;
mod rate_limit;

// Re-export main types
pub use fetch_state::FetchState;
pub use rate_limit::{seconds_until_reset, wait_for_reset, RateLimitWindow};
