/// Fetch state definitions for the per-target pagination loop
///
/// A worker walks one target through these states until it reaches
/// `Done` or `Failed`.
use std::fmt;

/// Represents where one target's pagination loop currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    // ===== Active States =====
    /// Requesting the given page
    Fetching { page: u32 },

    /// The API reported an exhausted window while requesting `page`;
    /// the page is re-issued once `reset_at` (epoch seconds) has passed
    RateLimited { page: u32, reset_at: i64 },

    // ===== Terminal States =====
    /// Every page was accumulated
    Done,

    /// The target was abandoned for this round
    Failed(String),
}

impl FetchState {
    /// The state every target starts in
    pub fn start() -> Self {
        Self::Fetching { page: 1 }
    }

    /// Returns true if the pagination loop has nothing left to do
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// The page being worked on, for active states
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Fetching { page } | Self::RateLimited { page, .. } => Some(*page),
            Self::Done | Self::Failed(_) => None,
        }
    }

    /// Short name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching { .. } => "fetching",
            Self::RateLimited { .. } => "rate_limited",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching { page } => write!(f, "fetching page {}", page),
            Self::RateLimited { page, reset_at } => {
                write!(f, "rate limited on page {} until {}", page, reset_at)
            }
            Self::Done => write!(f, "done"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
