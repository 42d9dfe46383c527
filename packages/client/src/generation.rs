//! Request generations for stale-response suppression.
//!
//! Each refresh of a view takes a fresh [`RequestToken`]. When its response
//! arrives the token is compared with the latest one issued; anything
//! older has been superseded and is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The generation number.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic token issuer for one view.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    /// Creates a tracker that has issued nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Issues a token that supersedes every earlier one.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns `true` if no newer token has been issued since `token`.
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// The most recently issued token, if any.
    #[must_use]
    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_token_supersedes_older() {
        let tracker = RequestTracker::new();
        assert!(tracker.latest().is_none());

        let first = tracker.begin();
        assert!(tracker.is_current(first));

        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        assert_eq!(tracker.latest(), Some(second));
        assert!(second > first);
    }

    #[test]
    fn tokens_display_their_generation() {
        let tracker = RequestTracker::new();
        tracker.begin();
        assert_eq!(tracker.begin().to_string(), "#2");
    }
}
