//! Sliding-window limiter for outbound inference calls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Length of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Default quota used by the hosted-inference backend.
pub const DEFAULT_REQUESTS_PER_MINUTE: usize = 30;

/// Tracks accepted calls over the last minute and rejects calls beyond the quota.
///
/// One limiter is shared (behind an `Arc`) by everything that talks to the
/// same upstream. Pruning and recording happen under a single lock, so
/// concurrent callers can never push the window past `quota`.
pub struct RateLimiter {
    quota: usize,
    /// Accepted call timestamps, oldest first.
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(quota: usize) -> Self {
        Self {
            quota,
            calls: Mutex::new(VecDeque::with_capacity(quota)),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Returns `true` and records the call if it fits in the current window.
    pub fn can_make_request(&self) -> bool {
        self.check_at(Instant::now())
    }

    /// Same as [`can_make_request`](Self::can_make_request) with an explicit clock.
    pub(crate) fn check_at(&self, now: Instant) -> bool {
        // The deque is always left consistent, so a poisoned lock is still usable.
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) >= WINDOW {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.quota {
            calls.push_back(now);
            true
        } else {
            false
        }
    }

    /// Number of calls currently counted against the quota.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < WINDOW)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_rejects_over_quota_then_recovers_after_window() {
        let limiter = RateLimiter::new(3);
        let t0 = Instant::now();

        assert!(limiter.check_at(t0));
        assert!(limiter.check_at(t0));
        assert!(limiter.check_at(t0));
        assert!(!limiter.check_at(t0));

        assert!(limiter.check_at(t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_record_exactly_window_old_is_expired() {
        let limiter = RateLimiter::new(1);
        let t0 = Instant::now();

        assert!(limiter.check_at(t0));
        assert!(!limiter.check_at(t0 + Duration::from_secs(59)));
        assert!(limiter.check_at(t0 + WINDOW));
    }

    #[test]
    fn test_rejected_calls_are_not_recorded() {
        let limiter = RateLimiter::new(2);
        let t0 = Instant::now();

        assert!(limiter.check_at(t0));
        assert!(limiter.check_at(t0 + Duration::from_secs(30)));
        for s in 31..60 {
            assert!(!limiter.check_at(t0 + Duration::from_secs(s)));
        }

        // Only the first call has aged out; the second still counts.
        assert!(limiter.check_at(t0 + Duration::from_secs(60)));
        assert!(!limiter.check_at(t0 + Duration::from_secs(61)));
        assert!(limiter.check_at(t0 + Duration::from_secs(90)));
    }

    #[test]
    fn test_zero_quota_rejects_everything() {
        let limiter = RateLimiter::new(0);
        assert!(!limiter.can_make_request());
        assert!(!limiter.can_make_request());
    }

    #[test]
    fn test_default_quota() {
        assert_eq!(RateLimiter::default().quota(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_with_clock() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.can_make_request());
        }
        assert!(!limiter.can_make_request());
        assert_eq!(limiter.in_flight(), 3);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(limiter.in_flight(), 0);
        assert!(limiter.can_make_request());
    }

    #[test]
    fn test_concurrent_callers_never_exceed_quota() {
        let limiter = Arc::new(RateLimiter::new(30));
        let accepted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let accepted = accepted.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        if limiter.can_make_request() {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(accepted.load(Ordering::SeqCst), 30);
    }
}
