use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    /// Time until the current window resets. Zero when admitted.
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client.
///
/// Each key gets `limit` admissions per `window`; the counter resets when the
/// window elapses rather than sliding. Updates for one key happen under that
/// key's shard lock, so concurrent callers cannot both observe a stale count.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn allow(&self, key: &str) -> RateLimitDecision {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started_at);
        if entry.count == 0 || elapsed >= self.window {
            entry.started_at = now;
            entry.count = 1;
            return RateLimitDecision {
                admitted: self.limit > 0,
                retry_after: if self.limit > 0 {
                    Duration::ZERO
                } else {
                    self.window
                },
            };
        }

        entry.count = entry.count.saturating_add(1);
        if entry.count <= self.limit {
            RateLimitDecision {
                admitted: true,
                retry_after: Duration::ZERO,
            }
        } else {
            RateLimitDecision {
                admitted: false,
                retry_after: self.window - elapsed,
            }
        }
    }

    /// Drop windows that have fully elapsed. Returns the number removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.started_at) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
