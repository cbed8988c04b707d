//! Per-key sliding window rate limiting
//!
//! Every key owns a time-ordered queue of admission instants covering at most
//! the trailing hour. The queue is pruned lazily on each check, so the cost of
//! a check is proportional to that key's recent traffic. Windows are created
//! on first use and live for the lifetime of the process.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::keys::RateLimitConfig;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Which threshold rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitWindow {
    Minute,
    Hour,
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWindow::Minute => write!(f, "minute"),
            LimitWindow::Hour => write!(f, "hour"),
        }
    }
}

/// Details of a rejected admission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub window: LimitWindow,
    pub limit: u32,
    /// Time until the oldest entry of the binding window expires
    pub retry_after: Duration,
}

impl Denial {
    pub fn reason(&self) -> String {
        format!("Rate limit exceeded: {} requests per {}", self.limit, self.window)
    }
}

/// Outcome of [`SlidingWindowLimiter::admit_at`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// Per-minute limit in force
        limit: u32,
        /// Admissions left in the current minute window
        remaining: u32,
    },
    Denied(Denial),
}

/// Dual (per-minute, per-hour) sliding window limiter keyed by credential
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `key` against `config` at `now`; records `now` only when allowed
    pub fn admit_at(&self, key: &str, config: &RateLimitConfig, now: Instant) -> Admission {
        // The map entry guard is held for the whole check-and-append.
        let mut window = match self.windows.get_mut(key) {
            Some(window) => window,
            None => self.windows.entry(key.to_string()).or_default(),
        };

        // Within one key, time never moves backwards.
        let now = window.back().map_or(now, |&last| now.max(last));

        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= HOUR {
                window.pop_front();
            } else {
                break;
            }
        }

        let in_minute = window
            .iter()
            .rev()
            .take_while(|&&t| now.duration_since(t) < MINUTE)
            .count();

        if in_minute >= config.requests_per_minute as usize {
            let oldest = window.len().checked_sub(in_minute).and_then(|i| window.get(i));
            return Admission::Denied(Denial {
                window: LimitWindow::Minute,
                limit: config.requests_per_minute,
                retry_after: retry_after(oldest.copied(), now, MINUTE),
            });
        }

        if window.len() >= config.requests_per_hour as usize {
            return Admission::Denied(Denial {
                window: LimitWindow::Hour,
                limit: config.requests_per_hour,
                retry_after: retry_after(window.front().copied(), now, HOUR),
            });
        }

        window.push_back(now);
        Admission::Allowed {
            limit: config.requests_per_minute,
            remaining: config
                .requests_per_minute
                .saturating_sub(in_minute as u32 + 1),
        }
    }

    /// Number of keys with a window
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

fn retry_after(oldest: Option<Instant>, now: Instant, span: Duration) -> Duration {
    match oldest {
        Some(oldest) => span.saturating_sub(now.duration_since(oldest)),
        None => span,
    }
}

#[cfg(test)]
impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[cfg(test)]
impl SlidingWindowLimiter {
    /// Number of admissions currently retained for `key`
    pub fn recorded(&self, key: &str) -> usize {
        self.windows.get(key).map_or(0, |w| w.len())
    }
}
