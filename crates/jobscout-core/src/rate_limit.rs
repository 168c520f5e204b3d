//! Per-source request budgets.
//!
//! Every [`JobSource`] declares how many calls it accepts per window.
//! [`RateLimiter::authorize`] consumes one unit of that budget or reports
//! that the source must be skipped for the current request. A denial is not
//! an error: the aggregator simply leaves the source out.
//!
//! # Example
//!
//! ```rust
//! use jobscout_core::models::JobSource;
//! use jobscout_core::rate_limit::RateLimiter;
//! use jobscout_core::registry::SourceRegistry;
//!
//! let registry = SourceRegistry::new(vec![
//!     JobSource::new("RemoteOK", "remoteok", 1).with_rate_limit(1, 60),
//! ])
//! .unwrap();
//! let limiter = RateLimiter::new(&registry);
//!
//! assert!(limiter.authorize("RemoteOK"));
//! assert!(!limiter.authorize("RemoteOK"));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::registry::SourceRegistry;

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

/// Fixed-window budget for one source.
#[derive(Debug)]
struct Budget {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl Budget {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Acquires the window lock, recovering from poison if necessary.
    fn lock(&self) -> MutexGuard<'_, Window> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Roll the window over if it has elapsed.
    fn refresh(&self, state: &mut Window) {
        if state.started.elapsed() >= self.window {
            state.started = Instant::now();
            state.used = 0;
        }
    }

    fn try_consume(&self) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut state = self.lock();
        self.refresh(&mut state);
        if state.used < self.limit {
            state.used += 1;
            true
        } else {
            false
        }
    }

    fn remaining(&self) -> Option<u32> {
        if self.limit == 0 {
            return None;
        }
        let mut state = self.lock();
        self.refresh(&mut state);
        Some(self.limit - state.used)
    }
}

/// Thread-safe rate limiter keyed by source name.
///
/// The set of sources is fixed at construction; each source's counter sits
/// behind its own mutex, held only for the check-and-decrement.
#[derive(Debug)]
pub struct RateLimiter {
    budgets: HashMap<String, Budget>,
}

impl RateLimiter {
    /// Build budgets from each source's `rate_limit` and `rate_window_secs`.
    pub fn new(registry: &SourceRegistry) -> Self {
        let budgets = registry
            .all()
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    Budget::new(s.rate_limit, Duration::from_secs(s.rate_window_secs)),
                )
            })
            .collect();
        Self { budgets }
    }

    /// Like [`new`](Self::new) but with the same window length for every source.
    pub fn with_window(registry: &SourceRegistry, window: Duration) -> Self {
        let budgets = registry
            .all()
            .iter()
            .map(|s| (s.name.clone(), Budget::new(s.rate_limit, window)))
            .collect();
        Self { budgets }
    }

    /// Consume one unit of `source`'s budget.
    ///
    /// Returns false when the budget for the current window is spent or the
    /// source is unknown.
    pub fn authorize(&self, source: &str) -> bool {
        match self.budgets.get(source) {
            Some(budget) => {
                let granted = budget.try_consume();
                if !granted {
                    tracing::debug!(source = %source, "Rate limit budget exhausted");
                }
                granted
            }
            None => false,
        }
    }

    /// Budget left in the current window, or None if unknown or unlimited.
    pub fn remaining(&self, source: &str) -> Option<u32> {
        self.budgets.get(source).and_then(Budget::remaining)
    }
}
