//! Debounced refresh requests.
//!
//! Every edit asks for a refresh after some delay. A newer request replaces
//! the pending one, so only the last edit in a burst triggers a walk. Time
//! is passed in as a [`Duration`] since an arbitrary origin; the host
//! decides where that comes from.
//!
//! ```
//! use semviz_engine::RefreshScheduler;
//! use std::time::Duration;
//!
//! let ms = Duration::from_millis;
//! let mut s = RefreshScheduler::new();
//! s.request_at(ms(250), ms(0));
//! s.request_at(ms(250), ms(100));
//! assert!(!s.take_due(ms(300)));
//! assert!(s.take_due(ms(350)));
//! ```

use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshScheduler {
    due: Option<Duration>,
    generation: u64,
    superseded: u64,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a refresh `delay` after `now`, replacing any pending one.
    /// Returns the new request's generation.
    pub fn request_at(&mut self, delay: Duration, now: Duration) -> u64 {
        let due = now.saturating_add(delay);
        if let Some(previous) = self.due.replace(due) {
            self.superseded += 1;
            trace!(?previous, ?due, "refresh rescheduled");
        }
        self.generation += 1;
        self.generation
    }

    pub fn has_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due_at(&self, now: Duration) -> bool {
        self.due.is_some_and(|due| now >= due)
    }

    /// Consume the pending request if it is due.
    pub fn take_due(&mut self, now: Duration) -> bool {
        if self.due_at(now) {
            self.due = None;
            true
        } else {
            false
        }
    }

    /// Time left before the pending request is due; zero when overdue.
    pub fn time_until_due(&self, now: Duration) -> Option<Duration> {
        self.due.map(|due| due.saturating_sub(now))
    }

    /// Drop the pending request. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    /// Number of requests made so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of requests replaced before they came due.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
