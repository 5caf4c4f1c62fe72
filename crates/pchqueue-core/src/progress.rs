//! Progress accounting for pending and finished PCH tasks.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Tracks how many tasks are known in total and how many have finished.
pub trait ProgressCounter: Send + Sync {
    /// Announce `count` additional tasks.
    fn add_total(&self, count: usize);

    /// Withdraw `count` tasks that will never run.
    fn remove_total(&self, count: usize);

    /// Record `count` finished tasks.
    fn add_progress(&self, count: usize);
}

type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Thread-safe counter that reports `(progress, total)` to a callback on
/// every change. Once progress catches up with the total both reset to zero,
/// so the next batch of work starts a fresh count.
pub struct SharedProgressCounter {
    state: Mutex<ProgressState>,
    callback: ProgressCallback,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ProgressState {
    progress: usize,
    total: usize,
}

impl SharedProgressCounter {
    pub fn new(callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(ProgressState::default()),
            callback: Box::new(callback),
        }
    }

    /// A counter nobody listens to.
    pub fn silent() -> Self {
        Self::new(|_, _| {})
    }

    /// Current `(progress, total)`.
    pub fn snapshot(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.progress, state.total)
    }

    fn update(&self, apply: impl FnOnce(&mut ProgressState)) {
        let reported = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut state);
            let reported = *state;
            if state.progress >= state.total {
                *state = ProgressState::default();
            }
            reported
        };

        (self.callback)(reported.progress, reported.total);
    }
}

impl fmt::Debug for SharedProgressCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (progress, total) = self.snapshot();
        f.debug_struct("SharedProgressCounter")
            .field("progress", &progress)
            .field("total", &total)
            .finish()
    }
}

impl ProgressCounter for SharedProgressCounter {
    fn add_total(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.update(|state| state.total += count);
    }

    fn remove_total(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.update(|state| state.total = state.total.saturating_sub(count));
    }

    fn add_progress(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.update(|state| state.progress += count);
    }
}
