//! Cooperative task queue for the single reader event loop.
//!
//! Animation-frame callbacks and fixed-delay timers are both queued here with
//! a due time on a logical clock. The host advances the clock and the session
//! runs whatever came due, earliest first and in scheduling order on ties.

use crate::cancellation::CancellationToken;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Task {
    /// Coalesced handling of scroll notifications.
    ScrollFrame,
    /// Post-paint height measurement of freshly mounted segments.
    Measure { generation: u64, indices: Vec<usize> },
    /// One seek of a restoration sequence; the token names the sequence.
    RestoreAttempt { token: CancellationToken },
    RestoreFinish { token: CancellationToken },
    FlushProgress,
}

impl Task {
    pub fn restore_sequence(&self) -> Option<u64> {
        match self {
            Task::RestoreAttempt { token } | Task::RestoreFinish { token } => {
                Some(token.sequence())
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Scheduled {
    due: Duration,
    order: u64,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_order: u64,
    queue: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_after(&mut self, delay: Duration, task: Task) {
        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(Scheduled {
            due: self.now + delay,
            order,
            task,
        });
    }

    /// Remove the earliest task due at or before `deadline` and move the
    /// clock to its due time.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<Task> {
        let pos = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, item)| item.due <= deadline)
            .min_by_key(|(_, item)| (item.due, item.order))
            .map(|(pos, _)| pos)?;
        let item = self.queue.swap_remove(pos);
        self.now = self.now.max(item.due);
        Some(item.task)
    }

    pub fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    /// Drop queued tasks; returns how many were removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&Task) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|item| !predicate(&item.task));
        before - self.queue.len()
    }

    pub fn has_pending(&self, mut predicate: impl FnMut(&Task) -> bool) -> bool {
        self.queue.iter().any(|item| predicate(&item.task))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
