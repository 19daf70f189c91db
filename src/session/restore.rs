//! Re-applying a saved reading position after activation.
//!
//! Each activation starts a numbered sequence holding its own cancellation
//! token. Attempts seek toward the target, then retry on a fixed interval
//! until the live target stops moving or attempts run out. One frame after
//! that the lock is released and the final ratio persisted. Tasks of a
//! superseded, reset or finished sequence stay queued; when they come due
//! they find their token cancelled and do nothing.

use super::ReaderSession;
use crate::anchor::Anchor;
use crate::cancellation::CancellationToken;
use crate::progress::ProgressSource;
use crate::scheduler::Task;
use crate::storage::{KeyValueStore, SlotId};
use crate::surface::ReaderSurface;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePhase {
    #[default]
    Idle,
    /// Lock held, first attempt not yet run.
    Locked,
    Seeking,
    /// Target reached (or given up on); waiting one frame to unlock.
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum RestoreTarget {
    Anchor(Anchor),
    Ratio(f64),
}

/// Where one seek put the viewport, and whether it came from a laid-out box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct SeekOutcome {
    pub(super) target: f64,
    pub(super) live: bool,
}

#[derive(Debug, Default)]
pub(super) struct RestoreState {
    phase: RestorePhase,
    sequence: u64,
    token: Option<CancellationToken>,
    slot: Option<SlotId>,
    target: Option<RestoreTarget>,
    attempts: u32,
    last_target: Option<f64>,
}

impl RestoreState {
    /// Take the lock for a new sequence targeting `slot`.
    pub(super) fn begin(
        &mut self,
        slot: SlotId,
        anchor: Option<Anchor>,
        ratio: f64,
    ) -> CancellationToken {
        self.release();
        self.sequence += 1;
        let token = CancellationToken::for_sequence(self.sequence);
        self.phase = RestorePhase::Locked;
        self.token = Some(token.clone());
        self.slot = Some(slot);
        self.target = Some(match anchor {
            Some(anchor) => RestoreTarget::Anchor(anchor),
            None => RestoreTarget::Ratio(ratio),
        });
        self.attempts = 0;
        self.last_target = None;
        token
    }

    pub(super) fn phase(&self) -> RestorePhase {
        self.phase
    }

    pub(super) fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub(super) fn is_locked(&self) -> bool {
        self.phase != RestorePhase::Idle
    }

    /// Drop the lock. Returns whether a sequence was running.
    fn release(&mut self) -> bool {
        let running = self.token.take().inspect(CancellationToken::cancel).is_some();
        self.phase = RestorePhase::Idle;
        self.target = None;
        self.last_target = None;
        running
    }
}

impl<S: ReaderSurface, K: KeyValueStore> ReaderSession<S, K> {
    /// Abandon the running sequence, if any. Its queued tasks are left to
    /// refuse themselves.
    pub(super) fn cancel_restoration(&mut self) -> bool {
        self.restore.release()
    }

    pub(super) fn handle_restore_attempt(&mut self, token: &CancellationToken) {
        if let Err(err) = token.check_cancelled("attempt") {
            debug!("Skipping restore attempt: {err:#}");
            return;
        }
        let sequence = token.sequence();
        let Some(target) = self.restore.target else {
            return;
        };
        self.restore.phase = RestorePhase::Seeking;
        self.restore.attempts += 1;

        let outcome = match target {
            RestoreTarget::Anchor(anchor) => self.seek_anchor(anchor),
            RestoreTarget::Ratio(ratio) => self.seek_ratio(ratio),
        };
        // Programmatic scrolls still notify, as a browser would.
        self.notify_scroll();

        let stable = outcome.live
            && self.restore.last_target.is_some_and(|previous| {
                (previous - outcome.target).abs() <= self.config.stability_epsilon_px
            });
        self.restore.last_target = outcome.live.then_some(outcome.target);
        let attempts = self.restore.attempts;
        trace!(
            sequence,
            attempts,
            target = outcome.target,
            live = outcome.live,
            stable,
            "Restore attempt"
        );

        let exhausted = attempts >= self.config.max_attempts;
        if self.document.is_empty() || stable || exhausted {
            if exhausted && !stable && !self.document.is_empty() {
                info!(
                    sequence,
                    attempts, "Restore attempts exhausted; keeping best-effort position"
                );
            }
            self.restore.phase = RestorePhase::Settling;
            self.scheduler.schedule_after(
                self.config.frame_interval(),
                Task::RestoreFinish {
                    token: token.clone(),
                },
            );
        } else {
            self.scheduler.schedule_after(
                self.config.retry_interval(),
                Task::RestoreAttempt {
                    token: token.clone(),
                },
            );
        }
    }

    pub(super) fn handle_restore_finish(&mut self, token: &CancellationToken) {
        if let Err(err) = token.check_cancelled("finish") {
            debug!("Skipping restore finish: {err:#}");
            return;
        }
        let sequence = token.sequence();
        let slot = self.restore.slot;
        let attempts = self.restore.attempts;
        self.restore.release();

        let ratio = self.renderer.scroll_ratio();
        self.emit(ratio, ProgressSource::Restored);
        if let Some(slot) = slot {
            self.progress.commit(&mut self.storage, slot, ratio);
        }
        info!(
            slot = ?slot.map(|s| s.0),
            sequence,
            attempts,
            ratio,
            top = self.renderer.scroll_top(),
            "Restored reading position"
        );
    }

    /// Scroll so the anchor's segment sits `pixel_offset` above the viewport
    /// top. Uses the laid-out box when there is one, else the height model.
    pub(super) fn seek_anchor(&mut self, anchor: Anchor) -> SeekOutcome {
        if self.document.is_empty() {
            self.renderer.set_scroll_top(0.0);
            return SeekOutcome {
                target: 0.0,
                live: false,
            };
        }
        let index = anchor.segment_index.min(self.document.len() - 1);
        if self.renderer.is_virtualized() && !self.renderer.window().contains(index) {
            let window = self.renderer.window_around(index);
            debug!(
                index,
                start = window.start,
                end = window.end,
                "Rendering around anchor"
            );
            self.ensure_window(window);
        }
        let (base, live) = match self.renderer.segment_box(index) {
            Some(b) => (b.top, true),
            None => (self.heights.estimated_top(index), false),
        };
        let target = base + anchor.pixel_offset;
        self.renderer.set_scroll_top(target);
        SeekOutcome { target, live }
    }

    fn seek_ratio(&mut self, ratio: f64) -> SeekOutcome {
        if self.renderer.is_virtualized() {
            let approx = ratio * self.renderer.max_scroll();
            let window = self.window_for_offset(approx);
            self.ensure_window(window);
        }
        let target = ratio * self.renderer.max_scroll();
        self.renderer.set_scroll_top(target);
        SeekOutcome {
            target,
            live: true,
        }
    }
}
