//! The reading session: one document on one surface, with per-slot position
//! persistence.
//!
//! `ReaderSession` owns every engine component and the task queue that drives
//! them. Host events (scrolls, slot switches, layout changes) come in through
//! its methods; queued work runs when the host calls [`ReaderSession::advance`].
//! Progress notifications accumulate until the host drains them with
//! [`ReaderSession::take_progress_updates`].

use crate::anchor::{self, Anchor, AnchorStore};
use crate::config::ReaderConfig;
use crate::height::HeightModel;
use crate::progress::{ProgressSource, ProgressTracker, ProgressUpdate};
use crate::scheduler::{Scheduler, Task};
use crate::segment::{Segment, Segmenter, word_key};
use crate::storage::{KeyValueStore, SlotId, SlotStorage};
use crate::surface::ReaderSurface;
use crate::window::{RenderWindow, WindowRenderer};
use std::time::Duration;
use tracing::{debug, info, trace};

mod restore;
mod scroll;

pub use restore::RestorePhase;
use restore::RestoreState;
use scroll::ScrollState;

pub struct ReaderSession<S: ReaderSurface, K: KeyValueStore> {
    config: ReaderConfig,
    segmenter: Segmenter,
    document: Vec<Segment>,
    heights: HeightModel,
    renderer: WindowRenderer<S>,
    storage: SlotStorage<K>,
    anchors: AnchorStore,
    progress: ProgressTracker,
    scheduler: Scheduler,
    scroll: ScrollState,
    restore: RestoreState,
    active_slot: Option<SlotId>,
    generation: u64,
    updates: Vec<ProgressUpdate>,
}

impl<S: ReaderSurface, K: KeyValueStore> ReaderSession<S, K> {
    pub fn new(config: ReaderConfig, surface: S, store: K) -> Self {
        let config = config.sanitized();
        let renderer = WindowRenderer::new(
            surface,
            config.max_rendered_segments,
            config.virtual_threshold,
        );
        Self {
            segmenter: Segmenter::new(config.language),
            document: Vec::new(),
            heights: HeightModel::new(config.initial_average_height),
            renderer,
            storage: SlotStorage::new(store, config.namespace.clone()),
            anchors: AnchorStore,
            progress: ProgressTracker::new(),
            scheduler: Scheduler::new(),
            scroll: ScrollState::default(),
            restore: RestoreState::default(),
            active_slot: None,
            generation: 0,
            updates: Vec::new(),
            config,
        }
    }

    /// Replace the document. Measurements from the previous text are dropped
    /// and the first window is rendered from the top.
    pub fn compile(&mut self, raw_text: &str) {
        self.generation += 1;
        self.document = self.segmenter.segment(raw_text);
        self.heights.reset();
        self.scheduler
            .cancel_where(|task| matches!(task, Task::Measure { .. }));
        let entered = self.renderer.reset(&self.document, &self.heights);
        debug!(
            generation = self.generation,
            segments = self.document.len(),
            rendered = entered.len(),
            "Compiled reader text"
        );
        self.schedule_measure(entered);
        // Replacing the content moves the viewport back to the top.
        self.notify_scroll();
    }

    /// Make `slot` the active reading slot and begin restoring its saved
    /// position. `stored_ratio` is the slot record's own progress, used when
    /// nothing newer was persisted for it.
    pub fn activate_slot(&mut self, slot: SlotId, stored_ratio: Option<f64>) {
        let in_flight = self.cancel_restoration();
        if in_flight {
            debug!("Superseded an in-flight restoration");
        }

        if let Some(previous) = self.active_slot.filter(|previous| *previous != slot) {
            if in_flight {
                debug!(%previous, "Previous slot was still restoring; not saving its position");
            } else {
                self.persist_position(previous);
            }
        }

        self.active_slot = Some(slot);
        let anchor = self.anchors.load(&self.storage, slot);
        let ratio = self
            .progress
            .stored(&self.storage, slot)
            .or(stored_ratio)
            .map(crate::progress::clamp_ratio)
            .unwrap_or(0.0);
        info!(
            %slot,
            ratio,
            anchor = ?anchor.map(|a| (a.segment_index, a.pixel_offset)),
            "Activating reading slot"
        );
        let token = self.restore.begin(slot, anchor, ratio);
        self.emit(ratio, ProgressSource::Provisional);
        self.scheduler
            .schedule_after(self.config.frame_interval(), Task::RestoreAttempt { token });
    }

    /// Activate `slot`, then load its text.
    pub fn open_slot(&mut self, slot: SlotId, stored_ratio: Option<f64>, raw_text: &str) {
        self.activate_slot(slot, stored_ratio);
        self.compile(raw_text);
    }

    /// The host scrolled the viewport to `px`.
    pub fn user_scrolled_to(&mut self, px: f64) {
        self.renderer.set_scroll_top(px);
        self.notify_scroll();
    }

    /// Queue a scroll frame unless one is already pending.
    pub fn notify_scroll(&mut self) {
        if self.scroll.frame_pending {
            return;
        }
        self.scroll.frame_pending = true;
        self.scheduler
            .schedule_after(self.config.frame_interval(), Task::ScrollFrame);
    }

    /// Move the clock forward by `elapsed`, running every task that comes due.
    pub fn advance(&mut self, elapsed: Duration) {
        let deadline = self.scheduler.now() + elapsed;
        while let Some(task) = self.scheduler.pop_due(deadline) {
            self.run_task(task);
        }
        self.scheduler.advance_clock(deadline);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::ScrollFrame => self.handle_scroll_frame(),
            Task::Measure {
                generation,
                indices,
            } => {
                if generation == self.generation {
                    self.measure(&indices);
                } else {
                    trace!(generation, "Skipping measurement of replaced text");
                }
            }
            Task::RestoreAttempt { token } => self.handle_restore_attempt(&token),
            Task::RestoreFinish { token } => self.handle_restore_finish(&token),
            Task::FlushProgress => self.handle_flush_progress(),
        }
    }

    /// Explicitly save the active slot's anchor and ratio. Refused while a
    /// restoration holds the lock.
    pub fn save_position(&mut self) -> bool {
        if self.restore.is_locked() {
            debug!("Ignoring save while restoring position");
            return false;
        }
        let Some(slot) = self.active_slot else {
            return false;
        };
        self.persist_position(slot);
        true
    }

    /// Forget the saved position of `slot`. An in-flight restoration of that
    /// slot is abandoned.
    pub fn reset_progress(&mut self, slot: SlotId) {
        if self.restore.slot() == Some(slot) && self.cancel_restoration() {
            info!(%slot, "Cancelled restoration for reset slot");
        }
        self.anchors.save(&mut self.storage, slot, None);
        self.progress.commit(&mut self.storage, slot, 0.0);
        if self.active_slot == Some(slot) {
            self.renderer.set_scroll_top(0.0);
            self.emit(0.0, ProgressSource::Live);
        }
        info!(%slot, "Reset reading progress");
    }

    /// Apply a viewport or font change through `change`, re-measure, and keep
    /// the reader on the same segment and offset.
    pub fn relayout(&mut self, change: impl FnOnce(&mut S)) {
        let anchor = if self.restore.is_locked() {
            None
        } else {
            self.capture_anchor()
        };
        change(self.renderer.surface_mut());
        self.heights.reset();
        let samples: Vec<(usize, f64)> = self
            .renderer
            .resident_boxes()
            .map(|(index, b)| (index, b.height))
            .collect();
        self.heights.record_batch(&samples);
        self.renderer.refresh_spacers(&self.heights);
        if let Some(anchor) = anchor {
            let outcome = self.seek_anchor(anchor);
            debug!(
                segment = anchor.segment_index,
                target = outcome.target,
                live = outcome.live,
                "Re-applied anchor after relayout"
            );
        }
        self.notify_scroll();
    }

    /// Bring `index` into view with one average line of context above it.
    pub fn scroll_to_segment(&mut self, index: usize) {
        if self.document.is_empty() {
            return;
        }
        let index = index.min(self.document.len() - 1);
        if self.renderer.is_virtualized() {
            let window = self.renderer.window_around(index);
            self.ensure_window(window);
        }
        let top = self
            .renderer
            .segment_box(index)
            .map(|b| b.top)
            .unwrap_or_else(|| self.heights.estimated_top(index));
        let avg = self.heights.average_height();
        self.renderer.set_scroll_top((top - avg).max(0.0));
        self.notify_scroll();
    }

    /// Index of the first segment (resident or not) that contains `word`.
    pub fn find_first_segment_for_word(&self, word: &str) -> Option<usize> {
        let key = word_key(word);
        self.document
            .iter()
            .position(|segment| segment.words.iter().any(|w| *w == key))
    }

    /// Resident segments containing `word`, for highlighting.
    pub fn resident_segments_for_word(&self, word: &str) -> Vec<usize> {
        self.renderer.segments_for_word(&word_key(word))
    }

    pub fn capture_anchor(&self) -> Option<Anchor> {
        anchor::capture(&self.renderer)
    }

    pub fn take_progress_updates(&mut self) -> Vec<ProgressUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub fn scroll_ratio(&self) -> f64 {
        self.renderer.scroll_ratio()
    }

    pub fn render_window(&self) -> RenderWindow {
        self.renderer.window()
    }

    pub fn restore_phase(&self) -> RestorePhase {
        self.restore.phase()
    }

    pub fn is_restoring(&self) -> bool {
        self.restore.is_locked()
    }

    pub fn active_slot(&self) -> Option<SlotId> {
        self.active_slot
    }

    pub fn document(&self) -> &[Segment] {
        &self.document
    }

    pub fn heights(&self) -> &HeightModel {
        &self.heights
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    /// Layout changes that should keep the reading position go through
    /// [`ReaderSession::relayout`] instead.
    pub fn surface_mut(&mut self) -> &mut S {
        self.renderer.surface_mut()
    }

    pub fn store(&self) -> &K {
        self.storage.store()
    }

    pub fn store_mut(&mut self) -> &mut K {
        self.storage.store_mut()
    }

    /// Tear the session down, keeping its backing store (a page reload).
    pub fn into_store(self) -> K {
        self.storage.into_store()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.scheduler.is_empty()
    }

    fn persist_position(&mut self, slot: SlotId) {
        let anchor = self.capture_anchor();
        self.anchors.save(&mut self.storage, slot, anchor);
        let ratio = self.renderer.scroll_ratio();
        self.progress.commit(&mut self.storage, slot, ratio);
    }

    fn ensure_window(&mut self, window: RenderWindow) {
        if window == self.renderer.window() {
            return;
        }
        let held = self.viewport_anchor();
        let entered = self
            .renderer
            .render_window(window, &self.document, &self.heights);
        self.schedule_measure(entered);
        self.hold_anchor(held);
    }

    /// The segment box under the viewport top, if one is laid out there.
    /// Unlike [`ReaderSession::capture_anchor`] this is `None` while the
    /// viewport sits over a spacer.
    fn viewport_anchor(&self) -> Option<Anchor> {
        let top = self.renderer.scroll_top();
        self.renderer
            .box_at(top)
            .map(|(index, b)| Anchor::new(index, top - b.top))
    }

    /// Scroll so `held` is back where it was relative to the viewport after
    /// content above it grew or shrank.
    fn hold_anchor(&mut self, held: Option<Anchor>) {
        let Some(held) = held else {
            return;
        };
        let Some(b) = self.renderer.segment_box(held.segment_index) else {
            return;
        };
        let before = self.renderer.scroll_top();
        let target = b.top + held.pixel_offset;
        if (target - before).abs() < 1e-9 {
            return;
        }
        self.renderer.set_scroll_top(target);
        trace!(
            segment = held.segment_index,
            shift = target - before,
            "Compensated content shift above the viewport"
        );
        self.notify_scroll();
    }

    fn schedule_measure(&mut self, indices: Vec<usize>) {
        if indices.is_empty() {
            return;
        }
        self.scheduler.schedule_after(
            self.config.frame_interval(),
            Task::Measure {
                generation: self.generation,
                indices,
            },
        );
    }

    fn measure(&mut self, indices: &[usize]) {
        let samples: Vec<(usize, f64)> = indices
            .iter()
            .filter_map(|&index| self.renderer.segment_box(index).map(|b| (index, b.height)))
            .collect();
        let held = self.viewport_anchor();
        if let Some(average) = self.heights.record_batch(&samples) {
            self.renderer.refresh_spacers(&self.heights);
            trace!(
                measured = samples.len(),
                average, "Updated average segment height"
            );
            self.hold_anchor(held);
        }
    }

    fn schedule_flush(&mut self) {
        self.scheduler
            .cancel_where(|task| matches!(task, Task::FlushProgress));
        self.scheduler
            .schedule_after(self.config.save_debounce(), Task::FlushProgress);
    }

    fn handle_flush_progress(&mut self) {
        if self.restore.is_locked() {
            trace!("Deferring progress flush until restoration settles");
            self.schedule_flush();
            return;
        }
        self.progress.flush(&mut self.storage);
    }

    fn emit(&mut self, ratio: f64, source: ProgressSource) {
        self.updates.push(ProgressUpdate {
            slot: self.active_slot,
            ratio,
            source,
        });
    }
}
