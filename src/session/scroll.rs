use super::ReaderSession;
use crate::progress::ProgressSource;
use crate::storage::KeyValueStore;
use crate::surface::ReaderSurface;
use crate::window::RenderWindow;
use tracing::trace;

/// Coalescing state for scroll notifications.
#[derive(Debug, Default)]
pub(super) struct ScrollState {
    pub(super) frame_pending: bool,
}

impl<S: ReaderSurface, K: KeyValueStore> ReaderSession<S, K> {
    pub(super) fn handle_scroll_frame(&mut self) {
        self.scroll.frame_pending = false;
        let locked = self.restore.is_locked();
        let top = self.renderer.scroll_top();

        // The restoration sequence owns the window while it holds the lock.
        if !locked && self.renderer.is_virtualized() {
            let window = self.window_for_offset(top);
            self.ensure_window(window);
        }

        let ratio = self.renderer.scroll_ratio();
        trace!(top, ratio, locked, "Scroll frame");
        if locked {
            self.emit(ratio, ProgressSource::Provisional);
            return;
        }
        self.emit(ratio, ProgressSource::Live);
        if let Some(slot) = self.active_slot {
            if self.progress.record(slot, ratio) {
                self.schedule_flush();
            }
        }
    }

    /// Window for a scroll offset: the segment under the viewport top, with
    /// `virtual_buffer` segments of slack above it. Over a spacer the segment
    /// is estimated from the average height.
    pub(super) fn window_for_offset(&self, top: f64) -> RenderWindow {
        let count = self.document.len();
        let max = self.config.max_rendered_segments;
        let avg = self.heights.average_height().max(1.0);
        let approx = self
            .renderer
            .box_at(top)
            .map(|(index, _)| index)
            .unwrap_or_else(|| (top.max(0.0) / avg).floor() as usize);
        let mut start = approx.saturating_sub(self.config.virtual_buffer);
        if start >= count {
            start = count.saturating_sub(max);
        }
        RenderWindow::new(start, count.min(start + max))
    }
}
