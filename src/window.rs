//! Windowed rendering of compiled segments.
//!
//! The renderer is the only component that mutates the surface structure. It
//! owns the index → element map for resident segments and the word registry
//! used for click-to-lookup highlighting, and keeps both in step with the
//! window it materializes.

use crate::height::HeightModel;
use crate::segment::Segment;
use crate::surface::{Placement, ReaderSurface, SegmentBox, Spacers};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Half-open range of segment indices that exist on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderWindow {
    pub start: usize,
    pub end: usize,
}

impl RenderWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

pub struct WindowRenderer<S: ReaderSurface> {
    surface: S,
    resident: BTreeMap<usize, S::Handle>,
    window: RenderWindow,
    segment_count: usize,
    virtualized: bool,
    max_rendered: usize,
    threshold: usize,
    words: HashMap<String, BTreeSet<usize>>,
}

impl<S: ReaderSurface> WindowRenderer<S> {
    pub fn new(surface: S, max_rendered: usize, threshold: usize) -> Self {
        Self {
            surface,
            resident: BTreeMap::new(),
            window: RenderWindow::default(),
            segment_count: 0,
            virtualized: false,
            max_rendered: max_rendered.max(1),
            threshold,
            words: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for host-side layout changes (viewport size, fonts).
    /// Structural edits must still go through the renderer.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn window(&self) -> RenderWindow {
        self.window
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn is_virtualized(&self) -> bool {
        self.virtualized
    }

    pub fn is_resident(&self, index: usize) -> bool {
        self.resident.contains_key(&index)
    }

    pub fn resident_indices(&self) -> Vec<usize> {
        self.resident.keys().copied().collect()
    }

    /// Drop everything on the surface and render the first window of a
    /// freshly compiled document. Returns the indices that were mounted.
    pub fn reset(&mut self, document: &[Segment], heights: &HeightModel) -> Vec<usize> {
        self.surface.clear();
        self.resident.clear();
        self.words.clear();
        self.window = RenderWindow::default();
        self.segment_count = document.len();
        self.virtualized = self.segment_count > self.threshold;
        debug!(
            segments = self.segment_count,
            virtualized = self.virtualized,
            threshold = self.threshold,
            "Reset reader surface"
        );
        let initial = RenderWindow::new(0, self.segment_count.min(self.max_rendered));
        self.render_window(initial, document, heights)
    }

    /// Materialize `requested` and evict everything else. Asking for the
    /// resident window again does not touch the surface.
    pub fn render_window(
        &mut self,
        requested: RenderWindow,
        document: &[Segment],
        heights: &HeightModel,
    ) -> Vec<usize> {
        let window = self.clamp_window(requested);
        if window == self.window && self.resident.len() == window.len() {
            return Vec::new();
        }

        let evicted: Vec<usize> = self
            .resident
            .keys()
            .copied()
            .filter(|index| !window.contains(*index))
            .collect();
        for index in &evicted {
            if let Some(handle) = self.resident.remove(index) {
                self.unregister_words(*index, document);
                self.surface.unmount(handle);
            }
        }

        let mut entered = Vec::new();
        match (self.first_resident(), self.last_resident()) {
            (Some(first), Some(last)) => {
                for index in (window.start..first).rev() {
                    self.mount(index, Placement::Front, document);
                    entered.push(index);
                }
                for index in (last + 1)..window.end {
                    self.mount(index, Placement::Back, document);
                    entered.push(index);
                }
            }
            _ => {
                for index in window.start..window.end {
                    self.mount(index, Placement::Back, document);
                    entered.push(index);
                }
            }
        }
        entered.sort_unstable();

        self.window = window;
        self.apply_spacers(heights);
        trace!(
            start = window.start,
            end = window.end,
            evicted = evicted.len(),
            entered = entered.len(),
            "Rendered window"
        );
        entered
    }

    /// Window of the maximum size centered on `index`, pulled back from the end.
    pub fn window_around(&self, index: usize) -> RenderWindow {
        let total = self.segment_count;
        if total == 0 {
            return RenderWindow::default();
        }
        let index = index.min(total - 1);
        let mut start = index.saturating_sub(self.max_rendered / 2);
        let end = total.min(start + self.max_rendered);
        if end.saturating_sub(start) < self.max_rendered && start > 0 {
            start = end.saturating_sub(self.max_rendered);
        }
        RenderWindow::new(start, end)
    }

    /// Resize the spacers after the average height moved.
    pub fn refresh_spacers(&mut self, heights: &HeightModel) {
        if self.virtualized {
            self.apply_spacers(heights);
        }
    }

    pub fn segment_box(&self, index: usize) -> Option<SegmentBox> {
        self.resident
            .get(&index)
            .and_then(|handle| self.surface.segment_box(handle))
    }

    /// Laid-out boxes of resident segments in index (and container) order.
    pub fn resident_boxes(&self) -> impl Iterator<Item = (usize, SegmentBox)> + '_ {
        self.resident
            .iter()
            .filter_map(|(index, handle)| self.surface.segment_box(handle).map(|b| (*index, b)))
    }

    /// Resident segment whose box spans content offset `offset`.
    pub fn box_at(&self, offset: f64) -> Option<(usize, SegmentBox)> {
        self.resident_boxes().find(|(_, b)| b.top <= offset && offset < b.bottom())
    }

    pub fn scroll_top(&self) -> f64 {
        self.surface.scroll_top()
    }

    pub fn set_scroll_top(&mut self, top: f64) {
        self.surface.set_scroll_top(top);
    }

    pub fn scroll_ratio(&self) -> f64 {
        crate::progress::scroll_ratio(
            self.surface.scroll_top(),
            self.surface.scroll_height(),
            self.surface.client_height(),
        )
    }

    pub fn max_scroll(&self) -> f64 {
        (self.surface.scroll_height() - self.surface.client_height()).max(0.0)
    }

    /// Resident segments containing `word_key`.
    pub fn segments_for_word(&self, word_key: &str) -> Vec<usize> {
        self.words
            .get(word_key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clamp_window(&self, requested: RenderWindow) -> RenderWindow {
        let total = self.segment_count;
        if !self.virtualized {
            return RenderWindow::new(0, total);
        }
        let start = requested.start.min(total);
        let end = requested.end.clamp(start, total).min(start + self.max_rendered);
        RenderWindow::new(start, end)
    }

    fn apply_spacers(&mut self, heights: &HeightModel) {
        if !self.virtualized {
            self.surface.set_spacers(None);
            return;
        }
        let avg = heights.average_height();
        self.surface.set_spacers(Some(Spacers {
            before: self.window.start as f64 * avg,
            after: self.segment_count.saturating_sub(self.window.end) as f64 * avg,
        }));
    }

    fn first_resident(&self) -> Option<usize> {
        self.resident.keys().next().copied()
    }

    fn last_resident(&self) -> Option<usize> {
        self.resident.keys().next_back().copied()
    }

    fn mount(&mut self, index: usize, placement: Placement, document: &[Segment]) {
        let Some(segment) = document.get(index) else {
            return;
        };
        let handle = self.surface.mount(segment, placement);
        self.resident.insert(index, handle);
        for word in &segment.words {
            self.words.entry(word.clone()).or_default().insert(index);
        }
    }

    fn unregister_words(&mut self, index: usize, document: &[Segment]) {
        let Some(segment) = document.get(index) else {
            return;
        };
        for word in &segment.words {
            if let Some(bucket) = self.words.get_mut(word) {
                bucket.remove(&index);
                if bucket.is_empty() {
                    self.words.remove(word);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segmenter;
    use crate::surface::{HeadlessSurface, LayoutMetrics};

    const WORDS: [&str; 7] = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf"];

    fn document(count: usize) -> Vec<Segment> {
        let text = (0..count)
            .map(|i| format!("Paragraph {i} mentions {} here.", WORDS[i % WORDS.len()]))
            .collect::<Vec<_>>()
            .join("\n\n");
        Segmenter::default().segment(&text)
    }

    fn renderer() -> WindowRenderer<HeadlessSurface> {
        WindowRenderer::new(HeadlessSurface::new(LayoutMetrics::default()), 140, 40)
    }

    #[test]
    fn long_documents_start_with_a_capped_window() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        let entered = renderer.reset(&doc, &heights);

        assert!(renderer.is_virtualized());
        assert_eq!(entered.len(), 140);
        assert_eq!(renderer.surface().mounted_indices().len(), 140);
        let spacers = renderer.surface().spacers().expect("virtualized spacers");
        assert_eq!(spacers.before, 0.0);
        assert_eq!(spacers.after, 360.0 * 32.0);
    }

    #[test]
    fn resident_set_matches_each_requested_window() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);

        for (start, end) in [(100, 200), (150, 290), (10, 20), (0, 0), (480, 500), (499, 500)] {
            renderer.render_window(RenderWindow::new(start, end), &doc, &heights);
            let expected: Vec<usize> = (start..end).collect();
            assert_eq!(renderer.resident_indices(), expected);
            assert_eq!(renderer.surface().mounted_indices(), expected);
        }
    }

    #[test]
    fn repeated_window_causes_no_mutations() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        renderer.render_window(RenderWindow::new(200, 300), &doc, &heights);

        let before = renderer.surface().mutation_count();
        let entered = renderer.render_window(RenderWindow::new(200, 300), &doc, &heights);
        assert!(entered.is_empty());
        assert_eq!(renderer.surface().mutation_count(), before);
    }

    #[test]
    fn oversized_requests_are_capped() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        renderer.render_window(RenderWindow::new(300, 900), &doc, &heights);
        assert_eq!(renderer.window(), RenderWindow::new(300, 440));
    }

    #[test]
    fn short_documents_render_everything_without_spacers() {
        let doc = document(12);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        renderer.render_window(RenderWindow::new(3, 5), &doc, &heights);

        assert!(!renderer.is_virtualized());
        assert_eq!(renderer.resident_indices(), (0..12).collect::<Vec<_>>());
        assert!(renderer.surface().spacers().is_none());
    }

    #[test]
    fn empty_document_renders_nothing() {
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        let entered = renderer.reset(&[], &heights);
        assert!(entered.is_empty());
        assert!(renderer.surface().mounted_indices().is_empty());
        assert!(renderer.surface().spacers().is_none());
        assert!(renderer.window().is_empty());
    }

    #[test]
    fn window_around_centers_and_pulls_back_at_the_end() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        assert_eq!(renderer.window_around(42), RenderWindow::new(0, 140));
        assert_eq!(renderer.window_around(250), RenderWindow::new(180, 320));
        assert_eq!(renderer.window_around(495), RenderWindow::new(360, 500));
        assert_eq!(renderer.window_around(10_000), RenderWindow::new(360, 500));
    }

    #[test]
    fn inverted_window_fields_read_as_empty() {
        let window = RenderWindow { start: 9, end: 4 };
        assert_eq!(window.len(), 0);
        assert!(window.is_empty());
    }

    #[test]
    fn box_at_finds_the_segment_under_an_offset() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        renderer.render_window(RenderWindow::new(100, 240), &doc, &heights);

        let (index, b) = renderer.box_at(150.0 * 32.0 + 5.0).expect("resident box");
        assert_eq!(index, 150);
        assert_eq!(b.top, 150.0 * 32.0);
        assert!(renderer.box_at(50.0 * 32.0).is_none(), "leading spacer");
        assert!(renderer.box_at(300.0 * 32.0).is_none(), "trailing spacer");
    }

    #[test]
    fn evicted_segments_drop_their_word_registrations() {
        let doc = document(500);
        let heights = HeightModel::new(32.0);
        let mut renderer = renderer();
        renderer.reset(&doc, &heights);
        assert!(renderer.segments_for_word("delta").contains(&3));

        renderer.render_window(RenderWindow::new(200, 210), &doc, &heights);
        let hits = renderer.segments_for_word("delta");
        assert_eq!(hits, vec![206]);
        assert!(renderer.segments_for_word("paragraph").iter().all(|i| (200..210).contains(i)));
    }
}
