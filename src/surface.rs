//! The scroll container the reading view draws into.
//!
//! `ReaderSurface` is the seam between the engine and whatever actually lays
//! out text (a browser DOM, a GUI toolkit, a terminal). The engine only needs
//! to mount and unmount segment elements at either end of the container, size
//! the two virtualization spacers, read element boxes back, and move the
//! scroll position.
//!
//! `HeadlessSurface` is a deterministic implementation that wraps text with a
//! fixed glyph width. It backs the command-line driver and the tests.

use crate::config::ReaderConfig;
use crate::segment::Segment;
use std::collections::VecDeque;

/// Where a newly mounted segment element goes inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
}

/// Heights of the padding blocks standing in for unrendered segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacers {
    pub before: f64,
    pub after: f64,
}

/// Laid-out box of a mounted segment, relative to the scroll content origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentBox {
    pub top: f64,
    pub height: f64,
}

impl SegmentBox {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

pub trait ReaderSurface {
    /// Owned reference to one mounted segment element.
    type Handle;

    /// Drop every element and spacer and reset the scroll position.
    fn clear(&mut self);
    fn mount(&mut self, segment: &Segment, placement: Placement) -> Self::Handle;
    fn unmount(&mut self, handle: Self::Handle);
    /// `None` removes the spacers entirely (non-virtualized layout).
    fn set_spacers(&mut self, spacers: Option<Spacers>);
    /// `None` while the element has not been laid out yet.
    fn segment_box(&self, handle: &Self::Handle) -> Option<SegmentBox>;
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, top: f64);
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
}

/// Text metrics the headless layout wraps with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub width: f64,
    pub client_height: f64,
    pub line_height: f64,
    pub glyph_width: f64,
    pub paragraph_spacing: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            width: 720.0,
            client_height: 600.0,
            line_height: 24.0,
            glyph_width: 9.0,
            paragraph_spacing: 8.0,
        }
    }
}

impl LayoutMetrics {
    pub fn from_config(config: &ReaderConfig) -> Self {
        let font_size = config.font_size.max(1) as f64;
        Self {
            width: config.window_width.max(1.0) as f64,
            client_height: config.window_height.max(1.0) as f64,
            line_height: font_size * config.line_spacing.max(0.8) as f64,
            // Average advance of a proportional sans face.
            glyph_width: font_size * 0.55,
            paragraph_spacing: config.paragraph_spacing.max(0.0) as f64,
        }
    }

    fn chars_per_line(&self) -> usize {
        (self.width / self.glyph_width.max(1.0)).floor().max(1.0) as usize
    }

    /// Height of a paragraph after wrapping. Empty paragraphs keep one line.
    pub fn segment_height(&self, text: &str) -> f64 {
        let per_line = self.chars_per_line();
        let lines: usize = text
            .split('\n')
            .map(|line| line.chars().count().div_ceil(per_line).max(1))
            .sum();
        lines as f64 * self.line_height + self.paragraph_spacing
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessHandle(u64);

#[derive(Debug)]
struct HeadlessNode {
    id: u64,
    index: usize,
    text: String,
    height: f64,
}

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    metrics: LayoutMetrics,
    nodes: VecDeque<HeadlessNode>,
    spacers: Option<Spacers>,
    scroll_top: f64,
    next_id: u64,
    mutations: u64,
    layout_pending: bool,
}

impl HeadlessSurface {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Re-wrap every mounted paragraph, as a viewport resize would.
    pub fn set_metrics(&mut self, metrics: LayoutMetrics) {
        self.metrics = metrics;
        for node in &mut self.nodes {
            node.height = metrics.segment_height(&node.text);
        }
        self.clamp_scroll();
    }

    /// While pending, boxes cannot be read back (fonts or images still loading).
    pub fn set_layout_pending(&mut self, pending: bool) {
        self.layout_pending = pending;
    }

    /// Structural changes made so far: mounts, unmounts, spacer writes, clears.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Segment indices in container order.
    pub fn mounted_indices(&self) -> Vec<usize> {
        self.nodes.iter().map(|node| node.index).collect()
    }

    pub fn spacers(&self) -> Option<Spacers> {
        self.spacers
    }

    fn content_height(&self) -> f64 {
        let spacers = self.spacers.map(|s| s.before + s.after).unwrap_or(0.0);
        spacers + self.nodes.iter().map(|node| node.height).sum::<f64>()
    }

    fn max_scroll(&self) -> f64 {
        (self.content_height() - self.metrics.client_height).max(0.0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll());
    }
}

impl ReaderSurface for HeadlessSurface {
    type Handle = HeadlessHandle;

    fn clear(&mut self) {
        self.nodes.clear();
        self.spacers = None;
        self.scroll_top = 0.0;
        self.mutations += 1;
    }

    fn mount(&mut self, segment: &Segment, placement: Placement) -> HeadlessHandle {
        let id = self.next_id;
        self.next_id += 1;
        let node = HeadlessNode {
            id,
            index: segment.index,
            text: segment.raw_text.clone(),
            height: self.metrics.segment_height(&segment.raw_text),
        };
        match placement {
            Placement::Front => self.nodes.push_front(node),
            Placement::Back => self.nodes.push_back(node),
        }
        self.mutations += 1;
        HeadlessHandle(id)
    }

    fn unmount(&mut self, handle: HeadlessHandle) {
        if let Some(pos) = self.nodes.iter().position(|node| node.id == handle.0) {
            self.nodes.remove(pos);
            self.mutations += 1;
            self.clamp_scroll();
        }
    }

    fn set_spacers(&mut self, spacers: Option<Spacers>) {
        self.spacers = spacers;
        self.mutations += 1;
        self.clamp_scroll();
    }

    fn segment_box(&self, handle: &HeadlessHandle) -> Option<SegmentBox> {
        if self.layout_pending {
            return None;
        }
        let mut top = self.spacers.map(|s| s.before).unwrap_or(0.0);
        for node in &self.nodes {
            if node.id == handle.0 {
                return Some(SegmentBox {
                    top,
                    height: node.height,
                });
            }
            top += node.height;
        }
        None
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.scroll_top = if top.is_finite() { top } else { 0.0 };
        self.clamp_scroll();
    }

    fn scroll_height(&self) -> f64 {
        self.content_height().max(self.metrics.client_height)
    }

    fn client_height(&self) -> f64 {
        self.metrics.client_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segmenter;

    #[test]
    fn wraps_long_paragraphs_into_extra_lines() {
        let metrics = LayoutMetrics {
            width: 100.0,
            glyph_width: 10.0,
            line_height: 20.0,
            paragraph_spacing: 4.0,
            ..LayoutMetrics::default()
        };
        assert_eq!(metrics.segment_height(""), 24.0);
        assert_eq!(metrics.segment_height("0123456789"), 24.0);
        assert_eq!(metrics.segment_height("0123456789a"), 44.0);
        assert_eq!(metrics.segment_height("short\nlines"), 44.0);
    }

    #[test]
    fn boxes_stack_below_the_leading_spacer() {
        let segments = Segmenter::default().segment("a\n\nb\n\nc");
        let mut surface = HeadlessSurface::new(LayoutMetrics::default());
        let b = surface.mount(&segments[1], Placement::Back);
        let c = surface.mount(&segments[2], Placement::Back);
        let a = surface.mount(&segments[0], Placement::Front);
        surface.set_spacers(Some(Spacers {
            before: 100.0,
            after: 50.0,
        }));

        assert_eq!(surface.mounted_indices(), vec![0, 1, 2]);
        let a_box = surface.segment_box(&a).expect("a is mounted");
        let b_box = surface.segment_box(&b).expect("b is mounted");
        assert_eq!(a_box.top, 100.0);
        assert_eq!(b_box.top, a_box.bottom());
        assert_eq!(surface.scroll_height(), 100.0 + 3.0 * 32.0 + 50.0);

        surface.unmount(c);
        assert_eq!(surface.mounted_indices(), vec![0, 1]);
    }

    #[test]
    fn scroll_position_is_clamped_to_content() {
        let segments = Segmenter::default().segment("a");
        let mut surface = HeadlessSurface::new(LayoutMetrics::default());
        surface.mount(&segments[0], Placement::Back);
        surface.set_spacers(Some(Spacers {
            before: 0.0,
            after: 1000.0,
        }));
        surface.set_scroll_top(5000.0);
        assert_eq!(surface.scroll_top(), 1032.0 - 600.0);
        surface.set_scroll_top(-20.0);
        assert_eq!(surface.scroll_top(), 0.0);
    }

    #[test]
    fn pending_layout_hides_boxes() {
        let segments = Segmenter::default().segment("a");
        let mut surface = HeadlessSurface::new(LayoutMetrics::default());
        let handle = surface.mount(&segments[0], Placement::Back);
        surface.set_layout_pending(true);
        assert!(surface.segment_box(&handle).is_none());
        surface.set_layout_pending(false);
        assert!(surface.segment_box(&handle).is_some());
    }
}
