//! Durable reading-position markers.
//!
//! An anchor is "the segment at the top of the viewport, and how far into it
//! the reader has scrolled". Segment identity survives re-wrapping at a
//! different width, which a plain scroll percentage does not.

use crate::storage::{KeyValueStore, SlotId, SlotStorage};
use crate::surface::ReaderSurface;
use crate::window::WindowRenderer;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANCHOR_KIND: &str = "anchor";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(rename = "i")]
    pub segment_index: usize,
    #[serde(rename = "offset", default)]
    pub pixel_offset: f64,
}

impl Anchor {
    pub fn new(segment_index: usize, pixel_offset: f64) -> Self {
        let pixel_offset = if pixel_offset.is_finite() {
            pixel_offset.max(0.0)
        } else {
            0.0
        };
        Self {
            segment_index,
            pixel_offset,
        }
    }
}

/// First resident segment whose bottom edge lies below the scroll offset.
/// `None` when nothing is resident (for example an empty document).
pub fn capture<S: ReaderSurface>(renderer: &WindowRenderer<S>) -> Option<Anchor> {
    let top = renderer.scroll_top();
    renderer
        .resident_boxes()
        .find(|(_, b)| b.top + b.height.max(1.0) > top)
        .map(|(index, b)| Anchor::new(index, top - b.top))
}

/// Per-slot anchor persistence, independent of the stored scroll ratio.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnchorStore;

impl AnchorStore {
    pub fn load<K: KeyValueStore>(&self, storage: &SlotStorage<K>, slot: SlotId) -> Option<Anchor> {
        storage.read::<Anchor>(ANCHOR_KIND, slot)
    }

    /// Persist `anchor`, or clear any stale one when capture found nothing.
    pub fn save<K: KeyValueStore>(
        &self,
        storage: &mut SlotStorage<K>,
        slot: SlotId,
        anchor: Option<Anchor>,
    ) {
        match anchor {
            Some(anchor) => {
                debug!(
                    %slot,
                    segment = anchor.segment_index,
                    offset = anchor.pixel_offset,
                    "Saving reading anchor"
                );
            }
            None => debug!(%slot, "Clearing reading anchor"),
        }
        storage.write(ANCHOR_KIND, slot, anchor.as_ref());
    }
}
