//! Scroll-ratio progress: math, change notifications, and per-slot tracking.

use crate::storage::{KeyValueStore, SlotId, SlotStorage};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const PROGRESS_KIND: &str = "progress";

/// Fraction of the scrollable distance consumed, clamped to `[0, 1]`.
pub fn scroll_ratio(scroll_top: f64, scroll_height: f64, client_height: f64) -> f64 {
    let max = scroll_height - client_height;
    if !max.is_finite() || max <= 0.0 {
        return 0.0;
    }
    clamp_ratio(scroll_top / max)
}

pub fn clamp_ratio(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Accepted scroll update; also recorded as the slot's progress.
    Live,
    /// Display-only value while a saved position is being re-applied.
    Provisional,
    /// Final position reached by a restoration.
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub slot: Option<SlotId>,
    pub ratio: f64,
    pub source: ProgressSource,
}

impl ProgressUpdate {
    pub fn percent(&self) -> u32 {
        (clamp_ratio(self.ratio) * 100.0).round() as u32
    }

    /// Text for the percentage label, e.g. `42%`.
    pub fn label(&self) -> String {
        format!("{}%", self.percent())
    }

    /// Width of the progress bar fill, in percent of the track.
    pub fn bar_width(&self) -> f64 {
        clamp_ratio(self.ratio) * 100.0
    }
}

/// In-memory progress per slot with deferred persistence of changed entries.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    ratios: HashMap<SlotId, f64>,
    dirty: BTreeSet<SlotId>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known ratio for `slot`: in-memory first, then storage.
    pub fn stored<K: KeyValueStore>(&self, storage: &SlotStorage<K>, slot: SlotId) -> Option<f64> {
        self.ratios
            .get(&slot)
            .copied()
            .or_else(|| storage.read::<f64>(PROGRESS_KIND, slot))
            .map(clamp_ratio)
    }

    /// Returns whether the value changed (and now awaits a flush).
    pub fn record(&mut self, slot: SlotId, ratio: f64) -> bool {
        let next = clamp_ratio(ratio);
        if self.ratios.get(&slot) == Some(&next) {
            return false;
        }
        self.ratios.insert(slot, next);
        self.dirty.insert(slot);
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Persist every changed slot. Returns how many writes landed.
    pub fn flush<K: KeyValueStore>(&mut self, storage: &mut SlotStorage<K>) -> usize {
        let slots = std::mem::take(&mut self.dirty);
        let mut written = 0;
        for slot in slots {
            if let Some(ratio) = self.ratios.get(&slot).copied() {
                if storage.write(PROGRESS_KIND, slot, Some(&ratio)) {
                    written += 1;
                }
            }
        }
        if written > 0 {
            debug!(written, "Flushed reading progress");
        }
        written
    }

    /// Record and persist one slot right away.
    pub fn commit<K: KeyValueStore>(
        &mut self,
        storage: &mut SlotStorage<K>,
        slot: SlotId,
        ratio: f64,
    ) -> bool {
        let next = clamp_ratio(ratio);
        self.ratios.insert(slot, next);
        self.dirty.remove(&slot);
        storage.write(PROGRESS_KIND, slot, Some(&next))
    }
}
