//! Measured and estimated segment heights.
//!
//! Only segments that have been rendered carry a measurement. Everything else
//! is estimated from a running average that is blended (half old, half new)
//! each time a batch of rendered segments is measured. Far-off segments that
//! were never rendered do not contribute, so the average is an approximation
//! on documents with very uneven paragraph lengths.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HeightModel {
    measured: HashMap<usize, f64>,
    average: f64,
    initial_average: f64,
}

impl HeightModel {
    pub fn new(initial_average: f64) -> Self {
        let initial_average = if initial_average.is_finite() && initial_average > 0.0 {
            initial_average
        } else {
            1.0
        };
        Self {
            measured: HashMap::new(),
            average: initial_average,
            initial_average,
        }
    }

    /// Forget every measurement; heights are meaningless once the text changes.
    pub fn reset(&mut self) {
        self.measured.clear();
        self.average = self.initial_average;
    }

    pub fn record_height(&mut self, index: usize, px: f64) {
        if px.is_finite() && px > 0.0 {
            self.measured.insert(index, px);
        }
    }

    /// Record a measurement pass and blend its mean into the running average.
    /// Returns the new average when the batch contained usable samples.
    pub fn record_batch(&mut self, samples: &[(usize, f64)]) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &(index, px) in samples {
            if px.is_finite() && px > 0.0 {
                self.measured.insert(index, px);
                sum += px;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let batch_mean = sum / count as f64;
        self.average = self.average * 0.5 + batch_mean * 0.5;
        Some(self.average)
    }

    pub fn estimate(&self, index: usize) -> f64 {
        self.measured.get(&index).copied().unwrap_or(self.average)
    }

    pub fn average_height(&self) -> f64 {
        self.average
    }

    pub fn measured(&self, index: usize) -> Option<f64> {
        self.measured.get(&index).copied()
    }

    pub fn measured_count(&self) -> usize {
        self.measured.len()
    }

    /// Estimated offset of the top edge of `index` from the document start.
    pub fn estimated_top(&self, index: usize) -> f64 {
        let (known_sum, known_count) = self
            .measured
            .iter()
            .filter(|(i, _)| **i < index)
            .fold((0.0, 0usize), |(sum, count), (_, px)| (sum + px, count + 1));
        known_sum + (index - known_count) as f64 * self.average
    }
}
