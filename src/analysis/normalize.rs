use crate::models::likability::{MetricKey, MetricVector, METRIC_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl Default for MetricRange {
    fn default() -> Self {
        MetricRange { min: 0.0, max: 0.0 }
    }
}

/// Batch-wide min/max per metric, shared by every game regardless of genre.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRanges {
    ranges: [MetricRange; METRIC_COUNT],
}

impl MetricRanges {
    /// Ranges always include 0, so an empty or degenerate batch still has a
    /// well-defined (possibly zero-width) range.
    pub fn from_batch(metrics: &[MetricVector]) -> Self {
        let mut ranges = [MetricRange::default(); METRIC_COUNT];

        for vector in metrics {
            for key in MetricKey::ALL {
                let value = vector.get(key);
                let range = &mut ranges[key.index()];
                range.min = range.min.min(value);
                range.max = range.max.max(value);
            }
        }

        MetricRanges { ranges }
    }

    pub fn get(&self, key: MetricKey) -> MetricRange {
        self.ranges[key.index()]
    }

    pub fn normalize_vector(&self, metrics: &MetricVector) -> MetricVector {
        metrics.map(|key, value| {
            let range = self.get(key);
            normalize(value, range.min, range.max)
        })
    }
}

/// Linear rescale into [0, 1]; a zero-width range maps everything to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}
