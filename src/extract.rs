/// Metric extraction: collect every trial value in a size block.
use crate::metrics::{MetricKind, METRICS};
use std::collections::BTreeMap;

/// Per-kind samples found in one block, in order of appearance.
///
/// Every kind in the metric table has an entry, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSamples {
    samples: BTreeMap<MetricKind, Vec<f64>>,
}

impl MetricSamples {
    /// Samples for `kind`; empty if none matched.
    pub fn get(&self, kind: MetricKind) -> &[f64] {
        self.samples.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Scan `block` for every occurrence of each metric pattern.
///
/// Numbers that fail to parse are skipped with a warning; the remaining
/// samples for that kind are kept.
pub fn extract(block: &str) -> MetricSamples {
    let mut samples = BTreeMap::new();
    for spec in METRICS.iter() {
        let values: Vec<f64> = spec
            .pattern
            .captures_iter(block)
            .filter_map(|caps| {
                let raw = caps.get(1)?.as_str();
                let value = spec.parse(raw);
                if value.is_none() {
                    tracing::warn!(metric = %spec.kind, raw, "skipping unparseable sample");
                }
                value
            })
            .collect();
        samples.insert(spec.kind, values);
    }
    MetricSamples { samples }
}
