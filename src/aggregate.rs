/// Aggregation: reduce each metric's trial samples to a mean.
use crate::extract::MetricSamples;
use crate::metrics::{MetricKind, METRICS};
use serde::Serialize;
use std::collections::BTreeMap;

/// Averaged metrics for one data size.
///
/// Every kind in the metric table is present. `None` means no samples were
/// found, which is distinct from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedRecord {
    values: BTreeMap<MetricKind, Option<f64>>,
}

impl AggregatedRecord {
    /// Mean value for `kind`, or `None` if it was not measured.
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.values.get(&kind).copied().flatten()
    }
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Average every kind's samples independently.
pub fn aggregate(samples: &MetricSamples) -> AggregatedRecord {
    let values = METRICS
        .iter()
        .map(|spec| (spec.kind, mean(samples.get(spec.kind))))
        .collect();
    AggregatedRecord { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_of_values() {
        let m = mean(&[1.0, 2.0, 4.5]).unwrap();
        assert!((m - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_mean_of_zeros_is_zero_not_none() {
        assert_eq!(mean(&[0.0, 0.0]), Some(0.0));
    }

    #[test]
    fn test_aggregate_every_kind_present() {
        let record = aggregate(&extract(""));
        assert_eq!(record.values.len(), METRICS.len());
        assert!(METRICS.iter().all(|spec| record.get(spec.kind).is_none()));
    }

    #[test]
    fn test_aggregate_mixed_block() {
        let record = aggregate(&extract(
            "CLIENT COMPUTATION COST IS 1.0s CLIENT COMPUTATION COST IS 3.0s \
             SERVER COMPUTATION COST IS 50ms ON-CHAIN COMMUNICATION COST: 200 bytes",
        ));
        assert_eq!(record.get(MetricKind::ClientComp), Some(2.0));
        assert_eq!(record.get(MetricKind::ServerComp), Some(50.0));
        assert_eq!(record.get(MetricKind::SmartComp), None);
        assert_eq!(record.get(MetricKind::OffchainComm), None);
        assert_eq!(record.get(MetricKind::OnchainComm), Some(200.0));
    }

    #[test]
    fn test_onchain_mean_is_not_truncated() {
        let record = aggregate(&extract(
            "ON-CHAIN COMMUNICATION COST: 3 bytes ON-CHAIN COMMUNICATION COST: 4 bytes",
        ));
        assert_eq!(record.get(MetricKind::OnchainComm), Some(3.5));
    }

    #[test]
    fn test_offchain_converted_before_averaging() {
        let record = aggregate(&extract(
            "OFF-CHAIN COMMUNICATION COST: 1048576 bytes OFF-CHAIN COMMUNICATION COST: 2097152 bytes",
        ));
        let v = record.get(MetricKind::OffchainComm).unwrap();
        assert!((v - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_absent_serializes_as_null() {
        let record = aggregate(&extract("SERVER COMPUTATION COST IS 5ms"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["server_comp"], serde_json::json!(5.0));
        assert!(json["client_comp"].is_null());
        assert!(json.as_object().unwrap().contains_key("smart_comp"));
    }
}
