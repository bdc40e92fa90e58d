/// Protocol datasets: parse a whole log into averaged records per size,
/// reconcile size axes across datasets, and export them as JSON.
use crate::aggregate::{aggregate, AggregatedRecord};
use crate::extract::extract;
use crate::metrics::MetricKind;
use crate::segment::segment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Averaged records of one protocol log, keyed by data size.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProtocolDataset {
    records: BTreeMap<u64, AggregatedRecord>,
}

impl ProtocolDataset {
    /// Sizes present in this dataset, ascending.
    pub fn sizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.keys().copied()
    }

    pub fn record(&self, size: u64) -> Option<&AggregatedRecord> {
        self.records.get(&size)
    }

    /// Value for `kind` at `size`; `None` if the size or the value is absent.
    pub fn value(&self, size: u64, kind: MetricKind) -> Option<f64> {
        self.record(size).and_then(|r| r.get(kind))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a protocol log into one averaged record per size block.
///
/// If a size appears twice, the later block replaces the earlier one.
pub fn parse_protocol_output(text: &str) -> ProtocolDataset {
    let mut records = BTreeMap::new();
    for block in segment(text) {
        let record = aggregate(&extract(block.text));
        if records.insert(block.size, record).is_some() {
            tracing::warn!(size = block.size, "duplicate size block, keeping the later one");
        }
    }
    ProtocolDataset { records }
}

/// Read and parse a protocol log from disk.
pub fn load_dataset(path: &Path) -> Result<ProtocolDataset, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let dataset = parse_protocol_output(&text);
    if dataset.is_empty() {
        tracing::warn!(path = %path.display(), "no size blocks found in log");
    }
    tracing::info!(path = %path.display(), sizes = dataset.len(), "parsed protocol log");
    Ok(dataset)
}

/// How to build the shared size axis when datasets disagree on sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Plot every size seen anywhere; missing values become gaps.
    #[default]
    Union,
    /// Fail unless every dataset has exactly the same sizes.
    Strict,
}

/// Compute the ascending size axis for a set of labeled datasets.
pub fn reconcile_sizes(
    datasets: &[(&str, &ProtocolDataset)],
    policy: SizePolicy,
) -> Result<Vec<u64>, DatasetError> {
    let union: BTreeSet<u64> = datasets.iter().flat_map(|(_, d)| d.sizes()).collect();

    for &(label, dataset) in datasets {
        let missing: Vec<u64> = union
            .iter()
            .copied()
            .filter(|size| dataset.record(*size).is_none())
            .collect();
        if missing.is_empty() {
            continue;
        }
        match policy {
            SizePolicy::Strict => {
                return Err(DatasetError::SizeMismatch {
                    label: label.to_string(),
                    missing,
                });
            }
            SizePolicy::Union => {
                tracing::warn!(
                    protocol = label,
                    missing = ?missing,
                    "dataset lacks sizes present in another dataset, plotting gaps"
                );
            }
        }
    }

    Ok(union.into_iter().collect())
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    label: &'a str,
    records: &'a ProtocolDataset,
}

/// Pretty JSON export of labeled datasets; absent values become `null`.
pub fn to_json(datasets: &[(&str, &ProtocolDataset)]) -> Result<String, DatasetError> {
    let report: Vec<ReportEntry<'_>> = datasets
        .iter()
        .map(|&(label, records)| ReportEntry { label, records })
        .collect();
    serde_json::to_string_pretty(&report).map_err(|e| DatasetError::Serialize { source: e })
}

/// Errors from loading or combining datasets.
#[derive(Debug)]
pub enum DatasetError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    SizeMismatch {
        label: String,
        missing: Vec<u64>,
    },
    Serialize {
        source: serde_json::Error,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Read { path, source } => {
                write!(f, "failed to read log {}: {source}", path.display())
            }
            DatasetError::SizeMismatch { label, missing } => {
                let sizes: Vec<String> = missing.iter().map(u64::to_string).collect();
                write!(
                    f,
                    "'{label}' has no data for sizes present in another log: {}",
                    sizes.join(", ")
                )
            }
            DatasetError::Serialize { source } => {
                write!(f, "failed to serialize datasets: {source}")
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Read { source, .. } => Some(source),
            DatasetError::SizeMismatch { .. } => None,
            DatasetError::Serialize { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE_LOG: &str = "\
    Finished release [optimized] target(s)
=== Run with size=32 ===
OFF-CHAIN COMMUNICATION COST: 2097152 bytes (ct is 32 bytes)
CLIENT COMPUTATION COST IS 2.0s
SERVER COMPUTATION COST IS 10ms
SMART CONTRACT COMPUTATION COST IS 100µs
ON-CHAIN COMMUNICATION COST: 160 bytes (Hct = 32, H = 32, com = 64, op = 32) .
CLIENT COMPUTATION COST IS 4.0s
SERVER COMPUTATION COST IS 20ms
SMART CONTRACT COMPUTATION COST IS 300µs
ON-CHAIN COMMUNICATION COST: 160 bytes (Hct = 32, H = 32, com = 64, op = 32) .
=== Run with size=16 ===
CLIENT COMPUTATION COST IS 1.0s
";

    #[test]
    fn test_end_to_end_single_block() {
        let ds = parse_protocol_output(
            "=== Run with size=16 === CLIENT COMPUTATION COST IS 1.0s \
             CLIENT COMPUTATION COST IS 3.0s SERVER COMPUTATION COST IS 50ms \
             ON-CHAIN COMMUNICATION COST: 200 bytes",
        );
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.value(16, MetricKind::ClientComp), Some(2.0));
        assert_eq!(ds.value(16, MetricKind::ServerComp), Some(50.0));
        assert_eq!(ds.value(16, MetricKind::SmartComp), None);
        assert_eq!(ds.value(16, MetricKind::OffchainComm), None);
        assert_eq!(ds.value(16, MetricKind::OnchainComm), Some(200.0));
    }

    #[test]
    fn test_parse_multiple_blocks() {
        let ds = parse_protocol_output(SAMPLE_LOG);
        assert_eq!(ds.sizes().collect::<Vec<_>>(), vec![16, 32]);
        assert_eq!(ds.value(32, MetricKind::ClientComp), Some(3.0));
        assert_eq!(ds.value(32, MetricKind::ServerComp), Some(15.0));
        assert_eq!(ds.value(32, MetricKind::SmartComp), Some(200.0));
        assert_eq!(ds.value(32, MetricKind::OffchainComm), Some(2.0));
        assert_eq!(ds.value(32, MetricKind::OnchainComm), Some(160.0));
        assert_eq!(ds.value(16, MetricKind::ClientComp), Some(1.0));
        assert_eq!(ds.value(16, MetricKind::ServerComp), None);
    }

    #[test]
    fn test_block_values_do_not_leak_across_sizes() {
        let ds = parse_protocol_output(SAMPLE_LOG);
        assert_eq!(ds.value(16, MetricKind::OnchainComm), None);
    }

    #[test]
    fn test_no_headers_gives_empty_dataset() {
        let ds = parse_protocol_output("CLIENT COMPUTATION COST IS 1.0s");
        assert!(ds.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(
            parse_protocol_output(SAMPLE_LOG),
            parse_protocol_output(SAMPLE_LOG)
        );
    }

    #[test]
    fn test_duplicate_size_keeps_later_block() {
        let ds = parse_protocol_output(
            "=== Run with size=8 === CLIENT COMPUTATION COST IS 1.0s \
             === Run with size=8 === CLIENT COMPUTATION COST IS 5.0s",
        );
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.value(8, MetricKind::ClientComp), Some(5.0));
    }

    #[test]
    fn test_value_for_unknown_size_is_none() {
        let ds = parse_protocol_output(SAMPLE_LOG);
        assert_eq!(ds.value(1024, MetricKind::ClientComp), None);
    }

    #[test]
    fn test_load_dataset_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prot1_output.txt");
        std::fs::write(&path, SAMPLE_LOG).unwrap();
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds, parse_protocol_output(SAMPLE_LOG));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_reconcile_identical_sizes() {
        let a = parse_protocol_output(SAMPLE_LOG);
        let b = parse_protocol_output(SAMPLE_LOG);
        for policy in [SizePolicy::Union, SizePolicy::Strict] {
            let sizes = reconcile_sizes(&[("a", &a), ("b", &b)], policy).unwrap();
            assert_eq!(sizes, vec![16, 32]);
        }
    }

    #[test]
    fn test_reconcile_union_merges_sizes() {
        let a = parse_protocol_output("=== Run with size=64 === === Run with size=16 ===");
        let b = parse_protocol_output("=== Run with size=32 === === Run with size=16 ===");
        let sizes = reconcile_sizes(&[("a", &a), ("b", &b)], SizePolicy::Union).unwrap();
        assert_eq!(sizes, vec![16, 32, 64]);
    }

    #[test]
    fn test_reconcile_strict_reports_missing_sizes() {
        let a = parse_protocol_output("=== Run with size=16 === === Run with size=32 ===");
        let b = parse_protocol_output("=== Run with size=16 ===");
        let err = reconcile_sizes(&[("Protocol 1", &a), ("Protocol 2", &b)], SizePolicy::Strict)
            .unwrap_err();
        match &err {
            DatasetError::SizeMismatch { label, missing } => {
                assert_eq!(label, "Protocol 2");
                assert_eq!(missing, &vec![32]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_reconcile_empty_input() {
        assert!(reconcile_sizes(&[], SizePolicy::Strict).unwrap().is_empty());
    }

    #[test]
    fn test_to_json_keeps_labels_and_nulls() {
        let ds = parse_protocol_output("=== Run with size=16 === SERVER COMPUTATION COST IS 50ms");
        let json = to_json(&[("Protocol 1", &ds)]).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["label"], "Protocol 1");
        assert_eq!(v[0]["records"]["16"]["server_comp"], 50.0);
        assert!(v[0]["records"]["16"]["client_comp"].is_null());
    }

    #[test]
    fn test_size_policy_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: SizePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"strict\"").unwrap();
        assert_eq!(w.policy, SizePolicy::Strict);
    }
}
