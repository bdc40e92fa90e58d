/// Metric table: the five cost families printed by the protocol binaries.
///
/// Each row pairs a [`MetricKind`] with the regex that captures its value,
/// the numeric type of that capture, and the scale applied at extraction
/// time. Extraction and aggregation walk this table; adding a metric means
/// adding a variant and a row, nothing else.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// The metric families reported per protocol run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    ClientComp,
    ServerComp,
    SmartComp,
    OffchainComm,
    OnchainComm,
}

impl MetricKind {
    /// Stable identifier used in config files and JSON output.
    pub fn id(self) -> &'static str {
        match self {
            MetricKind::ClientComp => "client_comp",
            MetricKind::ServerComp => "server_comp",
            MetricKind::SmartComp => "smart_comp",
            MetricKind::OffchainComm => "offchain_comm",
            MetricKind::OnchainComm => "onchain_comm",
        }
    }

    /// Unit of the aggregated value.
    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::ClientComp => "s",
            MetricKind::ServerComp => "ms",
            MetricKind::SmartComp => "µs",
            MetricKind::OffchainComm => "MiB",
            MetricKind::OnchainComm => "bytes",
        }
    }

    /// Chart title used when the config does not override it.
    pub fn default_title(self) -> &'static str {
        match self {
            MetricKind::ClientComp => "Client Computation (s)",
            MetricKind::ServerComp => "Server Computation (ms)",
            MetricKind::SmartComp => "Smart Contract Computation (µs)",
            MetricKind::OffchainComm => "Off-chain Communication (MB)",
            MetricKind::OnchainComm => "On-chain Communication (bytes)",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// How the captured text of a metric is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Decimal number such as `1.234567` (Duration debug output).
    Float,
    /// Unsigned byte count.
    Integer,
}

/// One row of the metric table.
#[derive(Debug)]
pub struct MetricSpec {
    pub kind: MetricKind,
    /// Pattern with a single capture group holding the number.
    pub pattern: Regex,
    pub value: ValueType,
    /// Multiplier applied to every parsed sample.
    pub scale: f64,
}

impl MetricSpec {
    fn new(kind: MetricKind, pattern: &str, value: ValueType, scale: f64) -> Self {
        Self {
            kind,
            pattern: Regex::new(pattern).unwrap(),
            value,
            scale,
        }
    }

    /// Parse a captured number according to this row's value type and scale.
    ///
    /// Returns `None` when the text is not a valid number of that type.
    pub fn parse(&self, raw: &str) -> Option<f64> {
        let value = match self.value {
            ValueType::Float => raw.parse::<f64>().ok()?,
            ValueType::Integer => raw.parse::<u64>().ok()? as f64,
        };
        Some(value * self.scale)
    }
}

/// The metric table, in chart-rendering order.
pub static METRICS: LazyLock<Vec<MetricSpec>> = LazyLock::new(|| {
    vec![
        MetricSpec::new(
            MetricKind::OnchainComm,
            r"ON-CHAIN COMMUNICATION COST: (\d+) bytes",
            ValueType::Integer,
            1.0,
        ),
        MetricSpec::new(
            MetricKind::OffchainComm,
            r"OFF-CHAIN COMMUNICATION COST: (\d+) bytes",
            ValueType::Integer,
            1.0 / BYTES_PER_MIB,
        ),
        MetricSpec::new(
            MetricKind::ClientComp,
            r"CLIENT COMPUTATION COST IS ([\d.]+)s",
            ValueType::Float,
            1.0,
        ),
        MetricSpec::new(
            MetricKind::ServerComp,
            r"SERVER COMPUTATION COST IS ([\d.]+)ms",
            ValueType::Float,
            1.0,
        ),
        MetricSpec::new(
            MetricKind::SmartComp,
            r"SMART CONTRACT COMPUTATION COST IS ([\d.]+)µs",
            ValueType::Float,
            1.0,
        ),
    ]
});
