use crate::chart::Marker;
use crate::dataset::SizePolicy;
use crate::metrics::{MetricKind, METRICS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from costplot.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    #[serde(rename = "protocol")]
    pub protocols: Vec<ProtocolConfig>,
    pub chart: ChartConfig,
}

/// One protocol log to compare.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    pub label: String,
    pub path: PathBuf,
    /// Point marker; defaults by position (circle, square, ...).
    #[serde(default)]
    pub marker: Option<Marker>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub x_label: String,
    pub size_policy: SizePolicy,
    /// Per-metric title overrides; used as y-axis label and file name.
    pub titles: BTreeMap<String, String>,
}

impl ChartConfig {
    /// Display title for `kind`.
    pub fn title(&self, kind: MetricKind) -> &str {
        self.titles
            .get(kind.id())
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_title())
    }
}

// --- Default implementations ---

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            protocols: vec![
                ProtocolConfig {
                    label: "Protocol 1".to_string(),
                    path: PathBuf::from("prot1_output.txt"),
                    marker: None,
                },
                ProtocolConfig {
                    label: "Protocol 2".to_string(),
                    path: PathBuf::from("prot2_output.txt"),
                    marker: None,
                },
            ],
            chart: ChartConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            width: 800,
            height: 600,
            x_label: "Data Size (Bytes)".to_string(),
            size_policy: SizePolicy::Union,
            titles: BTreeMap::new(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub logs: Vec<PathBuf>,
    pub labels: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub strict_sizes: bool,
}

impl PlotterConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Merge CLI overrides. Logs and labels replace protocol entries in order;
    /// extra logs append new protocols.
    pub fn apply(&mut self, overrides: Overrides) {
        for (i, path) in overrides.logs.into_iter().enumerate() {
            match self.protocols.get_mut(i) {
                Some(p) => p.path = path,
                None => self.protocols.push(ProtocolConfig {
                    label: format!("Protocol {}", i + 1),
                    path,
                    marker: None,
                }),
            }
        }
        for (p, label) in self.protocols.iter_mut().zip(overrides.labels) {
            p.label = label;
        }
        if let Some(dir) = overrides.output_dir {
            self.chart.output_dir = dir;
        }
        if overrides.strict_sizes {
            self.chart.size_policy = SizePolicy::Strict;
        }
    }

    /// Reject configurations that cannot produce a chart.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocols.is_empty() {
            return Err(ConfigError::Invalid {
                detail: "at least one [[protocol]] entry is required".to_string(),
            });
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ConfigError::Invalid {
                detail: format!(
                    "chart size must be non-zero, got {}x{}",
                    self.chart.width, self.chart.height
                ),
            });
        }
        if let Some(id) = self
            .chart
            .titles
            .keys()
            .find(|id| !METRICS.iter().any(|spec| spec.kind.id() == id.as_str()))
        {
            return Err(ConfigError::Invalid {
                detail: format!("unknown metric '{id}' in [chart.titles]"),
            });
        }
        Ok(())
    }

    /// Marker for the protocol at `index`, falling back to the positional default.
    pub fn marker(&self, index: usize) -> Marker {
        self.protocols
            .get(index)
            .and_then(|p| p.marker)
            .unwrap_or_else(|| Marker::for_index(index))
    }
}

/// Errors from loading or validating config.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        detail: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config {}: {source}", path.display())
            }
            ConfigError::Invalid { detail } => write!(f, "invalid config: {detail}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}
