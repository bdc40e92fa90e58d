/// Chart rendering: one SVG line chart per metric, comparing protocols
/// across data sizes.
///
/// Absent values are drawn as gaps: the line breaks and no marker is placed.
use crate::config::ChartConfig;
use crate::dataset::ProtocolDataset;
use crate::metrics::{MetricKind, METRICS};
use plotters::prelude::*;
use serde::Deserialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

const MARKER_SIZE: i32 = 4;
const LINE_WIDTH: u32 = 2;

/// Point marker distinguishing one series from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Circle,
    Square,
    Triangle,
    Cross,
}

impl Marker {
    /// Positional default: circle, square, triangle, cross, then repeat.
    pub fn for_index(index: usize) -> Self {
        match index % 4 {
            0 => Marker::Circle,
            1 => Marker::Square,
            2 => Marker::Triangle,
            _ => Marker::Cross,
        }
    }
}

/// One protocol's line on a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartSeries<'a> {
    pub label: &'a str,
    pub marker: Marker,
    pub dataset: &'a ProtocolDataset,
}

/// File name for a chart title; path separators are replaced.
pub fn chart_file_name(title: &str) -> String {
    format!("{}.svg", title.replace(['/', '\\'], "_"))
}

/// Render every metric in table order into `config.output_dir`.
///
/// Returns the written paths.
pub fn render_all(
    series: &[ChartSeries<'_>],
    sizes: &[u64],
    config: &ChartConfig,
) -> Result<Vec<PathBuf>, ChartError> {
    let out_dir = &config.output_dir;
    std::fs::create_dir_all(out_dir).map_err(|e| ChartError::CreateDir {
        path: out_dir.clone(),
        source: e,
    })?;

    let mut written = Vec::with_capacity(METRICS.len());
    for spec in METRICS.iter() {
        written.push(render_chart(spec.kind, series, sizes, config, out_dir)?);
    }
    Ok(written)
}

/// Render one metric's chart into `out_dir`.
pub fn render_chart(
    kind: MetricKind,
    series: &[ChartSeries<'_>],
    sizes: &[u64],
    config: &ChartConfig,
    out_dir: &Path,
) -> Result<PathBuf, ChartError> {
    let title = config.title(kind);
    let path = out_dir.join(chart_file_name(title));

    let columns: Vec<Vec<Option<f64>>> = series
        .iter()
        .map(|s| sizes.iter().map(|&size| s.dataset.value(size, kind)).collect())
        .collect();
    if columns.iter().flatten().all(Option::is_none) {
        tracing::warn!(metric = %kind, "no samples for metric in any log, chart will be empty");
    }

    draw(&path, title, sizes, series, &columns, config).map_err(|e| ChartError::Render {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    tracing::debug!(metric = %kind, path = %path.display(), "wrote chart");
    Ok(path)
}

fn draw(
    path: &Path,
    title: &str,
    sizes: &[u64],
    series: &[ChartSeries<'_>],
    columns: &[Vec<Option<f64>>],
    config: &ChartConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let xs: Vec<f64> = sizes.iter().map(|&s| s as f64).collect();
    let x_range = axis_range(xs.iter().copied(), false);
    let y_range = axis_range(columns.iter().flatten().flatten().copied(), true);

    let root = SVGBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{title} vs Data Size"), ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(config.x_label.as_str())
        .y_desc(title)
        .x_labels(sizes.len().clamp(2, 12))
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .draw()?;

    for (idx, (s, values)) in series.iter().zip(columns).enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let line = color.stroke_width(LINE_WIDTH);

        // Legend entry, drawn even when the series has no points.
        chart
            .draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), line))?
            .label(s.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));

        for run in segments(&xs, values) {
            chart.draw_series(LineSeries::new(run, line))?;
        }

        let points: Vec<(f64, f64)> = xs
            .iter()
            .zip(values)
            .filter_map(|(&x, v)| v.map(|y| (x, y)))
            .collect();
        let fill = color.filled();
        match s.marker {
            Marker::Circle => {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, MARKER_SIZE, fill)))?;
            }
            Marker::Square => {
                chart.draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p)
                        + Rectangle::new(
                            [(-MARKER_SIZE, -MARKER_SIZE), (MARKER_SIZE, MARKER_SIZE)],
                            fill,
                        )
                }))?;
            }
            Marker::Triangle => {
                chart.draw_series(
                    points
                        .iter()
                        .map(|&p| TriangleMarker::new(p, MARKER_SIZE + 1, fill)),
                )?;
            }
            Marker::Cross => {
                chart.draw_series(points.iter().map(|&p| Cross::new(p, MARKER_SIZE, line)))?;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Split a column into runs of consecutive present values.
fn segments(xs: &[f64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (&x, value) in xs.iter().zip(values) {
        match value {
            Some(y) => current.push((x, *y)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Padded axis range covering `values`; `0.0..1.0` when there are none.
///
/// With `from_zero` the range starts at zero unless values go negative.
fn axis_range(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let lo = if from_zero { lo.min(0.0) } else { lo };
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else if hi != 0.0 {
        hi.abs() * 0.1
    } else {
        1.0
    };
    if from_zero && lo >= 0.0 {
        lo..hi + pad
    } else {
        lo - pad..hi + pad
    }
}

/// Errors from chart rendering.
#[derive(Debug)]
pub enum ChartError {
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Render {
        path: PathBuf,
        detail: String,
    },
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::CreateDir { path, source } => {
                write!(
                    f,
                    "failed to create output directory {}: {source}",
                    path.display()
                )
            }
            ChartError::Render { path, detail } => {
                write!(f, "failed to render chart {}: {detail}", path.display())
            }
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChartError::CreateDir { source, .. } => Some(source),
            ChartError::Render { .. } => None,
        }
    }
}
