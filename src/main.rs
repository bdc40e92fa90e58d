mod aggregate;
mod chart;
mod config;
mod dataset;
mod extract;
mod metrics;
mod segment;

use chart::ChartSeries;
use clap::Parser;
use config::{Overrides, PlotterConfig};
use dataset::ProtocolDataset;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Parse protocol benchmark logs, average the repeated trials per data
/// size, and write one comparison chart per cost metric.
#[derive(Parser, Debug)]
#[command(name = "costplot", version, about)]
pub struct Cli {
    /// Protocol logs to compare (override the configured paths, in order)
    #[arg(value_name = "LOG")]
    logs: Vec<PathBuf>,

    /// Config file path
    #[arg(short, long, default_value = "costplot.toml")]
    config: PathBuf,

    /// Series label, repeatable (overrides config labels, in order)
    #[arg(short, long = "label", value_name = "LABEL")]
    labels: Vec<String>,

    /// Chart output directory (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Fail if the logs do not cover the same data sizes
    #[arg(long)]
    strict_sizes: bool,

    /// Print the aggregated datasets as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Parse and aggregate only, don't write charts
    #[arg(long)]
    no_charts: bool,

    /// Print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Debug logging (per-chart output, config resolution)
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PlotterConfig::load(&cli.config)?;
    config.apply(Overrides {
        logs: cli.logs,
        labels: cli.labels,
        output_dir: cli.output_dir,
        strict_sizes: cli.strict_sizes,
    });
    config.validate()?;

    if cli.dry_run {
        print_settings(&config);
        return Ok(());
    }

    let mut datasets = Vec::with_capacity(config.protocols.len());
    for protocol in &config.protocols {
        datasets.push(dataset::load_dataset(&protocol.path)?);
    }
    let labeled: Vec<(&str, &ProtocolDataset)> = config
        .protocols
        .iter()
        .zip(&datasets)
        .map(|(p, d)| (p.label.as_str(), d))
        .collect();

    let sizes = dataset::reconcile_sizes(&labeled, config.chart.size_policy)?;

    if cli.json {
        println!("{}", dataset::to_json(&labeled)?);
    }

    if cli.no_charts {
        return Ok(());
    }

    let series: Vec<ChartSeries<'_>> = labeled
        .iter()
        .enumerate()
        .map(|(i, &(label, dataset))| ChartSeries {
            label,
            marker: config.marker(i),
            dataset,
        })
        .collect();
    let written = chart::render_all(&series, &sizes, &config.chart)?;
    tracing::info!(
        charts = written.len(),
        dir = %config.chart.output_dir.display(),
        "rendered charts"
    );
    Ok(())
}

fn print_settings(config: &PlotterConfig) {
    println!("costplot v{}", env!("CARGO_PKG_VERSION"));
    println!("Protocols:");
    for (i, p) in config.protocols.iter().enumerate() {
        println!(
            "  {} <- {} ({:?})",
            p.label,
            p.path.display(),
            config.marker(i)
        );
    }
    println!("Output dir: {}", config.chart.output_dir.display());
    println!("Size policy: {:?}", config.chart.size_policy);
    println!("Charts:");
    for spec in metrics::METRICS.iter() {
        println!(
            "  {} [{}] -> {}",
            spec.kind,
            spec.kind.unit(),
            chart::chart_file_name(config.chart.title(spec.kind))
        );
    }
    println!("Dry run mode, config validated, not running.");
}
