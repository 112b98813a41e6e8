//! Lapscope CLI - Schema discovery for racing telemetry recordings
//!
//! This binary provides command-line interfaces for:
//! - analyze: stream a recording, write the schema report and sample snapshots
//! - probe: detect the layout and print session metadata without a full pass

mod report;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use lapscope_io::{
    execute_analysis, write_samples, AnalysisOptions, AnalysisReport, AnalysisRequest,
    AnalysisSummary, NoProgress, ProgressObserver, SampleReader, ScanLimits,
};
use report::{format_bytes, group_digits, REPORT_FILE_NAME};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "LAPSCOPE_LOG";

#[derive(Parser)]
#[command(name = "lapscope")]
#[command(about = "Schema and change analysis for racing telemetry JSON recordings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a recording and write the schema report
    ///
    /// Examples:
    ///   lapscope analyze session.json
    ///   lapscope analyze session.json -o out --stride 10 --progress
    ///   lapscope analyze huge.json --max-samples 5000 --skip-samples
    Analyze {
        /// Input recording (root array or `{"session": ..., "samples": [...]}`)
        input: PathBuf,
        /// Output directory for the report and sample files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
        /// Stop after this many analysed samples
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_samples: Option<u64>,
        /// Analyse every Nth sample
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
        stride: u64,
        /// Do not write representative sample files
        #[arg(long)]
        skip_samples: bool,
        /// TOML file with limits and thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// Bytes scanned from the start of the file to find the samples array
        #[arg(long)]
        header_window: Option<u64>,
        /// Delta threshold for the anomaly table
        #[arg(long)]
        anomaly_threshold: Option<f64>,
        /// Show a progress bar while streaming
        #[arg(long)]
        progress: bool,
    },
    /// Detect the layout and print session metadata
    ///
    /// Examples:
    ///   lapscope probe session.json
    ///   lapscope probe session.json --format json
    Probe {
        /// Input recording
        input: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = ProbeFormat::Table)]
        format: ProbeFormat,
        /// TOML file with limits and thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// Bytes scanned from the start of the file to find the samples array
        #[arg(long)]
        header_window: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ProbeFormat {
    Table,
    Json,
}

/// Optional TOML configuration; explicit flags win over its values.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    limits: ScanLimits,
    anomaly_threshold: Option<f64>,
    summary_anomaly_threshold: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            max_samples,
            stride,
            skip_samples,
            config,
            header_window,
            anomaly_threshold,
            progress,
        } => handle_analyze(
            input,
            output,
            max_samples,
            stride,
            skip_samples,
            config,
            header_window,
            anomaly_threshold,
            progress,
        ),
        Commands::Probe {
            input,
            format,
            config,
            header_window,
        } => handle_probe(input, format, config, header_window),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when embedded; keep going with it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
    let config: ConfigFile =
        toml::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

fn resolve_limits(config: ScanLimits, header_window: Option<u64>) -> ScanLimits {
    let mut limits = config;
    if let Some(window) = header_window {
        limits.header_window_bytes = window;
    }
    limits
}

#[allow(clippy::too_many_arguments)]
fn handle_analyze(
    input: PathBuf,
    output: PathBuf,
    max_samples: Option<u64>,
    stride: u64,
    skip_samples: bool,
    config: Option<PathBuf>,
    header_window: Option<u64>,
    anomaly_threshold: Option<f64>,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config.as_deref())?;
    let mut options = AnalysisOptions {
        limits: resolve_limits(config.limits, header_window),
        max_samples,
        stride,
        extract_samples: !skip_samples,
        ..Default::default()
    };
    if let Some(threshold) = config.anomaly_threshold {
        options.anomaly_threshold = threshold;
    }
    if let Some(threshold) = config.summary_anomaly_threshold {
        options.summary_anomaly_threshold = threshold;
    }
    if let Some(threshold) = anomaly_threshold {
        options.anomaly_threshold = threshold;
    }
    let anomaly_threshold = options.anomaly_threshold;
    let summary_threshold = options.summary_anomaly_threshold;

    fs::create_dir_all(&output)
        .map_err(|e| format!("failed to create output directory {}: {e}", output.display()))?;

    let request = AnalysisRequest { input, options };
    let mut progress_bar = show_progress.then(BarProgress::new);
    let result = match progress_bar.as_mut() {
        Some(bar) => execute_analysis(request, bar),
        None => execute_analysis(request, &mut NoProgress),
    };

    let report = match result {
        Ok(report) => report,
        Err(failure) => {
            if let Some(bar) = progress_bar.take() {
                bar.abandon();
            }
            if let Some(partial) = &failure.partial {
                let mut stderr = std::io::stderr().lock();
                writeln!(
                    &mut stderr,
                    "Analysis stopped after {} samples; no report written",
                    group_digits(partial.samples_analysed())
                )?;
            }
            return Err(failure.error.into());
        }
    };

    let sample_files = match &report.analysis.selector {
        Some(selector) => write_samples(selector, &output)?,
        None => Vec::new(),
    };

    let markdown = report::render(&report, anomaly_threshold)?;
    let report_path = output.join(REPORT_FILE_NAME);
    fs::write(&report_path, markdown)
        .map_err(|e| format!("failed to write report {}: {e}", report_path.display()))?;
    info!(path = %report_path.display(), "Wrote schema report");

    report_analysis_summary(&report, sample_files.len(), &report_path, summary_threshold)?;
    Ok(())
}

fn report_analysis_summary(
    report: &AnalysisReport,
    sample_files: usize,
    report_path: &Path,
    summary_threshold: f64,
) -> Result<(), Box<dyn Error>> {
    let summary = &report.summary;
    let schema = &report.analysis.schema;
    let changes = &report.analysis.changes;
    let static_paths = changes.static_fields().len() as u64;
    let static_groups = changes.aggregated_static_fields().len() as u64;
    let dynamic_paths = changes.dynamic_count() as u64;
    let dynamic_groups = changes.aggregated_dynamic_fields(usize::MAX).len() as u64;
    let anomalies = changes.aggregated_anomalies(summary_threshold).len() as u64;

    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Analysed {} ({}, {}) in {:.2?}, stream end: {}",
        summary.input.display(),
        summary.layout,
        format_bytes(summary.file_size),
        summary.elapsed,
        summary.end
    )?;
    writeln!(
        &mut stderr,
        "  Samples processed: {}",
        group_digits(summary.samples_analysed)
    )?;
    if summary.samples_read != summary.samples_analysed {
        writeln!(
            &mut stderr,
            "  Samples read:      {}",
            group_digits(summary.samples_read)
        )?;
    }
    writeln!(
        &mut stderr,
        "  Unique fields:     {}",
        group_digits(schema.leaf_count() as u64)
    )?;
    writeln!(&mut stderr, "  Max depth:         {}", schema.max_depth())?;
    writeln!(
        &mut stderr,
        "  Tracked paths:     {}",
        group_digits(changes.tracked_paths() as u64)
    )?;
    writeln!(
        &mut stderr,
        "  Static paths:      {} ({} unique)",
        group_digits(static_paths),
        group_digits(static_groups)
    )?;
    writeln!(
        &mut stderr,
        "  Dynamic paths:     {} ({} unique)",
        group_digits(dynamic_paths),
        group_digits(dynamic_groups)
    )?;
    writeln!(
        &mut stderr,
        "  Anomalies:         {} (delta >= {})",
        group_digits(anomalies),
        report::format_number(summary_threshold)
    )?;
    writeln!(&mut stderr, "  Sample files:      {sample_files}")?;
    writeln!(&mut stderr, "  Report:            {}", report_path.display())?;
    Ok(())
}

fn handle_probe(
    input: PathBuf,
    format: ProbeFormat,
    config: Option<PathBuf>,
    header_window: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config.as_deref())?;
    let limits = resolve_limits(config.limits, header_window);
    let reader = SampleReader::open(&input, &limits)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        ProbeFormat::Json => {
            let document = serde_json::json!({
                "input": reader.path().display().to_string(),
                "layout": reader.layout(),
                "file_size": reader.file_size(),
                "samples_offset": reader.samples_offset(),
                "session": reader.session_metadata(),
            });
            serde_json::to_writer_pretty(&mut out, &document)?;
            writeln!(&mut out)?;
        }
        ProbeFormat::Table => {
            writeln!(&mut out, "Input:          {}", reader.path().display())?;
            writeln!(&mut out, "Layout:         {}", reader.layout())?;
            writeln!(
                &mut out,
                "File size:      {} ({} bytes)",
                format_bytes(reader.file_size()),
                group_digits(reader.file_size())
            )?;
            writeln!(&mut out, "Samples offset: {}", reader.samples_offset())?;
            match reader.session_metadata() {
                Some(Value::Object(map)) if !map.is_empty() => {
                    writeln!(&mut out, "Session:")?;
                    for (key, value) in map {
                        let text = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        writeln!(&mut out, "  {key} = {text}")?;
                    }
                }
                _ => writeln!(&mut out, "Session:        (none)")?,
            }
        }
    }
    Ok(())
}

/// Byte-based progress bar fed by the analysis pass
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn abandon(self) {
        self.bar.abandon_with_message("analysis failed");
    }
}

impl ProgressObserver for BarProgress {
    fn on_start(&mut self, file_size: u64) {
        self.bar.set_length(file_size);
    }

    fn on_sample(&mut self, bytes_read: u64, samples_analysed: u64) {
        self.bar.set_position(bytes_read);
        if samples_analysed % 100 == 0 {
            self.bar
                .set_message(format!("{} samples", group_digits(samples_analysed)));
        }
    }

    fn on_finish(&mut self, summary: &AnalysisSummary) {
        self.bar.finish_with_message(format!(
            "Analysed {} samples in {:.2?}",
            group_digits(summary.samples_analysed),
            summary.elapsed
        ));
    }
}
