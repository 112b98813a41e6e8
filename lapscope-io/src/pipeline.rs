//! Single-pass analysis driver
//!
//! Probes the recording, then streams every sample through the schema
//! accumulator, change tracker and sample selector in lockstep.

use crate::reader::{EndReason, Layout, SampleReader};
use lapscope_analysis::Analysis;
use lapscope_core::{Result, ScanError, ScanLimits};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Options for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Caps and thresholds shared by reader and consumers
    pub limits: ScanLimits,
    /// Stop after this many analysed samples
    pub max_samples: Option<u64>,
    /// Analyse every Nth raw sample; intermediate samples are still read
    pub stride: u64,
    /// Keep representative raw snapshots
    pub extract_samples: bool,
    /// Delta threshold for anomaly listings
    pub anomaly_threshold: f64,
    /// Delta threshold for the summary anomaly count
    pub summary_anomaly_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            limits: ScanLimits::default(),
            max_samples: None,
            stride: 1,
            extract_samples: true,
            anomaly_threshold: 5.0,
            summary_anomaly_threshold: 10.0,
        }
    }
}

impl AnalysisOptions {
    /// Validate options and limits
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        if self.stride == 0 {
            return Err(ScanError::InvalidConfig("stride must be at least 1".to_string()));
        }
        if self.max_samples == Some(0) {
            return Err(ScanError::InvalidConfig(
                "max_samples must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("anomaly_threshold", self.anomaly_threshold),
            ("summary_anomaly_threshold", self.summary_anomaly_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScanError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn raw_sample_cap(&self) -> Option<u64> {
        self.max_samples.map(|max| max.saturating_mul(self.stride))
    }
}

/// Request to analyse one recording
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Input file path
    pub input: PathBuf,
    /// Analysis options
    pub options: AnalysisOptions,
}

/// Outcome of a completed pass
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    /// Input file path
    pub input: PathBuf,
    /// Detected layout
    pub layout: Layout,
    /// Input size in bytes
    pub file_size: u64,
    /// Offset of the first byte inside the sample array
    pub samples_offset: u64,
    /// Session metadata, if the recording had one
    pub session: Option<Value>,
    /// Raw samples pulled from the stream
    pub samples_read: u64,
    /// Samples handed to the consumers
    pub samples_analysed: u64,
    /// Bytes of the file consumed
    pub bytes_read: u64,
    /// Why the stream stopped
    pub end: EndReason,
    /// Wall-clock time of probe and pass
    pub elapsed: Duration,
}

/// Analysis state plus the pass summary
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Consumers after the pass
    pub analysis: Analysis,
    /// Pass summary
    pub summary: AnalysisSummary,
}

/// Fatal analysis error.
///
/// Failures during the sample pass keep whatever the consumers accumulated up
/// to the last good sample; probe failures carry nothing.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct AnalysisFailure {
    /// Underlying error
    #[source]
    pub error: ScanError,
    /// Consumer state up to the failure
    pub partial: Option<Box<Analysis>>,
}

impl From<ScanError> for AnalysisFailure {
    fn from(error: ScanError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

/// Receives progress callbacks during the pass
pub trait ProgressObserver {
    /// Called once after the probe, before the first sample
    fn on_start(&mut self, _file_size: u64) {}

    /// Called after every raw sample
    fn on_sample(&mut self, bytes_read: u64, samples_analysed: u64);

    /// Called once after a pass that did not fail
    fn on_finish(&mut self, _summary: &AnalysisSummary) {}
}

/// Observer that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_sample(&mut self, _bytes_read: u64, _samples_analysed: u64) {}
}

/// Probe the recording and run one analysis pass over it.
pub fn execute_analysis(
    request: AnalysisRequest,
    progress: &mut dyn ProgressObserver,
) -> std::result::Result<AnalysisReport, AnalysisFailure> {
    let AnalysisRequest { input, options } = request;
    options.validate()?;
    let started = Instant::now();

    let reader = SampleReader::open(&input, &options.limits)?;
    let mut analysis = Analysis::new(&options.limits, options.extract_samples);
    if let Some(session) = reader.session_metadata() {
        analysis.schema.merge_session(session);
    }
    if let Some(selector) = analysis.selector.as_mut() {
        let mut estimate =
            options.limits.estimate_sample_count(reader.file_size()) / options.stride;
        if let Some(max) = options.max_samples {
            estimate = estimate.min(max);
        }
        selector.set_total_estimate(estimate);
    }

    progress.on_start(reader.file_size());
    let mut stream = reader.samples(options.raw_sample_cap())?;
    let mut last: Option<(u64, Value)> = None;

    for (raw_index, item) in (&mut stream).enumerate() {
        let sample = match item {
            Ok(sample) => sample,
            Err(error) => {
                finish_selector(&mut analysis, last.as_ref());
                debug!(
                    samples_analysed = analysis.samples_analysed(),
                    error = %error,
                    "Analysis pass failed"
                );
                return Err(AnalysisFailure {
                    error,
                    partial: Some(Box::new(analysis)),
                });
            }
        };

        if raw_index as u64 % options.stride == 0 {
            let sample_index = analysis.samples_analysed();
            analysis.observe(&sample.value, sample_index);
            last = Some((sample_index, sample.value));
        }
        progress.on_sample(sample.offset, analysis.samples_analysed());
    }
    finish_selector(&mut analysis, last.as_ref());

    let summary = AnalysisSummary {
        input,
        layout: reader.layout(),
        file_size: reader.file_size(),
        samples_offset: reader.samples_offset(),
        session: reader.session_metadata().cloned(),
        samples_read: stream.samples_read(),
        samples_analysed: analysis.samples_analysed(),
        bytes_read: stream.bytes_read(),
        end: stream.end_reason().cloned().unwrap_or(EndReason::ArrayClosed),
        elapsed: started.elapsed(),
    };

    info!(
        samples_read = summary.samples_read,
        samples_analysed = summary.samples_analysed,
        bytes_read = summary.bytes_read,
        leaf_fields = analysis.schema.leaf_count(),
        tracked_paths = analysis.changes.tracked_paths(),
        end = %summary.end,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Analysis pass complete"
    );
    progress.on_finish(&summary);

    Ok(AnalysisReport { analysis, summary })
}

fn finish_selector(analysis: &mut Analysis, last: Option<&(u64, Value)>) {
    if let Some(selector) = analysis.selector.as_mut() {
        selector.finish(last.map(|(index, value)| (*index, value)));
    }
}
