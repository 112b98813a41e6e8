//! Lapscope I/O - Streaming sample reader and analysis driver
//!
//! This crate provides the file-facing layer of lapscope:
//!
//! - Layout detection for root-array and root-object recordings
//! - Header window scan capturing session metadata
//! - Forward-only sample streaming in bounded memory
//! - The single-pass analysis driver
//! - Representative sample snapshot writer

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod array;
pub mod header;
pub mod lexer;
pub mod pipeline;
pub mod prefixed;
pub mod reader;
pub mod samples;

// Re-export commonly used types
pub use lapscope_analysis::{Analysis, SampleSelector};
pub use lapscope_core::{Result, ScanError, ScanLimits};

// Re-export our own types
pub use header::HeaderInfo;
pub use pipeline::{
    execute_analysis, AnalysisFailure, AnalysisOptions, AnalysisReport, AnalysisRequest,
    AnalysisSummary, NoProgress, ProgressObserver,
};
pub use prefixed::PrefixedReader;
pub use reader::{EndReason, Layout, SampleReader, SampleStream, StreamedSample};
pub use samples::write_samples;
