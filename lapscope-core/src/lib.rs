//! Lapscope Core - Primitives for streaming telemetry analysis
//!
//! This crate provides the I/O-free building blocks shared by the analysis
//! consumers and the stream reader. It includes:
//!
//! - Error types
//! - Capacity limits and thresholds
//! - JSON value kinds and kind sets
//! - Field paths and wildcard normalization
//! - Leaf flattening with canonical values
//! - Update frequency classification

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod flatten;
pub mod frequency;
pub mod kind;
pub mod limits;
pub mod path;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use flatten::{flatten_leaves, truncate_chars, visit_leaves, Leaf};
pub use frequency::UpdateFrequency;
pub use kind::{KindSet, ValueKind};
pub use limits::ScanLimits;
pub use path::{wildcard_path, LENGTH_FIELD, WILDCARD_INDEX};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
