//! Lapscope Analysis - Consumers for the single-pass telemetry scan
//!
//! Every sample pulled from the stream is handed to each consumer in turn:
//!
//! - Schema accumulator merging structure into one schema tree
//! - Change tracker keeping per-path change history and wildcard aggregates
//! - Sample selector keeping fixed-position and high-change raw snapshots
//!
//! The field category tagger labels leaf paths for display.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod category;
pub mod changes;
pub mod schema;
pub mod selector;

// Re-export commonly used types
pub use lapscope_core::{Result, ScanError, ScanLimits, UpdateFrequency};

// Re-export our own types
pub use category::{classify_all, is_multi_car_path, FieldCategory};
pub use changes::{AggregatedFieldRecord, ChangeTracker, FieldChangeRecord};
pub use schema::{NodeId, SchemaAccumulator, SchemaNode};
pub use selector::{CapturedSample, FixedSample, InterestingSample, SampleLabel, SampleSelector};

use ahash::RandomState;
use serde_json::Value;

/// Fixed seeds so value hashes are stable across runs.
pub(crate) fn value_hasher() -> RandomState {
    RandomState::with_seeds(
        0x6c61_7073_636f_7065,
        0x7465_6c65_6d65_7472,
        0x7361_6d70_6c65_7321,
        0x6368_616e_6765_7321,
    )
}

/// The three consumers of one analysis pass, fed in lockstep.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Merged schema tree
    pub schema: SchemaAccumulator,
    /// Per-path change history
    pub changes: ChangeTracker,
    /// Representative snapshots, when sample extraction is enabled
    pub selector: Option<SampleSelector>,
}

impl Analysis {
    /// Fresh consumers sharing one set of limits
    pub fn new(limits: &ScanLimits, select_samples: bool) -> Self {
        Self {
            schema: SchemaAccumulator::new(limits.clone()),
            changes: ChangeTracker::new(limits.clone()),
            selector: select_samples.then(|| SampleSelector::new(limits)),
        }
    }

    /// Hand one sample to every consumer
    pub fn observe(&mut self, sample: &Value, sample_index: u64) {
        self.schema.merge(sample, sample_index);
        self.changes.record(sample, sample_index);
        if let Some(selector) = self.selector.as_mut() {
            selector.record(sample, sample_index);
        }
    }

    /// Samples handed to the consumers so far
    pub fn samples_analysed(&self) -> u64 {
        self.schema.samples_merged()
    }
}
