//! Update frequency classification

use serde::Serialize;
use std::fmt;

/// Coarse label for how often a field changes relative to how often it was
/// observed. Ratio boundaries are strict (`>`): 0.8 exactly is `Frequent`,
/// 0.01 exactly is `Sparse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UpdateFrequency {
    /// Never observed
    Unknown,
    /// Observed but never changed
    Static,
    /// Change ratio at most 1%
    Sparse,
    /// Change ratio above 1%, at most 10%
    PerLap,
    /// Change ratio above 10%, at most 80%
    Frequent,
    /// Change ratio above 80%
    PerSample,
}

impl UpdateFrequency {
    /// Classify from a change count and an observation count.
    pub fn classify(change_count: u64, total_observations: u64) -> Self {
        if total_observations == 0 {
            return UpdateFrequency::Unknown;
        }
        if change_count == 0 {
            return UpdateFrequency::Static;
        }

        let rate = change_count as f64 / total_observations as f64;
        if rate > 0.8 {
            UpdateFrequency::PerSample
        } else if rate > 0.1 {
            UpdateFrequency::Frequent
        } else if rate > 0.01 {
            UpdateFrequency::PerLap
        } else {
            UpdateFrequency::Sparse
        }
    }

    /// Display label
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateFrequency::Unknown => "Unknown",
            UpdateFrequency::Static => "Static",
            UpdateFrequency::Sparse => "Sparse",
            UpdateFrequency::PerLap => "PerLap",
            UpdateFrequency::Frequent => "Frequent",
            UpdateFrequency::PerSample => "PerSample",
        }
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
