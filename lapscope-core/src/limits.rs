//! Capacity limits and thresholds

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Caps and thresholds shared by the reader and the analysis consumers.
///
/// Every bounded collection stops growing silently once its cap is reached;
/// the caps trade precision for memory, they are never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanLimits {
    /// Raw sample values kept per schema node (first seen, first kept)
    pub max_sample_values: usize,
    /// Distinct values tracked per schema node before the set is capped
    pub max_distinct_values: usize,
    /// Change indices kept per leaf path
    pub max_change_indices: usize,
    /// Elements merged into the element schema per array per sample
    pub max_elements_per_array: usize,
    /// Arrays up to this length are stored verbatim as a sample value
    pub inline_array_sample_len: usize,
    /// Strings longer than this are truncated before sample storage
    pub max_string_sample_chars: usize,
    /// First/last values on change records are truncated to this many chars
    pub max_value_chars: usize,
    /// Arrays up to this length are indexed per element; longer ones track `.length`
    pub index_threshold: usize,
    /// Earliest change indices kept on an aggregated (wildcard) record
    pub max_aggregated_change_indices: usize,
    /// Bytes read from the start of a root-object file to locate `samples`
    pub header_window_bytes: u64,
    /// Parse failures this close to end of file end the stream gracefully
    pub end_tolerance_bytes: u64,
    /// Top-K size for "interesting" sample snapshots
    pub interesting_samples: usize,
    /// Assumed average sample size used to estimate the sample count
    pub avg_sample_bytes: u64,
    /// Largest single sample the reader will buffer for parsing
    pub max_sample_bytes: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_sample_values: 5,
            max_distinct_values: 100,
            max_change_indices: 20,
            max_elements_per_array: 50,
            inline_array_sample_len: 10,
            max_string_sample_chars: 100,
            max_value_chars: 100,
            index_threshold: 256,
            max_aggregated_change_indices: 5,
            header_window_bytes: 2 * MIB,
            end_tolerance_bytes: 1024,
            interesting_samples: 5,
            avg_sample_bytes: 18_000,
            max_sample_bytes: 64 * MIB,
        }
    }
}

impl ScanLimits {
    /// Hard maximum for the header window
    pub const MAX_HEADER_WINDOW_BYTES: u64 = 256 * MIB;

    /// Hard maximum for a single buffered sample
    pub const MAX_SAMPLE_BYTES: u64 = 1024 * MIB;

    /// Validate that every limit is usable.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("max_sample_values", self.max_sample_values),
            ("max_distinct_values", self.max_distinct_values),
            ("max_elements_per_array", self.max_elements_per_array),
            ("max_string_sample_chars", self.max_string_sample_chars),
            ("max_value_chars", self.max_value_chars),
            ("index_threshold", self.index_threshold),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ScanError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }

        if self.header_window_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "header_window_bytes must be at least 1".to_string(),
            ));
        }

        if self.header_window_bytes > Self::MAX_HEADER_WINDOW_BYTES {
            return Err(ScanError::InvalidConfig(format!(
                "header_window_bytes {} exceeds hard limit {}",
                self.header_window_bytes,
                Self::MAX_HEADER_WINDOW_BYTES
            )));
        }

        if self.max_sample_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "max_sample_bytes must be at least 1".to_string(),
            ));
        }

        if self.max_sample_bytes > Self::MAX_SAMPLE_BYTES {
            return Err(ScanError::InvalidConfig(format!(
                "max_sample_bytes {} exceeds hard limit {}",
                self.max_sample_bytes,
                Self::MAX_SAMPLE_BYTES
            )));
        }

        if self.avg_sample_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "avg_sample_bytes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Window size to suggest after `window` proved too small.
    pub fn suggest_header_window(window: u64) -> u64 {
        window
            .saturating_mul(4)
            .clamp(MIB, Self::MAX_HEADER_WINDOW_BYTES)
    }

    /// Rough sample count for a file of `file_size` bytes (at least 1).
    pub fn estimate_sample_count(&self, file_size: u64) -> u64 {
        (file_size / self.avg_sample_bytes.max(1)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ScanLimits::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_index_threshold() {
        let limits = ScanLimits {
            index_threshold: 0,
            ..Default::default()
        };
        let err = limits.validate().unwrap_err();
        assert!(err.to_string().contains("index_threshold"));
    }

    #[test]
    fn rejects_oversized_header_window() {
        let limits = ScanLimits {
            header_window_bytes: ScanLimits::MAX_HEADER_WINDOW_BYTES + 1,
            ..Default::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_unusable_sample_cap() {
        let zero = ScanLimits {
            max_sample_bytes: 0,
            ..Default::default()
        };
        assert!(zero.validate().unwrap_err().to_string().contains("max_sample_bytes"));

        let huge = ScanLimits {
            max_sample_bytes: ScanLimits::MAX_SAMPLE_BYTES + 1,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn suggested_window_grows_and_clamps() {
        assert_eq!(ScanLimits::suggest_header_window(2 * MIB), 8 * MIB);
        assert_eq!(ScanLimits::suggest_header_window(16), MIB);
        assert_eq!(
            ScanLimits::suggest_header_window(200 * MIB),
            ScanLimits::MAX_HEADER_WINDOW_BYTES
        );
    }

    #[test]
    fn estimate_never_returns_zero() {
        let limits = ScanLimits::default();
        assert_eq!(limits.estimate_sample_count(10), 1);
        assert_eq!(limits.estimate_sample_count(180_000), 10);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let limits: ScanLimits =
            serde_json::from_str(r#"{"index_threshold": 512}"#).expect("partial config");
        assert_eq!(limits.index_threshold, 512);
        assert_eq!(limits.max_sample_values, 5);
    }
}
