//! Error types for telemetry scanning

use thiserror::Error;

/// Lapscope error types
#[derive(Debug, Error)]
pub enum ScanError {
    /// Input file does not exist.
    #[error("Input file not found: {path}")]
    NotFound {
        /// Path that was requested
        path: String,
    },
    /// First significant byte is neither `[` nor `{`.
    #[error(
        "Unrecognized layout: unexpected byte 0x{byte:02X} ('{}') at offset {offset}. Expected '[' or '{{'.",
        printable(.byte)
    )]
    UnrecognizedLayout {
        /// Offending byte
        byte: u8,
        /// Byte offset of the offending byte
        offset: u64,
    },
    /// The `samples` array was not found inside the header window.
    #[error(
        "Samples array not found in header window: scanned {window_bytes} bytes without reaching \"samples\".\n\
         \n\
         Suggested fixes:\n\
         1. Increase the window: --header-window {suggested}\n\
         2. Move the \"samples\" property before large metadata properties"
    )]
    SamplesNotFound {
        /// Size of the header window that was scanned
        window_bytes: u64,
        /// Suggested window size for a retry
        suggested: u64,
    },
    /// JSON content is malformed before the natural end of the stream.
    #[error("Malformed JSON near byte {offset}: {reason}")]
    Malformed {
        /// Approximate byte offset of the failure
        offset: u64,
        /// Description of the failure
        reason: String,
    },
    /// A single sample is larger than the configured capture cap.
    #[error("Sample starting near byte {offset} exceeds max_sample_bytes ({limit} bytes)")]
    SampleTooLarge {
        /// Offset where the sample starts
        offset: u64,
        /// Configured cap
        limit: u64,
    },
    /// Input ended before the sample array was closed.
    #[error("Unexpected end of input near byte {offset}")]
    UnexpectedEof {
        /// Byte offset where input ran out
        offset: u64,
    },
    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// Approximate byte offset associated with the error, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ScanError::UnrecognizedLayout { offset, .. }
            | ScanError::Malformed { offset, .. }
            | ScanError::SampleTooLarge { offset, .. }
            | ScanError::UnexpectedEof { offset } => Some(*offset),
            _ => None,
        }
    }

    /// Whether the error is a framing/parse failure (as opposed to I/O or config).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ScanError::UnrecognizedLayout { .. }
                | ScanError::SamplesNotFound { .. }
                | ScanError::Malformed { .. }
                | ScanError::UnexpectedEof { .. }
                | ScanError::Json(_)
        )
    }
}

fn printable(byte: &u8) -> String {
    char::from(*byte).escape_default().to_string()
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_layout_message_names_byte() {
        let err = ScanError::UnrecognizedLayout {
            byte: b'x',
            offset: 3,
        };
        let message = err.to_string();
        assert!(message.contains("0x78"));
        assert!(message.contains("'x'"));
        assert_eq!(err.offset(), Some(3));
    }

    #[test]
    fn samples_not_found_suggests_window() {
        let err = ScanError::SamplesNotFound {
            window_bytes: 1024,
            suggested: 2048,
        };
        assert!(err.to_string().contains("--header-window 2048"));
        assert!(err.is_format_error());
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn oversized_sample_is_not_a_format_error() {
        let err = ScanError::SampleTooLarge {
            offset: 40,
            limit: 1024,
        };
        assert!(err.to_string().contains("max_sample_bytes (1024 bytes)"));
        assert_eq!(err.offset(), Some(40));
        assert!(!err.is_format_error());
    }

    #[test]
    fn io_errors_are_not_format_errors() {
        let err = ScanError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_format_error());
    }
}
