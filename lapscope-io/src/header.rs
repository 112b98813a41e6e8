//! Header window scan for root-object recordings
//!
//! Walks the top-level properties of `{ "session": {...}, "samples": [...] }`
//! inside a bounded prefix of the file, capturing the session object and
//! stopping right after the opening bracket of `samples`. Other properties
//! are framed and skipped without being parsed.

use crate::lexer::JsonScanner;
use lapscope_core::{Result, ScanError, ScanLimits};
use serde_json::Value;
use std::io::BufRead;
use tracing::{debug, trace};

const SESSION_KEY: &str = "session";
const SAMPLES_KEY: &str = "samples";

/// What the header scan found
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    /// Session metadata object, if present before `samples`
    pub session: Option<Value>,
    /// Offset of the first byte after the `samples` array's `[`
    pub samples_offset: u64,
}

/// Scan the root object from its `{`.
///
/// `window` is the number of bytes the scanner can see; running out of them
/// before `samples` is reached is reported as [`ScanError::SamplesNotFound`]
/// unless the window already covers the whole file.
pub fn scan_header<R: BufRead>(
    scanner: &mut JsonScanner<R>,
    window: u64,
    file_size: u64,
) -> Result<HeaderInfo> {
    scan_properties(scanner).map_err(|err| match err {
        ScanError::UnexpectedEof { .. } if window < file_size => ScanError::SamplesNotFound {
            window_bytes: window,
            suggested: ScanLimits::suggest_header_window(window),
        },
        other => other,
    })
}

fn scan_properties<R: BufRead>(scanner: &mut JsonScanner<R>) -> Result<HeaderInfo> {
    scanner.expect(b'{')?;
    let mut session = None;
    let mut need_separator = false;

    loop {
        let byte = scanner
            .skip_whitespace()?
            .ok_or(ScanError::UnexpectedEof {
                offset: scanner.offset(),
            })?;

        if need_separator {
            match byte {
                b',' => {
                    scanner.next_byte()?;
                    need_separator = false;
                    continue;
                }
                b'}' => return Err(no_samples(scanner.offset())),
                other => {
                    return Err(ScanError::Malformed {
                        offset: scanner.offset(),
                        reason: format!(
                            "expected ',' or '}}' between root properties, found '{}'",
                            char::from(other).escape_default()
                        ),
                    })
                }
            }
        }
        if byte == b'}' {
            return Err(no_samples(scanner.offset()));
        }

        let key_offset = scanner.offset();
        let key = scanner.read_string()?;
        scanner.expect(b':')?;
        trace!(key = %key, offset = key_offset, "Root property");

        if key.eq_ignore_ascii_case(SAMPLES_KEY) {
            return match scanner.skip_whitespace()? {
                Some(b'[') => {
                    scanner.next_byte()?;
                    debug!(
                        samples_offset = scanner.offset(),
                        has_session = session.is_some(),
                        "Located samples array"
                    );
                    Ok(HeaderInfo {
                        session,
                        samples_offset: scanner.offset(),
                    })
                }
                Some(_) => Err(ScanError::Malformed {
                    offset: scanner.offset(),
                    reason: format!("\"{key}\" is not an array"),
                }),
                None => Err(ScanError::UnexpectedEof {
                    offset: scanner.offset(),
                }),
            };
        }

        let is_session = key.eq_ignore_ascii_case(SESSION_KEY) && session.is_none();
        if is_session && scanner.skip_whitespace()? == Some(b'{') {
            let start = scanner.offset();
            let mut raw = Vec::new();
            scanner.read_value(Some(&mut raw))?;
            let value: Value = serde_json::from_slice(&raw).map_err(|err| ScanError::Malformed {
                offset: start,
                reason: format!("invalid session object: {err}"),
            })?;
            debug!(bytes = raw.len(), "Captured session metadata");
            session = Some(value);
        } else {
            scanner.read_value(None)?;
        }
        need_separator = true;
    }
}

fn no_samples(offset: u64) -> ScanError {
    ScanError::Malformed {
        offset,
        reason: "root object has no \"samples\" array".to_string(),
    }
}
