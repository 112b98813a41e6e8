//! Sample stream reader
//!
//! Detects the container layout of a recording, exposes the captured session
//! metadata, and opens forward-only passes over the samples.

use crate::array::ArrayElements;
use crate::header::scan_header;
use crate::lexer::JsonScanner;
use crate::prefixed::PrefixedReader;
use lapscope_core::{Result, ScanError, ScanLimits};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type SampleSource = BufReader<Box<dyn Read + Send>>;

/// Top-level container layout of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// `[ <sample>, ... ]`
    RootArray,
    /// `{ "session": {...}, "samples": [ <sample>, ... ] }`
    RootObject,
}

impl Layout {
    /// Short name for logs and summaries
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::RootArray => "root-array",
            Layout::RootObject => "root-object",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sample stream stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EndReason {
    /// The closing `]` of the sample array was read
    ArrayClosed,
    /// The caller's sample limit was reached
    LimitReached,
    /// A parse failure close to end of file ended a wrapped stream
    EndOfFile {
        /// Offset of the failure
        offset: u64,
        /// Parser message
        reason: String,
    },
    /// A fatal error was yielded
    Failed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::ArrayClosed => f.write_str("end of sample array"),
            EndReason::LimitReached => f.write_str("sample limit reached"),
            EndReason::EndOfFile { offset, .. } => {
                write!(f, "end of file (unterminated data near byte {offset})")
            }
            EndReason::Failed => f.write_str("failed"),
        }
    }
}

/// One parsed sample
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedSample {
    /// Parsed value
    pub value: Value,
    /// Offset just past the sample
    pub offset: u64,
}

/// Probed recording, ready to open sample passes.
#[derive(Debug, Clone)]
pub struct SampleReader {
    path: PathBuf,
    file_size: u64,
    layout: Layout,
    session: Option<Value>,
    samples_offset: u64,
    end_tolerance: u64,
    max_sample_bytes: u64,
}

impl SampleReader {
    /// Probe `path`: detect the layout and, for root objects, scan the header
    /// window for the session object and the sample array.
    pub fn open(path: impl AsRef<Path>, limits: &ScanLimits) -> Result<Self> {
        limits.validate()?;
        let path = path.as_ref();
        let file = open_input(path)?;
        let file_size = file.metadata()?.len();
        let window = limits.header_window_bytes;

        let mut scanner = JsonScanner::new(BufReader::new(file.take(window)));
        scanner.skip_bom()?;
        let (layout, session, samples_offset) = match scanner.skip_whitespace()? {
            Some(b'[') => (Layout::RootArray, None, scanner.offset() + 1),
            Some(b'{') => {
                let header = scan_header(&mut scanner, window, file_size)?;
                (Layout::RootObject, header.session, header.samples_offset)
            }
            Some(byte) => {
                return Err(ScanError::UnrecognizedLayout {
                    byte,
                    offset: scanner.offset(),
                })
            }
            None if file_size > window => {
                return Err(ScanError::Malformed {
                    offset: scanner.offset(),
                    reason: format!("no JSON value within the first {window} bytes"),
                })
            }
            None => {
                return Err(ScanError::UnexpectedEof {
                    offset: scanner.offset(),
                })
            }
        };

        info!(
            path = %path.display(),
            layout = layout.as_str(),
            file_size,
            samples_offset,
            has_session = session.is_some(),
            "Probed recording"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file_size,
            layout,
            session,
            samples_offset,
            end_tolerance: limits.end_tolerance_bytes,
            max_sample_bytes: limits.max_sample_bytes,
        })
    }

    /// Input path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected layout
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Session metadata captured from a root object
    pub fn session_metadata(&self) -> Option<&Value> {
        self.session.as_ref()
    }

    /// Offset of the first byte inside the sample array
    pub fn samples_offset(&self) -> u64 {
        self.samples_offset
    }

    /// Size of the input file when it was probed
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Start a fresh forward pass, yielding at most `max_samples` samples.
    pub fn samples(&self, max_samples: Option<u64>) -> Result<SampleStream> {
        let mut file = open_input(&self.path)?;
        let elements = match self.layout {
            Layout::RootArray => {
                let source: Box<dyn Read + Send> = Box::new(file);
                let mut scanner = JsonScanner::new(BufReader::new(source))
                    .with_capture_limit(self.max_sample_bytes);
                scanner.skip_bom()?;
                ArrayElements::open(scanner)?
            }
            Layout::RootObject => {
                file.seek(SeekFrom::Start(self.samples_offset))?;
                let source: Box<dyn Read + Send> = Box::new(PrefixedReader::new(b'[', file));
                // The synthetic `[` sits just before the real first sample byte.
                let scanner = JsonScanner::with_offset(
                    BufReader::new(source),
                    self.samples_offset.saturating_sub(1),
                )
                .with_capture_limit(self.max_sample_bytes);
                ArrayElements::open(scanner)?
            }
        };

        debug!(layout = self.layout.as_str(), ?max_samples, "Opened sample pass");
        Ok(SampleStream {
            elements,
            wrapped: self.layout == Layout::RootObject,
            file_size: self.file_size,
            end_tolerance: self.end_tolerance,
            max_samples,
            samples_read: 0,
            end: None,
        })
    }
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ScanError::NotFound {
            path: path.display().to_string(),
        },
        _ => ScanError::Io(err),
    })
}

/// Forward-only iterator over the samples of one pass.
///
/// Fused: after the array closes, the limit is hit or an error is yielded,
/// `next` returns `None`.
pub struct SampleStream {
    elements: ArrayElements<SampleSource>,
    wrapped: bool,
    file_size: u64,
    end_tolerance: u64,
    max_samples: Option<u64>,
    samples_read: u64,
    end: Option<EndReason>,
}

impl SampleStream {
    /// Bytes of the file consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.elements.offset()
    }

    /// Samples yielded so far
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Why the stream stopped, once it has
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end.as_ref()
    }

    fn near_end_of_file(&self, offset: u64) -> bool {
        offset.saturating_add(self.end_tolerance) >= self.file_size
    }
}

impl Iterator for SampleStream {
    type Item = Result<StreamedSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }
        if self.max_samples.is_some_and(|max| self.samples_read >= max) {
            debug!(samples = self.samples_read, "Sample limit reached");
            self.end = Some(EndReason::LimitReached);
            return None;
        }

        match self.elements.next_element() {
            Ok(Some((value, offset))) => {
                self.samples_read += 1;
                Some(Ok(StreamedSample { value, offset }))
            }
            Ok(None) => {
                debug!(samples = self.samples_read, "Sample array closed");
                self.end = Some(EndReason::ArrayClosed);
                None
            }
            Err(err) => {
                let offset = err.offset().unwrap_or_else(|| self.elements.offset());
                if self.wrapped && err.is_format_error() && self.near_end_of_file(offset) {
                    warn!(
                        offset,
                        file_size = self.file_size,
                        error = %err,
                        "Treating parse failure near end of file as end of samples"
                    );
                    self.end = Some(EndReason::EndOfFile {
                        offset,
                        reason: err.to_string(),
                    });
                    None
                } else {
                    self.end = Some(EndReason::Failed);
                    Some(Err(err))
                }
            }
        }
    }
}
