//! Forward-only JSON byte scanner
//!
//! Frames JSON values without building them: containers are matched on a
//! stack of open brackets with string and escape awareness, scalars run to
//! the next delimiter. The raw bytes of a framed value can be captured for a
//! one-off `serde_json` parse, up to a per-value byte cap.

use lapscope_core::{Result, ScanError};
use smallvec::SmallVec;
use std::io::BufRead;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Outcome of feeding one byte to a framing state machine
enum Step {
    /// Byte belongs to the value, keep going
    Continue,
    /// Byte belongs to the value and closes it
    EndAfter,
    /// Byte is not part of the value
    EndBefore,
    /// Byte cannot appear here; framing stops in front of it
    Reject(&'static str),
}

/// Byte scanner over a buffered reader, tracking the absolute offset.
pub struct JsonScanner<R> {
    reader: R,
    offset: u64,
    capture_limit: u64,
}

impl<R: BufRead> JsonScanner<R> {
    /// Scanner starting at offset 0
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// Scanner whose first byte sits at `offset` in the underlying file
    pub fn with_offset(reader: R, offset: u64) -> Self {
        Self {
            reader,
            offset,
            capture_limit: u64::MAX,
        }
    }

    /// Refuse to capture more than `limit` bytes for a single value.
    pub fn with_capture_limit(mut self, limit: u64) -> Self {
        self.capture_limit = limit;
        self
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next byte without consuming it
    pub fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    /// Consume one byte
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.reader.consume(1);
            self.offset += 1;
        }
        Ok(byte)
    }

    /// Skip a leading UTF-8 byte order mark, if present.
    pub fn skip_bom(&mut self) -> Result<()> {
        if self.reader.fill_buf()?.starts_with(UTF8_BOM) {
            self.reader.consume(UTF8_BOM.len());
            self.offset += UTF8_BOM.len() as u64;
        }
        Ok(())
    }

    /// Skip JSON whitespace and peek the next significant byte.
    pub fn skip_whitespace(&mut self) -> Result<Option<u8>> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skipped = buf
                .iter()
                .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
                .count();
            let next = buf.get(skipped).copied();
            self.reader.consume(skipped);
            self.offset += skipped as u64;
            if next.is_some() {
                return Ok(next);
            }
        }
    }

    /// Consume `expected` after optional whitespace.
    pub fn expect(&mut self, expected: u8) -> Result<()> {
        match self.skip_whitespace()? {
            Some(byte) if byte == expected => {
                self.next_byte()?;
                Ok(())
            }
            Some(byte) => Err(self.unexpected(byte, &format!("'{}'", char::from(expected)))),
            None => Err(ScanError::UnexpectedEof {
                offset: self.offset,
            }),
        }
    }

    /// Read a JSON string token and decode it.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.offset;
        let mut raw = Vec::new();
        match self.skip_whitespace()? {
            Some(b'"') => self.read_value(Some(&mut raw))?,
            Some(byte) => return Err(self.unexpected(byte, "a string")),
            None => return Err(ScanError::UnexpectedEof { offset: start }),
        }
        serde_json::from_slice(&raw).map_err(|err| ScanError::Malformed {
            offset: start,
            reason: format!("invalid string: {err}"),
        })
    }

    /// Frame the next value, appending its raw bytes to `out` when given.
    ///
    /// Only structure is checked here; content errors inside the value
    /// surface when the captured bytes are parsed.
    pub fn read_value(&mut self, mut out: Option<&mut Vec<u8>>) -> Result<()> {
        let first = match self.skip_whitespace()? {
            Some(byte) => byte,
            None => {
                return Err(ScanError::UnexpectedEof {
                    offset: self.offset,
                })
            }
        };

        match first {
            b'{' | b'[' => {
                let mut open: SmallVec<[u8; 32]> = SmallVec::new();
                let mut in_string = false;
                let mut escaped = false;
                self.frame(&mut out, false, |byte| {
                    if in_string {
                        if escaped {
                            escaped = false;
                        } else if byte == b'\\' {
                            escaped = true;
                        } else if byte == b'"' {
                            in_string = false;
                        }
                        return Step::Continue;
                    }
                    match byte {
                        b'"' => in_string = true,
                        b'{' => open.push(b'}'),
                        b'[' => open.push(b']'),
                        b'}' | b']' => {
                            if open.pop() != Some(byte) {
                                return Step::Reject("mismatched closing bracket");
                            }
                            if open.is_empty() {
                                return Step::EndAfter;
                            }
                        }
                        _ => {}
                    }
                    Step::Continue
                })
            }
            b'"' => {
                let mut opened = false;
                let mut escaped = false;
                self.frame(&mut out, false, |byte| {
                    if !opened {
                        opened = true;
                    } else if escaped {
                        escaped = false;
                    } else if byte == b'\\' {
                        escaped = true;
                    } else if byte == b'"' {
                        return Step::EndAfter;
                    }
                    Step::Continue
                })
            }
            b'}' | b']' | b',' | b':' => Err(self.unexpected(first, "a value")),
            _ => {
                let start = self.offset;
                self.frame(&mut out, true, |byte| match byte {
                    b',' | b']' | b'}' | b':' | b' ' | b'\t' | b'\n' | b'\r' | b'"' => {
                        Step::EndBefore
                    }
                    _ => Step::Continue,
                })?;
                if self.offset == start {
                    return Err(self.unexpected(first, "a value"));
                }
                Ok(())
            }
        }
    }

    /// Feed buffered chunks through `step` until it ends the value.
    fn frame<F>(&mut self, out: &mut Option<&mut Vec<u8>>, eof_ends: bool, mut step: F) -> Result<()>
    where
        F: FnMut(u8) -> Step,
    {
        let start = self.offset;
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return if eof_ends {
                    Ok(())
                } else {
                    Err(ScanError::UnexpectedEof {
                        offset: self.offset,
                    })
                };
            }

            let mut end = None;
            let mut rejected = None;
            for (i, &byte) in buf.iter().enumerate() {
                match step(byte) {
                    Step::Continue => {}
                    Step::EndAfter => {
                        end = Some(i + 1);
                        break;
                    }
                    Step::EndBefore => {
                        end = Some(i);
                        break;
                    }
                    Step::Reject(reason) => {
                        end = Some(i);
                        rejected = Some((byte, reason));
                        break;
                    }
                }
            }

            let taken = end.unwrap_or(buf.len());
            if let Some(out) = out.as_deref_mut() {
                let captured = self.offset - start + taken as u64;
                if captured > self.capture_limit {
                    return Err(ScanError::SampleTooLarge {
                        offset: start,
                        limit: self.capture_limit,
                    });
                }
                out.extend_from_slice(&buf[..taken]);
            }
            self.reader.consume(taken);
            self.offset += taken as u64;
            if let Some((byte, reason)) = rejected {
                return Err(ScanError::Malformed {
                    offset: self.offset,
                    reason: format!("{reason} '{}'", char::from(byte).escape_default()),
                });
            }
            if end.is_some() {
                return Ok(());
            }
        }
    }

    fn unexpected(&self, byte: u8, expected: &str) -> ScanError {
        ScanError::Malformed {
            offset: self.offset,
            reason: format!(
                "expected {expected}, found '{}'",
                char::from(byte).escape_default()
            ),
        }
    }
}
