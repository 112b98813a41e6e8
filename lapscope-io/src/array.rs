//! Element-by-element streaming of a JSON array

use crate::lexer::JsonScanner;
use lapscope_core::{Result, ScanError};
use serde_json::Value;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayState {
    First,
    Next,
    Closed,
}

/// Pulls one parsed element at a time from a JSON array.
///
/// A trailing comma before `]` is accepted. Each element is framed by the
/// scanner and parsed on its own, so memory is bounded by the largest
/// element rather than the array.
pub struct ArrayElements<R> {
    scanner: JsonScanner<R>,
    state: ArrayState,
    buffer: Vec<u8>,
}

impl<R: BufRead> ArrayElements<R> {
    /// Consume the opening `[` and get ready for the first element.
    pub fn open(mut scanner: JsonScanner<R>) -> Result<Self> {
        scanner.expect(b'[')?;
        Ok(Self {
            scanner,
            state: ArrayState::First,
            buffer: Vec::new(),
        })
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> u64 {
        self.scanner.offset()
    }

    /// Whether the closing `]` has been consumed
    pub fn is_closed(&self) -> bool {
        self.state == ArrayState::Closed
    }

    /// Next element with the offset just past it, or `None` once `]` is read.
    pub fn next_element(&mut self) -> Result<Option<(Value, u64)>> {
        match self.state {
            ArrayState::Closed => return Ok(None),
            ArrayState::First => {
                if self.peek_significant()? == b']' {
                    return self.close();
                }
            }
            ArrayState::Next => match self.peek_significant()? {
                b',' => {
                    self.scanner.next_byte()?;
                    if self.peek_significant()? == b']' {
                        return self.close();
                    }
                }
                b']' => return self.close(),
                byte => {
                    return Err(ScanError::Malformed {
                        offset: self.scanner.offset(),
                        reason: format!(
                            "expected ',' or ']' after array element, found '{}'",
                            char::from(byte).escape_default()
                        ),
                    })
                }
            },
        }

        let start = self.scanner.offset();
        self.buffer.clear();
        self.scanner.read_value(Some(&mut self.buffer))?;
        let value = serde_json::from_slice(&self.buffer).map_err(|err| ScanError::Malformed {
            offset: start,
            reason: err.to_string(),
        })?;
        self.state = ArrayState::Next;
        Ok(Some((value, self.scanner.offset())))
    }

    fn peek_significant(&mut self) -> Result<u8> {
        self.scanner
            .skip_whitespace()?
            .ok_or(ScanError::UnexpectedEof {
                offset: self.scanner.offset(),
            })
    }

    fn close(&mut self) -> Result<Option<(Value, u64)>> {
        self.scanner.next_byte()?;
        self.state = ArrayState::Closed;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(text: &str) -> Result<Vec<Value>> {
        let mut elements = ArrayElements::open(JsonScanner::new(text.as_bytes()))?;
        let mut values = Vec::new();
        while let Some((value, _)) = elements.next_element()? {
            values.push(value);
        }
        Ok(values)
    }

    #[test]
    fn streams_elements_in_order() {
        let values = collect(r#" [ {"a":1}, [2], "three", 4 ] "#).unwrap();
        assert_eq!(values, vec![json!({"a":1}), json!([2]), json!("three"), json!(4)]);
    }

    #[test]
    fn empty_array_closes_immediately() {
        assert!(collect("[ ]").unwrap().is_empty());
    }

    #[test]
    fn trailing_comma_is_accepted() {
        assert_eq!(collect("[1,2,]").unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn reports_end_offsets() {
        let mut elements = ArrayElements::open(JsonScanner::new(&b"[10, 200]"[..])).unwrap();
        assert_eq!(elements.next_element().unwrap(), Some((json!(10), 3)));
        assert_eq!(elements.next_element().unwrap(), Some((json!(200), 8)));
        assert_eq!(elements.next_element().unwrap(), None);
        assert!(elements.is_closed());
        assert_eq!(elements.offset(), 9);
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = collect("[1 2]").unwrap_err();
        assert!(matches!(err, ScanError::Malformed { offset: 3, .. }));
    }

    #[test]
    fn invalid_element_reports_its_start() {
        let err = collect(r#"[1, {"a": tru}]"#).unwrap_err();
        assert!(matches!(err, ScanError::Malformed { offset: 4, .. }));
    }

    #[test]
    fn mismatched_bracket_fails_before_later_elements() {
        let text = r#"[{"a":[1},{"b":2},{"c":3},{"d":4}]"#;
        let mut elements = ArrayElements::open(JsonScanner::new(text.as_bytes())).unwrap();
        let err = elements.next_element().unwrap_err();
        assert!(matches!(err, ScanError::Malformed { offset: 8, .. }));
        assert_eq!(elements.offset(), 8);
        assert!(elements.buffer.len() < 10);
    }

    #[test]
    fn oversized_element_is_rejected() {
        let text = r#"[{"a":1},{"payload":"0123456789abcdef"}]"#;
        let scanner = JsonScanner::new(text.as_bytes()).with_capture_limit(16);
        let mut elements = ArrayElements::open(scanner).unwrap();
        assert_eq!(elements.next_element().unwrap(), Some((json!({"a": 1}), 8)));
        let err = elements.next_element().unwrap_err();
        assert!(matches!(err, ScanError::SampleTooLarge { offset: 9, limit: 16 }));
    }

    #[test]
    fn truncated_array_is_eof() {
        let err = collect("[1, 2").unwrap_err();
        assert!(matches!(err, ScanError::UnexpectedEof { .. }));
    }
}
