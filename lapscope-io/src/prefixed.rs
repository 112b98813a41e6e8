//! Reader adapter that emits a synthetic leading byte

use std::io::{self, Read};

/// Yields one synthetic byte, then the inner reader's bytes.
///
/// Used to present the tail of a root object (`<elem>,<elem>,...]}`) as a
/// JSON array. The adapter never seeks and cannot know how much of the inner
/// reader remains.
#[derive(Debug)]
pub struct PrefixedReader<R> {
    prefix: Option<u8>,
    inner: R,
}

impl<R: Read> PrefixedReader<R> {
    /// Prepend `prefix` to `inner`
    pub fn new(prefix: u8, inner: R) -> Self {
        Self {
            prefix: Some(prefix),
            inner,
        }
    }

    /// Total length of the stream. Always unknown.
    pub fn len_hint(&self) -> Option<u64> {
        None
    }
}

impl<R: Read> Read for PrefixedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.prefix.take() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => self.inner.read(buf),
        }
    }
}
