//! In-memory IO adapters.

use std::io::{Result as IoResult, Write};

/// Memory-backed writer with a hard size bound.
///
/// Accepts every write but stores at most `limit` bytes; overflow is
/// dropped, not reported.
pub struct BoundedWriter {
    buf: Vec<u8>,
    limit: usize,
}

impl BoundedWriter {
    pub fn new(limit: usize) -> Self {
        BoundedWriter {
            buf: Vec::new(),
            limit,
        }
    }

    /// Collected bytes as text. Anything non-UTF-8 is replaced, never
    /// errored on.
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

impl Write for BoundedWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        let room = self.limit.saturating_sub(self.buf.len());
        let take = room.min(data.len());
        self.buf.extend_from_slice(&data[..take]);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_up_to_the_limit() {
        let mut writer = BoundedWriter::new(8);
        writer.write_all(b"12345").expect("write");
        writer.write_all(b"67890").expect("write past limit");
        assert_eq!(writer.into_string(), "12345678");
    }

    #[test]
    fn overflowing_writes_still_report_success() {
        let mut writer = BoundedWriter::new(2);
        assert_eq!(writer.write(b"abcdef").expect("write"), 6);
        assert_eq!(writer.into_string(), "ab");
    }
}
