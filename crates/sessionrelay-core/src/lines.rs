use std::io::BufRead;

/// One decoded line from an append-only byte source.
///
/// `bytes_read` is the exact number of bytes consumed from the source,
/// including the terminating newline if one was present. Callers use it to
/// compute a precise resume offset without re-deriving it from `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub data: String,
    pub bytes_read: u64,
    pub too_long: bool,
}

/// Default maximum line length before a line is reported oversized (§4.1).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// A lazy, finite, non-restartable line reader over a `BufRead` source.
///
/// A line longer than `max_line_bytes` is returned with `too_long = true` and
/// empty `data`; the reader resynchronizes by discarding bytes up to the next
/// newline before resuming normal reads.
pub struct LineReader<R> {
    inner: R,
    max_line_bytes: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_line_bytes(inner, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(inner: R, max_line_bytes: usize) -> Self {
        Self { inner, max_line_bytes }
    }

    /// Reads the next line, or `None` at end of input.
    pub fn next_line(&mut self) -> std::io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let bytes_read = self.inner.read_until(b'\n', &mut buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.len() > self.max_line_bytes {
            let consumed = self.resynchronize(bytes_read as u64, &buf)?;
            return Ok(Some(Line {
                data: String::new(),
                bytes_read: consumed,
                too_long: true,
            }));
        }

        let had_newline = buf.last() == Some(&b'\n');
        if had_newline {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        let data = String::from_utf8_lossy(&buf).into_owned();
        Ok(Some(Line {
            data,
            bytes_read: bytes_read as u64,
            too_long: false,
        }))
    }

    /// `read_until` already stopped at the first newline if one was present
    /// within the initial read; this only has more to discard when the
    /// oversized line ran past that first chunk with no newline yet seen.
    fn resynchronize(&mut self, already_consumed: u64, buf: &[u8]) -> std::io::Result<u64> {
        if buf.last() == Some(&b'\n') {
            return Ok(already_consumed);
        }
        let mut discard = Vec::new();
        let extra = self.inner.read_until(b'\n', &mut discard)? as u64;
        Ok(already_consumed + extra)
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = std::io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bytes_read_includes_newline() {
        let mut reader = LineReader::new(Cursor::new(b"hi\nthere".to_vec()));
        let first = reader.next_line().unwrap().unwrap();
        assert_eq!(first.data, "hi");
        assert_eq!(first.bytes_read, 3);
        let second = reader.next_line().unwrap().unwrap();
        assert_eq!(second.data, "there");
        assert_eq!(second.bytes_read, 5);
        assert!(reader.next_line().unwrap().is_none());
    }

    #[test]
    fn strips_trailing_cr() {
        let mut reader = LineReader::new(Cursor::new(b"hi\r\n".to_vec()));
        let line = reader.next_line().unwrap().unwrap();
        assert_eq!(line.data, "hi");
        assert_eq!(line.bytes_read, 4);
    }

    #[test]
    fn oversized_line_is_flagged_and_resynchronizes() {
        let long_line = "a".repeat(20);
        let input = format!("{long_line}\nshort\n");
        let mut reader = LineReader::with_max_line_bytes(Cursor::new(input.into_bytes()), 10);
        let first = reader.next_line().unwrap().unwrap();
        assert!(first.too_long);
        assert!(first.data.is_empty());
        assert_eq!(first.bytes_read, 21);
        let second = reader.next_line().unwrap().unwrap();
        assert_eq!(second.data, "short");
        assert!(!second.too_long);
    }

    #[test]
    fn iterator_adapter_yields_same_lines() {
        let reader = LineReader::new(Cursor::new(b"a\nb\nc".to_vec()));
        let lines: Vec<String> = reader.map(|l| l.unwrap().data).collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }
}
