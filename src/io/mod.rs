//! Bounded read/seek views over larger streams.
//!
//! Chunked file uploads send one slice of a large file per request. Rather
//! than buffering each slice, [`BoundedStream`] exposes a window of the
//! source stream starting at its position at construction time and extending
//! at most `max_len` bytes. The view never owns the source: dropping it
//! leaves the source open and positioned wherever the last operation left it.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// A read/seek/write view over a byte sub-range of another stream.
///
/// Positions reported and accepted by the view are relative to the window
/// start. Reads and writes are both clamped to the window.
#[derive(Debug)]
pub struct BoundedStream<S> {
    src: S,
    start: u64,
    max_len: u64,
}

impl<S: Seek> BoundedStream<S> {
    /// Wrap `src`, capturing its current position as the window start.
    pub fn new(mut src: S, max_len: u64) -> io::Result<Self> {
        let start = src.stream_position()?;
        Ok(Self {
            src,
            start,
            max_len,
        })
    }

    /// Current position relative to the window start.
    pub fn position(&mut self) -> io::Result<u64> {
        Ok(self.src.stream_position()?.saturating_sub(self.start))
    }

    /// Number of bytes addressable through this view: the window length,
    /// shortened when the source ends before the window does.
    ///
    /// Probes the source length by seeking to its end and restoring the
    /// position. Sources that cannot be probed are assumed to cover the full
    /// window.
    pub fn effective_len(&mut self) -> u64 {
        match self.probe_source_len() {
            Ok(src_len) => self.max_len.min(src_len.saturating_sub(self.start)),
            Err(_) => self.max_len,
        }
    }

    /// Bytes left between the current position and the effective end.
    fn remaining(&mut self) -> io::Result<u64> {
        let len = self.effective_len();
        Ok(len.saturating_sub(self.position()?))
    }

    fn probe_source_len(&mut self) -> io::Result<u64> {
        let saved = self.src.stream_position()?;
        let len = self.src.seek(SeekFrom::End(0))?;
        self.src.seek(SeekFrom::Start(saved))?;
        Ok(len)
    }

    /// Consume the view, returning the source stream.
    pub fn into_inner(self) -> S {
        self.src
    }

    pub fn get_ref(&self) -> &S {
        &self.src
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.src
    }
}

impl<S: Read + Seek> BoundedStream<S> {
    /// Read bytes one at a time until a newline or the effective end,
    /// whichever comes first, appending to `buf`. The trailing newline is
    /// included when one was found. Returns the number of bytes appended.
    ///
    /// Byte-by-byte because the source offers no length-limited line read.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut limit = self.remaining()?;
        let mut appended = 0;
        let mut byte = [0u8; 1];
        while limit > 0 {
            if self.src.read(&mut byte)? == 0 {
                break;
            }
            buf.push(byte[0]);
            appended += 1;
            limit -= 1;
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(appended)
    }

    /// Read everything between the current position and the effective end.
    pub fn read_to_limit(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        Read::read_to_end(self, &mut buf)?;
        Ok(buf)
    }
}

impl<S: Read + Seek> Read for BoundedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(remaining) as usize;
        self.src.read(&mut buf[..n])
    }
}

impl<S: Seek> Seek for BoundedStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => {
                let absolute = self.start.checked_add(offset).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflow")
                })?;
                self.src.seek(SeekFrom::Start(absolute))?
            }
            SeekFrom::Current(offset) => {
                // A relative seek must not escape the window: landing before
                // `start` would let the next read return bytes outside it.
                let current = self.src.stream_position()?;
                let target = current.saturating_add_signed(offset).max(self.start);
                self.src.seek(SeekFrom::Start(target))?
            }
            SeekFrom::End(offset) => {
                let end = self.start + self.effective_len();
                let absolute = end.checked_add_signed(offset).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "seek before the start of the view",
                    )
                })?;
                self.src.seek(SeekFrom::Start(absolute))?
            }
        };
        Ok(target.saturating_sub(self.start))
    }
}

impl<S: Seek + Write> Write for BoundedStream<S> {
    /// Writes are clamped to the window, mirroring the read side. A write at
    /// or past the window end reports zero bytes written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let window_left = self.max_len.saturating_sub(self.position()?);
        if window_left == 0 || buf.is_empty() {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(window_left) as usize;
        self.src.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.src.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};

    use super::*;

    fn window_over(data: &[u8], at: u64, max_len: u64) -> BoundedStream<Cursor<Vec<u8>>> {
        let mut src = Cursor::new(data.to_vec());
        src.seek(SeekFrom::Start(at)).unwrap();
        BoundedStream::new(src, max_len).unwrap()
    }

    #[test]
    fn position_starts_at_zero() {
        let mut view = window_over(b"0123456789", 4, 3);
        assert_eq!(view.position().unwrap(), 0);
    }

    #[test]
    fn read_is_clamped_to_window() {
        let mut view = window_over(b"0123456789", 2, 4);
        let mut buf = [0u8; 64];
        let n = view.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"2345");
        assert_eq!(view.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn window_shrinks_when_source_is_short() {
        // 10 bytes total, window starts at 8: only 2 bytes addressable.
        let mut view = window_over(b"0123456789", 8, 100);
        assert_eq!(view.effective_len(), 2);
        assert_eq!(view.read_to_limit().unwrap(), b"89");
    }

    #[test]
    fn seek_end_lands_on_effective_len() {
        let mut view = window_over(b"0123456789", 2, 4);
        let pos = view.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(pos, 4);
        assert_eq!(view.position().unwrap(), 4);
    }

    #[test]
    fn seek_back_from_end_reads_the_tail() {
        let mut view = window_over(b"abcdefghij", 0, 10);
        view.seek(SeekFrom::End(-5)).unwrap();
        let mut buf = [0u8; 5];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"fghij");
    }

    #[test]
    fn relative_seek_cannot_escape_the_window() {
        let mut view = window_over(b"0123456789", 4, 4);
        let pos = view.seek(SeekFrom::Current(-100)).unwrap();
        assert_eq!(pos, 0);
        let mut buf = [0u8; 2];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"45");
    }

    #[test]
    fn relative_seek_moves_within_the_window() {
        let mut view = window_over(b"0123456789", 2, 6);
        view.seek(SeekFrom::Current(3)).unwrap();
        assert_eq!(view.position().unwrap(), 3);
        view.seek(SeekFrom::Current(-2)).unwrap();
        assert_eq!(view.position().unwrap(), 1);
    }

    #[test]
    fn seek_set_is_window_relative() {
        let mut view = window_over(b"0123456789", 3, 5);
        view.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 1];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], b'5');
    }

    #[test]
    fn read_line_stops_at_newline_and_keeps_it() {
        let mut view = window_over(b"one\ntwo\n", 0, 8);
        let mut line = Vec::new();
        let n = view.read_line(&mut line).unwrap();
        assert_eq!(n, 4);
        assert_eq!(line, b"one\n");
    }

    #[test]
    fn read_line_stops_at_effective_end_without_newline() {
        let mut view = window_over(b"abcdef", 0, 3);
        let mut line = Vec::new();
        view.read_line(&mut line).unwrap();
        assert_eq!(line, b"abc");
        assert_eq!(view.read_line(&mut line).unwrap(), 0);
    }

    #[test]
    fn write_is_clamped_to_window() {
        let src = Cursor::new(vec![b'.'; 10]);
        let mut view = BoundedStream::new(src, 4).unwrap();
        let n = view.write(b"XXXXXXXX").unwrap();
        assert_eq!(n, 4);
        assert_eq!(view.write(b"Y").unwrap(), 0);
        view.flush().unwrap();
        assert_eq!(view.into_inner().into_inner(), b"XXXX......");
    }

    #[test]
    fn dropping_the_view_leaves_the_source_usable() {
        let mut view = window_over(b"0123456789", 2, 3);
        let mut buf = [0u8; 3];
        view.read_exact(&mut buf).unwrap();
        let mut src = view.into_inner();
        assert_eq!(src.stream_position().unwrap(), 5);
        let mut rest = Vec::new();
        src.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"56789");
    }

    #[test]
    fn file_backed_window() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"headerPAYLOADtrailer").unwrap();
        file.seek(SeekFrom::Start(6)).unwrap();
        let mut view = BoundedStream::new(file, 7).unwrap();
        assert_eq!(view.read_to_limit().unwrap(), b"PAYLOAD");
    }
}
