/// Modem line framing.
///
/// The modem prints free-form text records terminated by `\r`, `\n` or both.
/// Bytes are accumulated in a fixed [`LineBuffer`] until a terminator shows
/// up. A record longer than the buffer is cut at capacity and handed on as
/// truncated; the buffer then restarts empty, so an unterminated stream of
/// line noise can never stall the reader or grow memory.
use crate::defaults::LINE_CAPACITY;

/// Signals that a [`LineBuffer`] is full and the byte was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded;

/// Bounded byte buffer. `push` never writes past `N`.
pub struct LineBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn push(&mut self, byte: u8) -> Result<(), CapacityExceeded> {
        if self.len < N {
            self.buf[self.len] = byte;
            self.len += 1;
            Ok(())
        } else {
            Err(CapacityExceeded)
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A completed record, without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Terminated normally
    Line(&'a [u8]),
    /// Cut at buffer capacity; the rest of the record arrives as a new line
    Truncated(&'a [u8]),
}

impl<'a> Frame<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        match *self {
            Frame::Line(b) | Frame::Truncated(b) => b,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, Frame::Truncated(_))
    }
}

/// Byte-at-a-time record splitter.
pub struct LineFramer<const N: usize = LINE_CAPACITY> {
    line: LineBuffer<N>,
    // Set once a record has been handed out; the buffer is cleared on the
    // next `feed` so the returned slice can borrow it.
    pending_reset: bool,
    overflow_byte: Option<u8>,
}

impl<const N: usize> LineFramer<N> {
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            pending_reset: false,
            overflow_byte: None,
        }
    }

    /// Feed one byte. Returns a record when this byte completes one.
    ///
    /// Empty records (the second half of a `\r\n` pair) are skipped.
    pub fn feed(&mut self, byte: u8) -> Option<Frame<'_>> {
        if self.pending_reset {
            self.line.clear();
            self.pending_reset = false;
            if let Some(carry) = self.overflow_byte.take() {
                let _ = self.line.push(carry);
            }
        }

        if byte == b'\n' || byte == b'\r' {
            if self.line.is_empty() {
                return None;
            }
            self.pending_reset = true;
            return Some(Frame::Line(self.line.as_bytes()));
        }

        match self.line.push(byte) {
            Ok(()) => None,
            Err(CapacityExceeded) => {
                log::warn!("Line exceeded {} bytes, resyncing", N);
                self.pending_reset = true;
                self.overflow_byte = Some(byte);
                Some(Frame::Truncated(self.line.as_bytes()))
            }
        }
    }

    /// Bytes buffered for the record in progress.
    pub fn buffered(&self) -> usize {
        if self.pending_reset {
            self.overflow_byte.map_or(0, |_| 1)
        } else {
            self.line.len()
        }
    }
}

impl<const N: usize> Default for LineFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<const N: usize>(framer: &mut LineFramer<N>, input: &[u8]) -> Vec<(bool, String)> {
        let mut out = Vec::new();
        for &b in input {
            if let Some(frame) = framer.feed(b) {
                out.push((
                    frame.is_truncated(),
                    String::from_utf8_lossy(frame.bytes()).into_owned(),
                ));
            }
            assert!(framer.buffered() <= N);
        }
        out
    }

    #[test]
    fn line_buffer_rejects_push_past_capacity() {
        let mut buf = LineBuffer::<2>::new();
        assert_eq!(buf.push(b'a'), Ok(()));
        assert_eq!(buf.push(b'b'), Ok(()));
        assert_eq!(buf.push(b'c'), Err(CapacityExceeded));
        assert_eq!(buf.as_bytes(), b"ab");
    }

    #[test]
    fn splits_on_cr_and_lf() {
        let mut framer = LineFramer::<128>::new();
        let lines = collect(&mut framer, b"JOINED\r\nrxDone\rTX ok\n");
        assert_eq!(
            lines,
            vec![
                (false, "JOINED".to_string()),
                (false, "rxDone".to_string()),
                (false, "TX ok".to_string()),
            ]
        );
    }

    #[test]
    fn skips_empty_records() {
        let mut framer = LineFramer::<128>::new();
        assert!(collect(&mut framer, b"\r\n\r\n\n").is_empty());
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut framer = LineFramer::<128>::new();
        assert!(collect(&mut framer, b"JOI").is_empty());
        assert_eq!(framer.buffered(), 3);
        let lines = collect(&mut framer, b"NED\n");
        assert_eq!(lines, vec![(false, "JOINED".to_string())]);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn overflow_truncates_and_resyncs() {
        let mut framer = LineFramer::<8>::new();
        let lines = collect(&mut framer, b"0123456789AB\nOK\n");
        assert_eq!(
            lines,
            vec![
                (true, "01234567".to_string()),
                (false, "89AB".to_string()),
                (false, "OK".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_noise_never_exceeds_capacity() {
        let mut framer = LineFramer::<128>::new();
        let noise: Vec<u8> = (0..1000u32).map(|i| b'A' + (i % 26) as u8).collect();
        let lines = collect(&mut framer, &noise);
        assert!(lines.iter().all(|(truncated, l)| *truncated && l.len() == 128));
        assert_eq!(lines.len(), 7);
    }

    // ── Logging ─────────────────────────────────────────────────────

    struct Capture(std::sync::Mutex<Vec<String>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.0.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn overflow_warning_does_not_name_the_source() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Warn);

        // The same framer type splits operator console input
        let mut framer = LineFramer::<4>::new();
        collect(&mut framer, b"AT+VER\r");

        let lines = CAPTURE.0.lock().unwrap();
        assert!(lines.iter().any(|l| l == "Line exceeded 4 bytes, resyncing"));
        assert!(!lines.iter().any(|l| l.starts_with("Modem line")));
    }
}
