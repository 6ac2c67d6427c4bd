//! Scripted serial endpoint used by the unit tests.
//!
//! Replies for a whole exchange sequence are queued up front as one byte
//! stream; the carriage-return framing lets the channel pick them apart. A
//! configurable chunk size mimics a UART delivering a reply in dribbles, and
//! an exhausted script reads back as a timed-out transport, which is exactly
//! what a silent bus looks like.

pub struct MockSerial {
    /// Everything the code under test transmitted.
    written: heapless::Vec<u8, 512>,
    /// Scripted reply bytes still to be handed out.
    script: heapless::Vec<u8, 512>,
    cursor: usize,
    /// Upper bound on bytes returned per read call.
    chunk: usize,
    fail_writes: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum MockSerialError {
    /// The script ran dry; reads time out like a silent bus.
    #[error("mock script exhausted")]
    Exhausted,
    /// Simulated transport fault.
    #[error("mock transport broken")]
    Broken,
    /// A buffer capacity was exceeded.
    #[error("mock buffer overflow")]
    Overflow,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Exhausted => embedded_io::ErrorKind::TimedOut,
            MockSerialError::Broken => embedded_io::ErrorKind::Other,
            MockSerialError::Overflow => embedded_io::ErrorKind::OutOfMemory,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            written: heapless::Vec::new(),
            script: heapless::Vec::new(),
            cursor: 0,
            chunk: 16,
            fail_writes: false,
        }
    }

    /// Append reply bytes to the script.
    pub fn queue(&mut self, reply: &[u8]) {
        self.script
            .extend_from_slice(reply)
            .expect("mock script capacity");
    }

    /// Everything written so far, in transmission order.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn written_text(&self) -> &str {
        core::str::from_utf8(&self.written).expect("mock captured non-ASCII frame")
    }

    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Cap how many bytes each read call may return.
    pub fn set_chunk(&mut self, chunk: usize) {
        self.chunk = chunk.max(1);
    }

    /// Make every subsequent write fail.
    pub fn break_writes(&mut self) {
        self.fail_writes = true;
    }
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Broken);
        }
        self.written
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::Overflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Broken);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.cursor >= self.script.len() {
            return Err(MockSerialError::Exhausted);
        }
        let available = self.script.len() - self.cursor;
        let count = buf.len().min(self.chunk).min(available);
        buf[..count].copy_from_slice(&self.script[self.cursor..self.cursor + count]);
        self.cursor += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error as _, ErrorKind, Read, Write};

    #[test]
    fn captures_written_frames() {
        let mut mock = MockSerial::new();
        mock.write(b"ADR 6\r").unwrap();
        mock.write(b"PV 5.000\r").unwrap();
        assert_eq!(mock.written_text(), "ADR 6\rPV 5.000\r");
        mock.clear_written();
        assert!(mock.written().is_empty());
    }

    #[test]
    fn delivers_replies_in_chunks() {
        let mut mock = MockSerial::new();
        mock.queue(b"Lambda, GEN40-38\r");
        mock.set_chunk(4);

        let mut buf = [0u8; 32];
        let n = mock.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Lamb");
        let n = mock.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"da, ");
    }

    #[test]
    fn exhausted_script_times_out() {
        let mut mock = MockSerial::new();
        mock.queue(b"OK\r");
        let mut buf = [0u8; 8];
        mock.read(&mut buf).unwrap();
        let err = mock.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn broken_writes_surface_as_errors() {
        let mut mock = MockSerial::new();
        mock.break_writes();
        assert!(mock.write(b"RST\r").is_err());
        assert!(mock.flush().is_err());
        assert!(mock.written().is_empty());
    }
}
