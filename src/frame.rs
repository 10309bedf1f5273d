//! Length-prefixed framing over a byte stream.
//!
//! A frame is the payload length as ASCII decimal digits, a single NUL byte,
//! then exactly that many payload bytes:
//!
//! ```text
//! 3\0get
//! ```
//!
//! There is no checksum, escaping or length cap. Reads go through a
//! `BufReader`, so bytes following a frame stay buffered inside the
//! `FrameReader`; keep using the same reader for every frame on a stream.

use crate::{KvsError, Result};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

const SENTINEL: u8 = b'\0';

// Upper bound on the up-front allocation for a payload; larger frames grow
// the buffer as bytes actually arrive.
const MAX_PREALLOC: usize = 64 * 1024;

/// Decodes frames from a byte stream.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `inner` in a buffered frame decoder.
    pub fn new(inner: R) -> Self {
        FrameReader {
            reader: BufReader::new(inner),
        }
    }

    /// Receives one frame and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns `KvsError::ConnectionBroken` if the stream ends before the
    /// sentinel or before the whole payload arrived, and
    /// `KvsError::InvalidFrameLength` if the prefix is not a decimal number.
    pub fn recv(&mut self) -> Result<String> {
        let len = self.recv_len()?;
        self.recv_msg(len)
    }

    fn recv_len(&mut self) -> Result<usize> {
        let mut prefix = Vec::new();
        self.reader.read_until(SENTINEL, &mut prefix)?;
        if prefix.pop() != Some(SENTINEL) {
            return Err(KvsError::ConnectionBroken);
        }
        let digits = String::from_utf8_lossy(&prefix);
        // `usize::from_str` also takes a leading `+`
        if !prefix.iter().all(u8::is_ascii_digit) {
            return Err(KvsError::InvalidFrameLength(digits.into_owned()));
        }
        digits
            .parse::<usize>()
            .map_err(|_| KvsError::InvalidFrameLength(digits.into_owned()))
    }

    fn recv_msg(&mut self, len: usize) -> Result<String> {
        let mut payload = Vec::with_capacity(len.min(MAX_PREALLOC));
        (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut payload)?;
        if payload.len() != len {
            return Err(KvsError::ConnectionBroken);
        }
        Ok(String::from_utf8(payload)?)
    }
}

/// Encodes frames onto a byte stream.
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wraps `inner` in a buffered frame encoder.
    pub fn new(inner: W) -> Self {
        FrameWriter {
            writer: BufWriter::new(inner),
        }
    }

    /// Sends `msg` as one frame and flushes it before returning.
    pub fn send(&mut self, msg: &str) -> Result<()> {
        write!(self.writer, "{}", msg.len())?;
        self.writer.write_all(&[SENTINEL])?;
        self.writer.write_all(msg.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}
