use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame};
use crate::error::{FrameError, Result};
use crate::record::{ErrorRecord, InfoRecord, Record};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete frames to any `Write` stream.
///
/// The device is the only producer of frames in production; this writer
/// backs reference servers, fixtures and replay tooling.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.tag, frame.payload.as_ref())
    }

    /// Encode and send a raw payload under `tag`.
    pub fn send(&mut self, tag: i8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(tag, payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a record.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.buf.clear();
        record.encode(&mut self.buf)?;
        self.write_buffered()
    }

    pub fn write_info(&mut self, record: &InfoRecord) -> Result<()> {
        self.write_record(&Record::Info(record.clone()))
    }

    pub fn write_error(&mut self, record: &ErrorRecord) -> Result<()> {
        self.write_record(&Record::Error(record.clone()))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }
}
