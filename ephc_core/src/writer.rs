use std::io::Write;

use crate::error::Result;
use crate::format::Container;
use crate::signal::Sample;

/// Append-only little-endian byte builder used by every frame encoder.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_sample<T: Sample>(&mut self, v: T) {
        v.write_le(&mut self.buf);
    }

    pub fn put_samples<T: Sample>(&mut self, values: &[T]) {
        self.buf.reserve(values.len() * T::WIDTH);
        for &v in values {
            v.write_le(&mut self.buf);
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Write an EPHC1 container.
///
/// # Layout written
/// ```text
/// [HEADER: 48 bytes]
/// [algorithm name: name_len bytes]
/// [algorithm version: version_len bytes]
/// [PAYLOAD: payload_len bytes]             ← codec output, checksummed
/// ```
///
/// Returns the number of bytes written.
pub fn write_container<W: Write>(out: &mut W, container: &Container) -> Result<u64> {
    let header = container.header()?;
    out.write_all(&header.to_bytes()?)?;
    out.write_all(container.algorithm.as_bytes())?;
    out.write_all(container.algorithm_version.as_bytes())?;
    out.write_all(&container.payload)?;
    out.flush()?;
    Ok(container.encoded_len())
}
