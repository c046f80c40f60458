use std::io::Read;

use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::format::{Container, ContainerHeader, HEADER_SIZE};
use crate::signal::Sample;

/// Bounds-checked little-endian cursor over a byte slice.
///
/// Every read names what it was looking for, so a truncated buffer reports
/// `CorruptHeader("truncated <what>: ...")` instead of panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Borrow the next `n` bytes.
    pub fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::corrupt(format!(
                "truncated {what}: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Borrow everything that has not been read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self, what: &str) -> Result<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(b))
    }

    pub fn i64(&mut self, what: &str) -> Result<i64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8, what)?);
        Ok(i64::from_le_bytes(b))
    }

    pub fn u32_array(&mut self, n: usize, what: &str) -> Result<Vec<u32>> {
        let bytes = self.take(n.saturating_mul(4), what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Exactly `n` samples.
    pub fn samples<T: Sample>(&mut self, n: usize, what: &str) -> Result<Vec<T>> {
        let bytes = self.take(n.saturating_mul(T::WIDTH), what)?;
        Ok(bytes.chunks_exact(T::WIDTH).map(T::read_le).collect())
    }

    /// Up to `n` whole samples; stops early at the end of the buffer.
    pub fn samples_upto<T: Sample>(&mut self, n: usize) -> Vec<T> {
        let available = (self.remaining() / T::WIDTH).min(n);
        let bytes = &self.buf[self.pos..self.pos + available * T::WIDTH];
        self.pos += available * T::WIDTH;
        bytes.chunks_exact(T::WIDTH).map(T::read_le).collect()
    }
}

/// Read an EPHC1 container written by [`crate::writer::write_container`].
///
/// # Read sequence
/// 1. Read the 48-byte header (magic and format version check).
/// 2. Read the algorithm name and version strings.
/// 3. Read up to `payload_len` bytes, reject a short payload, and verify the
///    xxhash3-64 checksum.
pub fn read_container<R: Read>(input: &mut R) -> Result<Container> {
    let mut header_buf = [0u8; HEADER_SIZE];
    input.read_exact(&mut header_buf)?;
    let header = ContainerHeader::from_bytes(&header_buf)?;

    let algorithm = read_string(input, header.name_len as usize, "algorithm name")?;
    let algorithm_version = read_string(input, header.version_len as usize, "algorithm version")?;

    // the declared length only caps the read; the file decides what arrives
    let mut payload = Vec::new();
    input.by_ref().take(header.payload_len).read_to_end(&mut payload)?;
    if payload.len() as u64 != header.payload_len {
        return Err(Error::corrupt(format!(
            "truncated payload: header declares {} bytes, found {}",
            header.payload_len,
            payload.len()
        )));
    }

    let actual = xxh3_64(&payload);
    if actual != header.checksum {
        return Err(Error::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok(Container {
        algorithm,
        algorithm_version,
        dtype: header.dtype,
        shape: header.shape,
        payload,
    })
}

/// Read only the fixed header, for inspection.
pub fn read_header<R: Read>(input: &mut R) -> Result<ContainerHeader> {
    let mut header_buf = [0u8; HEADER_SIZE];
    input.read_exact(&mut header_buf)?;
    ContainerHeader::from_bytes(&header_buf)
}

fn read_string<R: Read>(input: &mut R, len: usize, what: &str) -> Result<String> {
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::corrupt(format!("{what} is not valid UTF-8")))
}
