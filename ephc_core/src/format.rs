use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::signal::{Dtype, Shape};

/// Magic bytes for EPHC version 1 files.
/// 8 bytes: "EPHC1\n" followed by 2 null bytes.
pub const MAGIC: &[u8; 8] = b"EPHC1\n\x00\x00";

/// Fixed size of the EPHC1 file header in bytes.
///   magic[8] + format_version:u16 + dtype_code:u16 + rows:u32 + cols:u32
///   + payload_len:u64 + checksum:u64 + name_len:u16 + version_len:u16
///   + reserved[8]
///   = 8 + 2 + 2 + 4 + 4 + 8 + 8 + 2 + 2 + 8 = 48
pub const HEADER_SIZE: usize = 48;

/// Only container layout written by this crate.
pub const FORMAT_VERSION: u16 = 1;

/// Default file extension for encoded signals.
pub const EXTENSION: &str = "ephc";

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 48-byte EPHC1 file header.
///
/// The header is followed by the algorithm name and version (UTF-8, lengths
/// given here) and then `payload_len` bytes of codec output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub format_version: u16,
    pub dtype: Dtype,
    pub shape: Shape,
    pub payload_len: u64,
    /// xxhash3-64 of the payload bytes.
    pub checksum: u64,
    pub name_len: u16,
    pub version_len: u16,
}

impl ContainerHeader {
    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let rows = u32::try_from(self.shape.rows)
            .map_err(|_| Error::InvalidShape(format!("{} rows exceed u32", self.shape.rows)))?;
        let cols = u32::try_from(self.shape.cols)
            .map_err(|_| Error::InvalidShape(format!("{} channels exceed u32", self.shape.cols)))?;
        let mut buf = [0u8; HEADER_SIZE];
        buf[..8].copy_from_slice(MAGIC);
        buf[8..10].copy_from_slice(&self.format_version.to_le_bytes());
        buf[10..12].copy_from_slice(&(self.dtype.code() as u16).to_le_bytes());
        buf[12..16].copy_from_slice(&rows.to_le_bytes());
        buf[16..20].copy_from_slice(&cols.to_le_bytes());
        buf[20..28].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[28..36].copy_from_slice(&self.checksum.to_le_bytes());
        buf[36..38].copy_from_slice(&self.name_len.to_le_bytes());
        buf[38..40].copy_from_slice(&self.version_len.to_le_bytes());
        // reserved[8] stays zero
        Ok(buf)
    }

    /// Deserialize from `HEADER_SIZE` bytes, checking magic and format version.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if &buf[..8] != MAGIC {
            return Err(Error::corrupt("invalid EPHC magic bytes, not an EPHC1 file"));
        }
        let format_version = u16::from_le_bytes([buf[8], buf[9]]);
        if format_version != FORMAT_VERSION {
            return Err(Error::corrupt(format!(
                "unsupported EPHC format version {format_version} (only {FORMAT_VERSION} is supported)"
            )));
        }
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let u64_at = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&buf[i..i + 8]);
            u64::from_le_bytes(b)
        };
        Ok(Self {
            format_version,
            dtype: Dtype::from_code(u32::from(u16::from_le_bytes([buf[10], buf[11]])))?,
            shape: Shape::new(u32_at(12) as usize, u32_at(16) as usize),
            payload_len: u64_at(20),
            checksum: u64_at(28),
            name_len: u16::from_le_bytes([buf[36], buf[37]]),
            version_len: u16::from_le_bytes([buf[38], buf[39]]),
        })
    }
}

// ── Container ──────────────────────────────────────────────────────────────

/// One encoded signal plus the metadata needed to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub algorithm: String,
    pub algorithm_version: String,
    pub dtype: Dtype,
    pub shape: Shape,
    pub payload: Vec<u8>,
}

impl Container {
    pub fn new(
        algorithm: impl Into<String>,
        algorithm_version: impl Into<String>,
        dtype: Dtype,
        shape: Shape,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            algorithm_version: algorithm_version.into(),
            dtype,
            shape,
            payload,
        }
    }

    /// Header describing this container, with the payload checksum filled in.
    pub fn header(&self) -> Result<ContainerHeader> {
        let name_len = u16::try_from(self.algorithm.len())
            .map_err(|_| Error::corrupt("algorithm name longer than 65535 bytes"))?;
        let version_len = u16::try_from(self.algorithm_version.len())
            .map_err(|_| Error::corrupt("algorithm version longer than 65535 bytes"))?;
        Ok(ContainerHeader {
            format_version: FORMAT_VERSION,
            dtype: self.dtype,
            shape: self.shape,
            payload_len: self.payload.len() as u64,
            checksum: xxh3_64(&self.payload),
            name_len,
            version_len,
        })
    }

    /// Total size on disk.
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.algorithm.len() + self.algorithm_version.len() + self.payload.len())
            as u64
    }

    /// Reject artifacts written by another version of the named algorithm.
    pub fn check_version(&self, current: &str) -> Result<()> {
        if self.algorithm_version != current {
            return Err(Error::VersionMismatch {
                algorithm: self.algorithm.clone(),
                stored: self.algorithm_version.clone(),
                current: current.to_string(),
            });
        }
        Ok(())
    }
}
