use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::signal::{AnySignal, Dtype, Shape};

/// Lossless compressor over opaque byte strings (zstd, lz4, zlib, raw).
///
/// Byte codecs know nothing about dtype or shape; the signal-level backend
/// that wraps them records both.
pub trait ByteCodec: Send + Sync {
    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str;

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>>;
}

/// Signal-level compression stage.
///
/// Every stage is a pair of pure functions: `encode` turns an integer signal
/// into bytes and `decode` inverts it given the dtype and shape the caller
/// already knows. Transforms wrap an inner `Codec`, so a pipeline is a chain
/// of boxed stages ending in an entropy or byte backend.
pub trait Codec: Send + Sync {
    fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal>;
}

/// A named, versioned codec entry in the algorithm registry.
#[derive(Clone)]
pub struct Algorithm {
    pub name: String,
    /// Bumped whenever the byte format of this variant changes.
    pub version: String,
    pub description: String,
    pub tags: Vec<String>,
    pub codec: Arc<dyn Codec>,
}

impl Algorithm {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            codec,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether decoding reproduces the input exactly.
    pub fn is_lossless(&self) -> bool {
        !self.has_tag(crate::compat::LOSSY)
    }

    pub fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>> {
        self.codec.encode(signal)
    }

    pub fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal> {
        self.codec.decode(bytes, dtype, shape)
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
