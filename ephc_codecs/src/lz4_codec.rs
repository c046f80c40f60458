use ephc_core::codec::ByteCodec;
use ephc_core::{Error, Result};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

/// LZ4 byte codec with the uncompressed size prepended.
///
/// Weakest ratio of the bundled backends on sample data but the fastest to
/// decode.
pub struct Lz4Codec;

impl ByteCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        decompress_size_prepended(compressed).map_err(|e| Error::codec("lz4", e))
    }
}
