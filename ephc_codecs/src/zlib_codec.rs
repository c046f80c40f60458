use std::io::Write;

use ephc_core::codec::ByteCodec;
use ephc_core::{Error, Result};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

/// zlib (DEFLATE) byte codec.
pub struct ZlibCodec {
    /// 0 = store, 9 = best (default).
    pub level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ZlibCodec {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl ByteCodec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(raw.len() / 2),
            Compression::new(self.level),
        );
        encoder.write_all(raw).map_err(|e| Error::codec("zlib", e))?;
        encoder.finish().map_err(|e| Error::codec("zlib", e))
    }

    /// Succeeds only on a complete stream, trailing checksum included.
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        let mut inflater = Decompress::new(true);
        let mut out = Vec::with_capacity(compressed.len().saturating_mul(3).max(64));
        loop {
            let consumed = inflater.total_in() as usize;
            let produced = out.len();
            let status = inflater
                .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::Finish)
                .map_err(|e| Error::codec("zlib", e))?;
            match status {
                Status::StreamEnd => return Ok(out),
                _ if out.len() == out.capacity() => out.reserve(out.capacity()),
                _ if inflater.total_in() as usize == consumed && out.len() == produced => {
                    return Err(Error::codec("zlib", "truncated stream"));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_a_codec_error() {
        let err = ZlibCodec::default().decompress(b"not zlib").unwrap_err();
        assert!(matches!(err, Error::Codec { codec: "zlib", .. }));
    }

    #[test]
    fn missing_checksum_byte_is_rejected() {
        let codec = ZlibCodec::default();
        let raw: Vec<u8> = (0..4096u32).map(|i| (i % 13) as u8).collect();
        let packed = codec.compress(&raw).unwrap();
        assert_eq!(codec.decompress(&packed).unwrap(), raw);
        assert!(codec.decompress(&packed[..packed.len() - 1]).is_err());
    }
}
