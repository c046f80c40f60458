use ephc_core::codec::ByteCodec;
use ephc_core::Result;

/// No-op codec: stores sample bytes verbatim.
///
/// The `raw` algorithm uses it as the uncompressed baseline every ratio is
/// measured against.
pub struct PassThroughCodec;

impl ByteCodec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}
