use ephc_core::reader::ByteReader;
use ephc_core::writer::ByteWriter;
use ephc_core::{AnySignal, ByteCodec, Codec, Dtype, Error, Result, Shape};
use tracing::debug;

/// Terminal stage that stores a signal through a general-purpose byte codec.
///
/// # Layout
/// ```text
/// dtype_len: u32 ‖ dtype name (UTF-8) ‖ rows: i64 ‖ cols: i64 ‖ compressed sample bytes
/// ```
pub struct ByteBackend<C> {
    codec: C,
}

impl<C: ByteCodec> ByteBackend<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: ByteCodec> Codec for ByteBackend<C> {
    fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>> {
        let raw = signal.to_le_bytes();
        let compressed = self.codec.compress(&raw)?;
        let name = signal.dtype().name();
        let shape = signal.shape();

        let mut w = ByteWriter::with_capacity(4 + name.len() + 16 + compressed.len());
        w.put_u32(name.len() as u32);
        w.put_bytes(name.as_bytes());
        w.put_i64(shape.rows as i64);
        w.put_i64(shape.cols as i64);
        w.put_bytes(&compressed);
        debug!(
            codec = self.codec.name(),
            raw = raw.len(),
            compressed = compressed.len(),
            "byte backend encode"
        );
        Ok(w.into_inner())
    }

    fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal> {
        let mut r = ByteReader::new(bytes);
        let name_len = r.u32("dtype name length")? as usize;
        let name = std::str::from_utf8(r.take(name_len, "dtype name")?)
            .map_err(|_| Error::corrupt("dtype name is not valid UTF-8"))?;
        let found: Dtype = name.parse()?;
        if found != dtype {
            return Err(Error::DtypeMismatch {
                expected: dtype,
                found,
            });
        }

        let rows = r.i64("row count")?;
        let cols = r.i64("column count")?;
        let (Ok(rows), Ok(cols)) = (usize::try_from(rows), usize::try_from(cols)) else {
            return Err(Error::corrupt(format!("negative shape ({rows}, {cols})")));
        };
        let found = Shape::new(rows, cols);
        if found != shape {
            return Err(Error::ShapeMismatch {
                expected: shape,
                found,
            });
        }

        let raw = self.codec.decompress(r.rest())?;
        let expected = shape.len() * dtype.width();
        if raw.len() != expected {
            return Err(Error::corrupt(format!(
                "{} backend produced {} bytes, expected {expected}",
                self.codec.name(),
                raw.len()
            )));
        }
        AnySignal::from_le_bytes(&raw, dtype, shape)
    }
}
