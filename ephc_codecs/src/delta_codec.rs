use std::sync::Arc;

use ephc_core::delta;
use ephc_core::reader::ByteReader;
use ephc_core::writer::ByteWriter;
use ephc_core::{with_dtype, with_signal};
use ephc_core::{AnySignal, Codec, Dtype, Result, Sample, Shape, Signal};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaOrder {
    First,
    Second,
}

impl DeltaOrder {
    /// Seed rows stored verbatim ahead of the inner payload.
    pub fn seed_rows(self) -> usize {
        match self {
            DeltaOrder::First => 1,
            DeltaOrder::Second => 2,
        }
    }
}

/// Temporal differencing in front of any inner codec.
///
/// Output is the seed row(s) in native little-endian followed by the inner
/// codec's bytes for the `(T - seed_rows, C)` difference array.
pub struct DeltaCodec {
    inner: Arc<dyn Codec>,
    order: DeltaOrder,
}

impl DeltaCodec {
    pub fn new(inner: Arc<dyn Codec>, order: DeltaOrder) -> Self {
        Self { inner, order }
    }

    pub fn first(inner: Arc<dyn Codec>) -> Self {
        Self::new(inner, DeltaOrder::First)
    }

    pub fn second(inner: Arc<dyn Codec>) -> Self {
        Self::new(inner, DeltaOrder::Second)
    }

    fn encode_typed<T: Sample>(&self, x: &Signal<T>) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        let payload = match self.order {
            DeltaOrder::First => {
                let d = delta::encode(x)?;
                w.put_samples(&d.first);
                self.inner.encode(&d.diff.into())?
            }
            DeltaOrder::Second => {
                let d = delta::encode2(x)?;
                w.put_samples(&d.first);
                w.put_samples(&d.second);
                self.inner.encode(&d.diff2.into())?
            }
        };
        debug!(order = ?self.order, seed_bytes = w.len(), payload = payload.len(), "delta encode");
        w.put_bytes(&payload);
        Ok(w.into_inner())
    }

    fn decode_typed<T: Sample>(&self, bytes: &[u8], shape: Shape) -> Result<Signal<T>> {
        let inner_shape = shape.with_fewer_rows(self.order.seed_rows())?;
        let mut r = ByteReader::new(bytes);
        let first = r.samples::<T>(shape.cols, "first row")?;
        match self.order {
            DeltaOrder::First => {
                let diff = self.inner.decode(r.rest(), T::DTYPE, inner_shape)?;
                delta::decode(&first, &T::from_any(diff)?)
            }
            DeltaOrder::Second => {
                let second = r.samples::<T>(shape.cols, "second row")?;
                let diff2 = self.inner.decode(r.rest(), T::DTYPE, inner_shape)?;
                delta::decode2(&first, &second, &T::from_any(diff2)?)
            }
        }
    }
}

impl Codec for DeltaCodec {
    fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>> {
        with_signal!(signal, s => self.encode_typed(s))
    }

    fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal> {
        with_dtype!(dtype, T => Ok(self.decode_typed::<T>(bytes, shape)?.into()))
    }
}
