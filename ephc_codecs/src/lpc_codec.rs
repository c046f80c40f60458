use std::sync::Arc;

use ephc_core::lpc::{self, FitOptions, Predictor};
use ephc_core::reader::ByteReader;
use ephc_core::writer::ByteWriter;
use ephc_core::{with_dtype, with_signal};
use ephc_core::{AnySignal, Codec, Dtype, Error, Result, Sample, Shape, Signal};
use tracing::debug;

/// Per-channel linear prediction in front of any inner codec.
///
/// # Layout
/// ```text
/// coefficients: C × order × f32 (channel-major)
/// initial values: order × C native samples (row-major)
/// inner codec bytes for the (T - order, C) residuals
/// ```
///
/// With `step` set, residuals are quantized with reconstruction feedback and
/// every decoded sample lies within `step` of the original.
pub struct LpcCodec {
    inner: Arc<dyn Codec>,
    order: usize,
    step: Option<u32>,
    fit: FitOptions,
}

impl LpcCodec {
    pub fn new(inner: Arc<dyn Codec>, order: usize) -> Self {
        Self {
            inner,
            order,
            step: None,
            fit: FitOptions::default(),
        }
    }

    /// Lossy variant; `step` must be at least 1.
    pub fn lossy(inner: Arc<dyn Codec>, order: usize, step: u32) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidStep { step });
        }
        Ok(Self {
            step: Some(step),
            ..Self::new(inner, order)
        })
    }

    pub fn with_fit_options(mut self, fit: FitOptions) -> Self {
        self.fit = fit;
        self
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn step(&self) -> Option<u32> {
        self.step
    }

    fn encode_typed<T: Sample>(&self, x: &Signal<T>) -> Result<Vec<u8>> {
        let predictor = lpc::fit(x, self.order, &self.fit)?;
        let initial = lpc::initial_values(x, self.order)?;
        let residuals = match self.step {
            Some(step) => lpc::residuals_lossy(x, &predictor, step)?,
            None => lpc::residuals(x, &predictor)?,
        };
        let payload = self.inner.encode(&residuals.into())?;

        let coeffs = predictor.to_le_bytes();
        let mut w =
            ByteWriter::with_capacity(coeffs.len() + initial.as_slice().len() * T::WIDTH + payload.len());
        w.put_bytes(&coeffs);
        w.put_samples(initial.as_slice());
        w.put_bytes(&payload);
        debug!(
            order = self.order,
            step = ?self.step,
            channels = x.cols(),
            payload = payload.len(),
            "lpc encode"
        );
        Ok(w.into_inner())
    }

    fn decode_typed<T: Sample>(&self, bytes: &[u8], shape: Shape) -> Result<Signal<T>> {
        let residual_shape = shape.with_fewer_rows(self.order)?;
        let mut r = ByteReader::new(bytes);
        let coeffs = r.take(Predictor::byte_len(shape.cols, self.order), "coefficients")?;
        let predictor = Predictor::from_le_bytes(coeffs, shape.cols, self.order)?;
        let initial = Signal::new(
            r.samples::<T>(self.order * shape.cols, "initial values")?,
            Shape::new(self.order, shape.cols),
        )?;
        let residuals = T::from_any(self.inner.decode(r.rest(), T::DTYPE, residual_shape)?)?;
        lpc::reconstruct(&predictor, &residuals, &initial)
    }
}

impl Codec for LpcCodec {
    fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>> {
        with_signal!(signal, s => self.encode_typed(s))
    }

    fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal> {
        with_dtype!(dtype, T => Ok(self.decode_typed::<T>(bytes, shape)?.into()))
    }
}
