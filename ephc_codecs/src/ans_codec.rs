use ephc_core::frame::{decode_frame, encode_frame};
use ephc_core::{with_dtype, with_signal};
use ephc_core::{AnySignal, Codec, Dtype, EntropyCoder, Error, RansCoder, Result, Sample, Shape, Signal};
use tracing::debug;

/// Terminal stage: flatten the signal row-major and entropy-code it into a
/// self-describing frame that carries dtype and shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsCodec {
    coder: RansCoder,
}

impl AnsCodec {
    pub fn new(coder: RansCoder) -> Self {
        Self { coder }
    }

    fn encode_typed<T: Sample>(&self, signal: &Signal<T>) -> Result<Vec<u8>> {
        let encoded = self.coder.encode(signal.as_slice())?;
        debug!(
            dtype = %T::DTYPE,
            samples = signal.as_slice().len(),
            symbols = encoded.symbol_values.len(),
            words = encoded.words.len(),
            "ans encode"
        );
        encode_frame(encoded, Some(signal.shape()))
    }

    fn decode_typed<T: Sample>(&self, bytes: &[u8], shape: Shape) -> Result<Signal<T>> {
        let (header, encoded) = decode_frame::<T>(bytes, true)?;
        header.check_shape(shape)?;
        if header.decoded_length as usize != shape.len() {
            return Err(Error::corrupt(format!(
                "frame declares {} samples, shape {shape} needs {}",
                header.decoded_length,
                shape.len()
            )));
        }
        let data = self.coder.decode(&encoded)?;
        if data.len() != shape.len() {
            return Err(Error::corrupt(format!(
                "frame decodes to {} samples, shape {shape} needs {}",
                data.len(),
                shape.len()
            )));
        }
        Signal::new(data, shape)
    }
}

impl Codec for AnsCodec {
    fn encode(&self, signal: &AnySignal) -> Result<Vec<u8>> {
        with_signal!(signal, s => self.encode_typed(s))
    }

    fn decode(&self, bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<AnySignal> {
        with_dtype!(dtype, T => Ok(self.decode_typed::<T>(bytes, shape)?.into()))
    }
}
