//! Config-driven composition: `transform ∘ lpc ∘ backend`.

use std::fmt;
use std::sync::Arc;

use ephc_core::{AnySignal, Codec, Dtype, FitOptions, Result, Shape};
use serde::{Deserialize, Serialize};

use crate::{
    AnsCodec, ByteBackend, DeltaCodec, LpcCodec, Lz4Codec, PassThroughCodec, ZlibCodec, ZstdCodec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Delta,
    Delta2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ans,
    Zstd,
    Lz4,
    Zlib,
    Raw,
}

impl Backend {
    pub const ALL: [Backend; 5] = [
        Backend::Raw,
        Backend::Ans,
        Backend::Zstd,
        Backend::Lz4,
        Backend::Zlib,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Ans => "ans",
            Backend::Zstd => "zstd",
            Backend::Lz4 => "lz4",
            Backend::Zlib => "zlib",
            Backend::Raw => "raw",
        }
    }

    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            Backend::Ans => Arc::new(AnsCodec::default()),
            Backend::Zstd => Arc::new(ByteBackend::new(ZstdCodec::default())),
            Backend::Lz4 => Arc::new(ByteBackend::new(Lz4Codec)),
            Backend::Zlib => Arc::new(ByteBackend::new(ZlibCodec::default())),
            Backend::Raw => Arc::new(ByteBackend::new(PassThroughCodec)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarative description of a codec pipeline.
///
/// ```json
/// { "transform": "delta", "order": 8, "step": 5, "backend": "ans" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub transform: Transform,
    /// Predictor order; 0 with no `step` disables the LPC stage.
    pub order: usize,
    /// Quantization step for lossy prediction.
    pub step: Option<u32>,
    pub backend: Backend,
    pub fit: FitOptions,
}

impl CodecConfig {
    pub fn new(transform: Transform, order: usize, backend: Backend) -> Self {
        Self {
            transform,
            order,
            step: None,
            backend,
            fit: FitOptions::default(),
        }
    }

    /// Lossy prediction whose per-sample error stays within `tolerance`.
    pub fn lossy(order: usize, tolerance: u32) -> Self {
        Self {
            order,
            step: Some(2 * tolerance + 1),
            ..Self::default()
        }
    }

    pub fn has_lpc_stage(&self) -> bool {
        self.order > 0 || self.step.is_some()
    }
}

/// Assemble the codec a config describes, innermost stage first.
pub fn build_codec(config: &CodecConfig) -> Result<Arc<dyn Codec>> {
    let mut codec = config.backend.build();
    if config.has_lpc_stage() {
        let lpc = match config.step {
            Some(step) => LpcCodec::lossy(codec, config.order, step)?,
            None => LpcCodec::new(codec, config.order),
        };
        codec = Arc::new(lpc.with_fit_options(config.fit));
    }
    codec = match config.transform {
        Transform::None => codec,
        Transform::Delta => Arc::new(DeltaCodec::first(codec)),
        Transform::Delta2 => Arc::new(DeltaCodec::second(codec)),
    };
    Ok(codec)
}

pub fn encode(signal: &AnySignal, config: &CodecConfig) -> Result<Vec<u8>> {
    build_codec(config)?.encode(signal)
}

pub fn decode(bytes: &[u8], dtype: Dtype, shape: Shape, config: &CodecConfig) -> Result<AnySignal> {
    build_codec(config)?.decode(bytes, dtype, shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephc_core::Error;

    #[test]
    fn lossy_config_maps_tolerance_to_odd_step() {
        let c = CodecConfig::lossy(8, 4);
        assert_eq!(c.step, Some(9));
        assert_eq!(c.order, 8);
        assert_eq!(c.backend, Backend::Ans);
        assert!(c.has_lpc_stage());
    }

    #[test]
    fn zero_step_is_rejected_at_build_time() {
        let c = CodecConfig {
            step: Some(0),
            ..CodecConfig::default()
        };
        assert!(matches!(build_codec(&c), Err(Error::InvalidStep { step: 0 })));
    }
}
