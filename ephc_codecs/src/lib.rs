mod ans_codec;
mod byte_backend;
mod delta_codec;
mod lpc_codec;
mod lz4_codec;
mod passthrough;
pub mod pipeline;
mod zlib_codec;
mod zstd_codec;

pub use ans_codec::AnsCodec;
pub use byte_backend::ByteBackend;
pub use delta_codec::{DeltaCodec, DeltaOrder};
pub use lpc_codec::LpcCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use pipeline::{build_codec, decode, encode, Backend, CodecConfig, Transform};
pub use zlib_codec::ZlibCodec;
pub use zstd_codec::ZstdCodec;

use std::sync::Arc;

use ephc_core::compat::{DELTA_ENCODING, LOSSY, LPC_PREDICTION};
use ephc_core::{Algorithm, Error, Result};

/// Predictor orders offered by the registry.
pub const LPC_ORDERS: [usize; 2] = [2, 8];

/// Per-sample error tolerances of the lossy predictive variants.
pub const LOSSY_TOLERANCES: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

const BASE_VERSION: &str = "1";
const LPC_VERSION: &str = "1.3";
const LOSSY_VERSION: &str = "12";

fn from_config(
    name: String,
    version: &str,
    description: String,
    tags: &[&str],
    config: &CodecConfig,
) -> Result<Algorithm> {
    Ok(Algorithm::new(name, version, description, tags, build_codec(config)?))
}

/// Variant of `base` with a first-order delta stage in front.
pub fn with_delta(base: &Algorithm) -> Algorithm {
    let mut tags = base.tags.clone();
    tags.extend(["delta".to_string(), DELTA_ENCODING.to_string()]);
    Algorithm {
        name: format!("{}-delta", base.name),
        version: base.version.clone(),
        description: format!("{} after first-order temporal delta", base.description),
        tags,
        codec: Arc::new(DeltaCodec::first(Arc::clone(&base.codec))),
    }
}

/// Every registered algorithm, in display order.
pub fn algorithms() -> Result<Vec<Algorithm>> {
    let mut out = Vec::new();

    for backend in Backend::ALL {
        let name = backend.name();
        let description = match backend {
            Backend::Raw => "uncompressed little-endian samples".to_string(),
            Backend::Ans => "rANS entropy coding of the flattened signal".to_string(),
            other => format!("{other} over little-endian sample bytes"),
        };
        let base = from_config(
            name.to_string(),
            BASE_VERSION,
            description,
            &[name],
            &CodecConfig::new(Transform::None, 0, backend),
        )?;
        let delta = with_delta(&base);
        out.push(base);
        out.push(delta);
    }

    out.push(from_config(
        "ans-delta2".into(),
        BASE_VERSION,
        "rANS after second-order temporal delta".into(),
        &["ans", "delta2", DELTA_ENCODING],
        &CodecConfig::new(Transform::Delta2, 0, Backend::Ans),
    )?);

    for order in LPC_ORDERS {
        let lpc_tag = format!("lpc{order}");
        out.push(from_config(
            format!("ans-lpc{order}"),
            LPC_VERSION,
            format!("order-{order} linear prediction, exact residuals, rANS"),
            &["ans", lpc_tag.as_str(), LPC_PREDICTION],
            &CodecConfig::new(Transform::None, order, Backend::Ans),
        )?);
    }

    for order in LPC_ORDERS {
        let lpc_tag = format!("lpc{order}");
        for tol in LOSSY_TOLERANCES {
            out.push(from_config(
                format!("ans-lpc{order}-lossy-tol{tol}"),
                LOSSY_VERSION,
                format!("order-{order} linear prediction, residuals quantized to ±{tol}, rANS"),
                &["ans", lpc_tag.as_str(), LPC_PREDICTION, LOSSY],
                &CodecConfig::lossy(order, tol),
            )?);
        }
    }

    Ok(out)
}

/// Resolve a registered algorithm by name.
///
/// Called by the CLI when opening an existing container, so the decoder is
/// chosen from the name stored in the file.
pub fn algorithm_by_name(name: &str) -> Result<Algorithm> {
    algorithms()?
        .into_iter()
        .find(|a| a.name == name)
        .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
}
