pub mod cache;
pub mod codec;
pub mod compat;
pub mod delta;
pub mod entropy;
pub mod error;
pub mod format;
pub mod frame;
pub mod lpc;
pub mod metrics;
pub mod reader;
pub mod signal;
pub mod writer;

pub use cache::{CacheKey, SYSTEM_VERSION};
pub use codec::{Algorithm, ByteCodec, Codec};
pub use compat::is_compatible;
pub use entropy::{EncodedSignal, EntropyCoder, RansCoder};
pub use error::{Error, Result};
pub use format::{Container, ContainerHeader, HEADER_SIZE, MAGIC};
pub use frame::{decode_frame, encode_frame, FrameHeader};
pub use lpc::{FitOptions, Predictor};
pub use metrics::{loss_metrics, verify_lossless, LossMetrics};
pub use reader::{read_container, read_header, ByteReader};
pub use signal::{AnySignal, Dtype, Sample, Shape, Signal};
pub use writer::{write_container, ByteWriter};
