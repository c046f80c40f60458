use std::path::Path;

use anyhow::{ensure, Context};
use ephc_core::compat::{CORRELATED, INTEGER, ONE_D, TIMESERIES};
use ephc_core::{AnySignal, Dtype, Shape, Signal};

/// A named, versioned signal plus the tags the compatibility filter reads.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub version: String,
    pub tags: Vec<String>,
    pub signal: AnySignal,
}

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        tags: Vec<String>,
        signal: AnySignal,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tags,
            signal,
        }
    }

    /// Interpret a headerless little-endian file as a `(T, channels)` signal.
    pub fn from_raw_file(
        path: &Path,
        dtype: Dtype,
        channels: usize,
        tags: Vec<String>,
    ) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading raw samples from {:?}", path))?;
        let signal = signal_from_raw(&bytes, dtype, channels)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raw".to_string());
        Ok(Self::new(name, "1", tags, signal))
    }

    /// Synthetic extracellular recording: shared low-frequency oscillations,
    /// per-channel phase and gain, correlated noise, and sparse spikes, as int16.
    pub fn synthetic_ephys(rows: usize, channels: usize, seed: u64) -> ephc_core::Result<Self> {
        let mut rng = Lcg(seed);
        let mut data = Vec::with_capacity(rows * channels);
        let mut shared = 0.0f64;
        let mut spike_left = vec![0usize; channels];

        for t in 0..rows {
            // AR(1) background shared by all channels
            shared = 0.95 * shared + rng.centered() * 6.0;
            let time = t as f64 / 30_000.0;
            for (ch, left) in spike_left.iter_mut().enumerate() {
                let gain = 1.0 - ch as f64 / (channels as f64 * 2.0);
                let lfp = (2.0 * std::f64::consts::PI * 8.0 * time + ch as f64 * 0.1).sin() * 400.0
                    + (2.0 * std::f64::consts::PI * 60.0 * time).sin() * 50.0;
                let mut v = gain * lfp + shared + rng.centered() * 4.0;

                if *left == 0 && rng.next() % 2_000 == 0 {
                    *left = 30;
                }
                if *left > 0 {
                    let k = (30 - *left) as f64;
                    v -= 900.0 * (-k / 6.0).exp() * (k / 3.0).sin().abs();
                    *left -= 1;
                }
                data.push(v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            }
        }

        let mut tags = vec![TIMESERIES.to_string(), INTEGER.to_string(), CORRELATED.to_string()];
        if channels == 1 {
            tags.push(ONE_D.to_string());
        }
        let signal: AnySignal = Signal::new(data, Shape::new(rows, channels))?.into();
        Ok(Self::new(format!("synthetic-ephys-{channels}ch"), "1", tags, signal))
    }

    pub fn raw_bytes(&self) -> usize {
        self.signal.nbytes()
    }
}

/// Tags assumed for a raw recording when the caller gives none.
pub const DEFAULT_RAW_TAGS: [&str; 3] = [TIMESERIES, INTEGER, CORRELATED];

/// Where `ephc bench` gets its signal.
#[derive(Debug, Clone)]
pub enum DatasetSource<'a> {
    RawFile {
        path: &'a Path,
        dtype: Dtype,
        channels: usize,
    },
    Synthetic {
        rows: usize,
        channels: usize,
        seed: u64,
    },
}

impl DatasetSource<'_> {
    /// Load the dataset. `tags`, when given, replace the source's own tags.
    pub fn load(&self, tags: Option<Vec<String>>) -> anyhow::Result<Dataset> {
        let mut dataset = match *self {
            DatasetSource::RawFile {
                path,
                dtype,
                channels,
            } => {
                let defaults = DEFAULT_RAW_TAGS.iter().map(|t| t.to_string()).collect();
                Dataset::from_raw_file(path, dtype, channels, defaults)?
            }
            DatasetSource::Synthetic {
                rows,
                channels,
                seed,
            } => Dataset::synthetic_ephys(rows, channels, seed)?,
        };
        if let Some(tags) = tags {
            dataset.tags = tags;
        }
        Ok(dataset)
    }
}

/// Parse little-endian samples into `(len / channels, channels)`.
pub fn signal_from_raw(bytes: &[u8], dtype: Dtype, channels: usize) -> anyhow::Result<AnySignal> {
    ensure!(channels > 0, "channel count must be positive");
    let frame = dtype.width() * channels;
    ensure!(
        bytes.len() % frame == 0,
        "{} bytes is not a whole number of {channels}-channel {dtype} frames",
        bytes.len()
    );
    let shape = Shape::new(bytes.len() / frame, channels);
    Ok(AnySignal::from_le_bytes(bytes, dtype, shape)?)
}

/// 64-bit LCG; deterministic across platforms.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Roughly uniform in `[-1, 1)`.
    fn centered(&mut self) -> f64 {
        (self.next() as f64 / (1u64 << 31) as f64) - 1.0
    }
}
