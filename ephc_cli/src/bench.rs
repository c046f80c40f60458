use std::time::Instant;

use anyhow::Context;
use ephc_core::{is_compatible, loss_metrics, verify_lossless, Algorithm, CacheKey, LossMetrics};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;

/// One algorithm run on one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct BenchRecord {
    pub key: CacheKey,
    /// Artifact stem derived from `key`.
    pub artifact: String,
    pub lossless: bool,
    pub raw_bytes: usize,
    pub encoded_bytes: usize,
    pub ratio: f64,
    pub encode_ms: f64,
    pub decode_ms: f64,
    /// Present for lossy algorithms only.
    pub loss: Option<LossMetrics>,
}

impl BenchRecord {
    pub fn algorithm(&self) -> &str {
        &self.key.algorithm
    }
}

/// Run every algorithm compatible with `dataset` whose name contains `filter`.
///
/// A lossless algorithm that fails to reproduce its input aborts the whole run.
pub fn run_benchmark(
    dataset: &Dataset,
    algorithms: &[Algorithm],
    filter: Option<&str>,
) -> anyhow::Result<Vec<BenchRecord>> {
    let mut records = Vec::new();
    let shape = dataset.signal.shape();
    let dtype = dataset.signal.dtype();

    for alg in algorithms {
        if filter.is_some_and(|f| !alg.name.contains(f)) {
            continue;
        }
        if !is_compatible(&alg.tags, &dataset.tags) {
            warn!(algorithm = %alg.name, dataset = %dataset.name, "skipping incompatible algorithm");
            continue;
        }

        let t0 = Instant::now();
        let encoded = alg
            .encode(&dataset.signal)
            .with_context(|| format!("{} failed to encode {}", alg.name, dataset.name))?;
        let encode_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let decoded = alg
            .decode(&encoded, dtype, shape)
            .with_context(|| format!("{} failed to decode {}", alg.name, dataset.name))?;
        let decode_ms = t1.elapsed().as_secs_f64() * 1000.0;

        let lossless = alg.is_lossless();
        let loss = if lossless {
            verify_lossless(&dataset.signal, &decoded).with_context(|| {
                format!("lossless algorithm {} corrupted {}", alg.name, dataset.name)
            })?;
            None
        } else {
            Some(loss_metrics(&dataset.signal, &decoded)?)
        };

        let key = CacheKey::new(&dataset.name, &dataset.version, &alg.name, &alg.version);
        let raw_bytes = dataset.raw_bytes();
        let ratio = raw_bytes as f64 / encoded.len().max(1) as f64;
        info!(
            algorithm = %alg.name,
            ratio,
            encode_ms,
            decode_ms,
            "benchmarked"
        );
        records.push(BenchRecord {
            artifact: key.stem(),
            key,
            lossless,
            raw_bytes,
            encoded_bytes: encoded.len(),
            ratio,
            encode_ms,
            decode_ms,
            loss,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephc_codecs::algorithms;

    #[test]
    fn test_benchmark_runs_compatible_algorithms() {
        let dataset = Dataset::synthetic_ephys(2_000, 3, 1).unwrap();
        let algs = algorithms().unwrap();
        let records = run_benchmark(&dataset, &algs, Some("ans-lpc")).unwrap();
        assert_eq!(records.len(), 2 + 16);
        for r in &records {
            assert!(r.algorithm().starts_with("ans-lpc"));
            assert!(r.ratio > 1.0, "{}: {}", r.algorithm(), r.ratio);
            assert_eq!(r.lossless, r.loss.is_none());
        }
    }

    #[test]
    fn test_benchmark_skips_predictive_codecs_on_uncorrelated_data() {
        let mut dataset = Dataset::synthetic_ephys(500, 2, 2).unwrap();
        dataset.tags = vec!["integer".into()];
        let records = run_benchmark(&dataset, &algorithms().unwrap(), None).unwrap();
        // five plain backends only; every delta and lpc variant is filtered
        assert_eq!(records.len(), 5);
    }
}
