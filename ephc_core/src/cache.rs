//! Identity of a benchmark artifact.
//!
//! A cached result is only reusable when every component of its key still
//! matches: bumping an algorithm's version, the dataset's version, or
//! [`SYSTEM_VERSION`] invalidates everything derived from it.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Global version of the benchmarking system itself.
pub const SYSTEM_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub dataset: String,
    pub algorithm: String,
    pub algorithm_version: String,
    pub dataset_version: String,
    pub system_version: String,
}

impl CacheKey {
    pub fn new(
        dataset: impl Into<String>,
        dataset_version: impl Into<String>,
        algorithm: impl Into<String>,
        algorithm_version: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            algorithm: algorithm.into(),
            algorithm_version: algorithm_version.into(),
            dataset_version: dataset_version.into(),
            system_version: SYSTEM_VERSION.to_string(),
        }
    }

    /// True only if `self` was produced under exactly the `current` identity.
    pub fn is_valid_for(&self, current: &CacheKey) -> bool {
        self == current
    }

    /// Stable 64-bit hash of all components, usable as a file stem.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::new();
        for part in [
            &self.dataset,
            &self.algorithm,
            &self.algorithm_version,
            &self.dataset_version,
            &self.system_version,
        ] {
            buf.extend_from_slice(&(part.len() as u32).to_le_bytes());
            buf.extend_from_slice(part.as_bytes());
        }
        xxh3_64(&buf)
    }

    pub fn stem(&self) -> String {
        format!("{}-{}-{:016x}", self.dataset, self.algorithm, self.fingerprint())
    }
}
