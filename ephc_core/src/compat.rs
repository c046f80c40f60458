//! Algorithm/dataset compatibility by tag.

// Algorithm tags.
pub const DELTA_ENCODING: &str = "delta_encoding";
pub const LPC_PREDICTION: &str = "lpc_prediction";
pub const REQUIRES_1D: &str = "requires_1d";
pub const ZERO_RLE: &str = "zero_rle";
pub const INTEGER: &str = "integer";
pub const NO_BERNOULLI: &str = "no_bernoulli";
pub const LOSSY: &str = "lossy";

// Dataset tags.
pub const CORRELATED: &str = "correlated";
pub const TIMESERIES: &str = "timeseries";
pub const ONE_D: &str = "1d";
pub const SPARSE: &str = "sparse";
pub const BERNOULLI: &str = "bernoulli";

/// Dataset tags each algorithm tag depends on.
fn requirements(algorithm_tag: &str) -> &'static [&'static str] {
    match algorithm_tag {
        DELTA_ENCODING | LPC_PREDICTION => &[CORRELATED, TIMESERIES, INTEGER],
        REQUIRES_1D => &[ONE_D],
        ZERO_RLE => &[SPARSE, TIMESERIES, ONE_D],
        INTEGER => &[INTEGER],
        _ => &[],
    }
}

/// Whether an algorithm carrying `algorithm_tags` may run on a dataset
/// carrying `dataset_tags`.
pub fn is_compatible<A, D>(algorithm_tags: &[A], dataset_tags: &[D]) -> bool
where
    A: AsRef<str>,
    D: AsRef<str>,
{
    let has = |tag: &str| dataset_tags.iter().any(|t| t.as_ref() == tag);
    algorithm_tags.iter().all(|tag| {
        let tag = tag.as_ref();
        if tag == NO_BERNOULLI && has(BERNOULLI) {
            return false;
        }
        requirements(tag).iter().all(|req| has(req))
    })
}
