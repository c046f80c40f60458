use serde::Serialize;

use crate::error::{Error, Result};
use crate::signal::{AnySignal, Sample, Signal};
use crate::with_signal;

/// Reconstruction error of a lossy round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LossMetrics {
    pub rmse: f64,
    pub max_abs_error: i64,
}

fn check_compatible(original: &AnySignal, decoded: &AnySignal) -> Result<()> {
    if original.dtype() != decoded.dtype() {
        return Err(Error::DtypeMismatch {
            expected: original.dtype(),
            found: decoded.dtype(),
        });
    }
    if original.shape() != decoded.shape() {
        return Err(Error::ShapeMismatch {
            expected: original.shape(),
            found: decoded.shape(),
        });
    }
    Ok(())
}

/// Fail with the flat index of the first differing sample.
pub fn verify_lossless(original: &AnySignal, decoded: &AnySignal) -> Result<()> {
    check_compatible(original, decoded)?;
    with_signal!(original, a => first_mismatch(a, decoded))
        .map_or(Ok(()), |index| Err(Error::LosslessMismatch { index }))
}

fn first_mismatch<T: Sample>(a: &Signal<T>, decoded: &AnySignal) -> Option<usize> {
    let b = T::as_signal(decoded)?;
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .position(|(x, y)| x != y)
}

/// RMSE and maximum absolute error between two signals of the same dtype and shape.
pub fn loss_metrics(original: &AnySignal, decoded: &AnySignal) -> Result<LossMetrics> {
    check_compatible(original, decoded)?;
    Ok(with_signal!(original, a => metrics_of(a, decoded)))
}

fn metrics_of<T: Sample>(a: &Signal<T>, decoded: &AnySignal) -> LossMetrics {
    let Some(b) = T::as_signal(decoded) else {
        return LossMetrics {
            rmse: 0.0,
            max_abs_error: 0,
        };
    };
    let mut sum_sq = 0.0f64;
    let mut max_abs = 0i64;
    for (&x, &y) in a.as_slice().iter().zip(b.as_slice()) {
        let d = x.to_i64() - y.to_i64();
        sum_sq += (d as f64) * (d as f64);
        max_abs = max_abs.max(d.abs());
    }
    let n = a.as_slice().len().max(1) as f64;
    LossMetrics {
        rmse: (sum_sq / n).sqrt(),
        max_abs_error: max_abs,
    }
}
