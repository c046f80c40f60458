//! Per-channel linear prediction (AR/LPC).
//!
//! Each channel is modelled as `x[t] ≈ Σ c[j] · x[t-1-j]` for `j < order`.
//! The prediction kernel is shared by the exact, lossy, and reconstruction
//! paths and accumulates sequentially in `f32`, in coefficient order, then
//! rounds half-to-even. Any change to that arithmetic changes the byte format.
//!
//! Channels never interact, so every per-channel loop runs as a rayon map
//! over owned column buffers and the results are interleaved afterwards.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::signal::{Sample, Signal};

/// Ridge added to the normal equations' diagonal when they are singular,
/// relative to the largest diagonal entry.
const RIDGE: f64 = 1e-6;

/// Fitting knobs. These only change coefficient accuracy, never the decode path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Use every Nth target row when building the regression.
    pub subsample_factor: usize,
    /// Minimum number of regression rows; the stride shrinks to honour it.
    pub min_samples: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            subsample_factor: 1,
            min_samples: 1000,
        }
    }
}

impl FitOptions {
    /// Row stride actually used for a series of `n_timepoints` and a given order.
    pub fn stride(&self, n_timepoints: usize, order: usize) -> usize {
        let usable = n_timepoints.saturating_sub(order);
        let factor = self.subsample_factor.max(1);
        if usable / factor < self.min_samples {
            (usable / self.min_samples.max(1)).max(1)
        } else {
            factor
        }
    }
}

/// Fitted coefficients, one vector of length `order` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    order: usize,
    coefficients: Vec<Vec<f32>>,
}

impl Predictor {
    pub fn new(order: usize, coefficients: Vec<Vec<f32>>) -> Result<Self> {
        if coefficients.iter().any(|c| c.len() != order) {
            return Err(Error::InvalidShape(format!(
                "every channel needs exactly {order} coefficients"
            )));
        }
        Ok(Self {
            order,
            coefficients,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn channels(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[Vec<f32>] {
        &self.coefficients
    }

    /// Serialized size: `channels × order` little-endian `f32`.
    pub fn byte_len(channels: usize, order: usize) -> usize {
        channels * order * 4
    }

    /// Channel-major `f32` little-endian.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::byte_len(self.channels(), self.order));
        for c in self.coefficients.iter().flatten() {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out
    }

    pub fn from_le_bytes(bytes: &[u8], channels: usize, order: usize) -> Result<Self> {
        if bytes.len() != Self::byte_len(channels, order) {
            return Err(Error::corrupt(format!(
                "coefficient block is {} bytes, expected {} for {channels} channels of order {order}",
                bytes.len(),
                Self::byte_len(channels, order)
            )));
        }
        let flat: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let coefficients = if order == 0 {
            vec![Vec::new(); channels]
        } else {
            flat.chunks_exact(order).map(<[f32]>::to_vec).collect()
        };
        Self::new(order, coefficients)
    }
}

/// Predict the sample following `history` (most recent sample last).
#[inline]
pub fn predict<T: Sample>(coeffs: &[f32], history: &[T]) -> T {
    let n = history.len();
    let mut acc = 0.0f32;
    for (j, &c) in coeffs.iter().enumerate() {
        acc += c * history[n - 1 - j].to_f32();
    }
    T::from_i64_wrapping(acc.round_ties_even() as i64)
}

fn check_order(order: usize, length: usize) -> Result<()> {
    if order >= length {
        return Err(Error::InvalidOrder { order, length });
    }
    Ok(())
}

fn check_channels<T: Sample>(data: &Signal<T>, predictor: &Predictor) -> Result<()> {
    if predictor.channels() != data.cols() {
        return Err(Error::InvalidShape(format!(
            "predictor has {} channels, signal has {}",
            predictor.channels(),
            data.cols()
        )));
    }
    Ok(())
}

/// The first `order` rows, stored verbatim ahead of the residuals.
pub fn initial_values<T: Sample>(data: &Signal<T>, order: usize) -> Result<Signal<T>> {
    check_order(order, data.rows())?;
    Ok(data.slice_rows(0, order))
}

/// Least-squares fit of an order-`order` predictor for every channel.
pub fn fit<T: Sample>(data: &Signal<T>, order: usize, options: &FitOptions) -> Result<Predictor> {
    check_order(order, data.rows())?;
    let stride = options.stride(data.rows(), order);
    let coefficients: Vec<Vec<f32>> = data
        .columns()
        .par_iter()
        .map(|column| fit_channel(column, order, stride))
        .collect();
    debug!(order, channels = data.cols(), stride, "fitted linear predictor");
    Predictor::new(order, coefficients)
}

fn fit_channel<T: Sample>(x: &[T], order: usize, stride: usize) -> Vec<f32> {
    if order == 0 {
        return Vec::new();
    }
    let mut xtx = vec![0.0f64; order * order];
    let mut xty = vec![0.0f64; order];
    let mut row = vec![0.0f64; order];
    for i in (0..x.len() - order).step_by(stride) {
        for (j, r) in row.iter_mut().enumerate() {
            *r = x[i + order - 1 - j].to_i64() as f64;
        }
        let y = x[i + order].to_i64() as f64;
        for a in 0..order {
            xty[a] += row[a] * y;
            for b in 0..order {
                xtx[a * order + b] += row[a] * row[b];
            }
        }
    }
    solve_normal_equations(&xtx, &xty, order)
        .into_iter()
        .map(|c| c as f32)
        .collect()
}

/// Solve `A·c = b` for the symmetric normal-equation matrix `A` (row-major).
/// Falls back to a ridge-regularised system, then to zeros.
fn solve_normal_equations(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    if let Some(c) = gaussian_solve(a.to_vec(), b.to_vec(), n) {
        return c;
    }
    let scale = (0..n).map(|i| a[i * n + i]).fold(0.0f64, f64::max).max(1.0);
    let mut ridged = a.to_vec();
    for i in 0..n {
        ridged[i * n + i] += RIDGE * scale;
    }
    gaussian_solve(ridged, b.to_vec(), n).unwrap_or_else(|| vec![0.0; n])
}

/// Gaussian elimination with partial pivoting. `None` if (near) singular.
fn gaussian_solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Option<Vec<f64>> {
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tol = scale * 1e-12;

    for k in 0..n {
        let pivot = (k..n).max_by(|&i, &j| a[i * n + k].abs().total_cmp(&a[j * n + k].abs()))?;
        if a[pivot * n + k].abs() <= tol {
            return None;
        }
        if pivot != k {
            for col in 0..n {
                a.swap(k * n + col, pivot * n + col);
            }
            b.swap(k, pivot);
        }
        for i in k + 1..n {
            let f = a[i * n + k] / a[k * n + k];
            if f == 0.0 {
                continue;
            }
            for col in k..n {
                let upper = a[k * n + col];
                a[i * n + col] -= f * upper;
            }
            let bk = b[k];
            b[i] -= f * bk;
        }
    }

    let mut x = vec![0.0f64; n];
    for k in (0..n).rev() {
        let mut s = b[k];
        for col in k + 1..n {
            s -= a[k * n + col] * x[col];
        }
        x[k] = s / a[k * n + k];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Exact residuals `x[t] - predict(x[t-order..t])` for `t >= order`, shape `(T-order, C)`.
pub fn residuals<T: Sample>(data: &Signal<T>, predictor: &Predictor) -> Result<Signal<T>> {
    let order = predictor.order();
    check_order(order, data.rows())?;
    check_channels(data, predictor)?;

    let columns: Vec<Vec<T>> = data
        .columns()
        .into_par_iter()
        .zip(predictor.coefficients.par_iter())
        .map(|(x, coeffs)| {
            (order..x.len())
                .map(|t| x[t].wrapping_sub(predict(coeffs, &x[t - order..t])))
                .collect()
        })
        .collect();
    Signal::from_columns(&columns, data.rows() - order)
}

/// Quantized residuals with reconstruction feedback.
///
/// Predictions come from the decoder-visible reconstruction, not from `data`,
/// so [`reconstruct`] reproduces the identical prediction sequence. Each
/// reconstructed sample is within `step` of the original.
pub fn residuals_lossy<T: Sample>(
    data: &Signal<T>,
    predictor: &Predictor,
    step: u32,
) -> Result<Signal<T>> {
    if step == 0 {
        return Err(Error::InvalidStep { step });
    }
    let order = predictor.order();
    check_order(order, data.rows())?;
    check_channels(data, predictor)?;

    let columns: Vec<Vec<T>> = data
        .columns()
        .into_par_iter()
        .zip(predictor.coefficients.par_iter())
        .map(|(x, coeffs)| quantize_channel(&x, coeffs, order, i64::from(step)))
        .collect();
    Signal::from_columns(&columns, data.rows() - order)
}

fn quantize_channel<T: Sample>(x: &[T], coeffs: &[f32], order: usize, step: i64) -> Vec<T> {
    let mut recon: Vec<T> = Vec::with_capacity(x.len());
    recon.extend_from_slice(&x[..order]);
    let mut out = Vec::with_capacity(x.len() - order);

    for t in order..x.len() {
        let pred = predict(coeffs, &recon[t - order..t]);
        let p = pred.to_i64();
        let err = x[t].to_i64() - p;
        let mut q = (err as f64 / step as f64).round_ties_even() as i64 * step;
        // keep the reconstruction inside the dtype so it never wraps
        if p + q > T::MAX_I64 {
            q -= step;
        } else if p + q < T::MIN_I64 {
            q += step;
        }
        let q = T::from_i64_wrapping(q);
        recon.push(pred.wrapping_add(q));
        out.push(q);
    }
    out
}

/// Inverse of [`residuals`] and [`residuals_lossy`].
pub fn reconstruct<T: Sample>(
    predictor: &Predictor,
    residuals: &Signal<T>,
    initial: &Signal<T>,
) -> Result<Signal<T>> {
    let order = predictor.order();
    if initial.rows() != order {
        return Err(Error::InvalidShape(format!(
            "expected {order} initial rows, got {}",
            initial.rows()
        )));
    }
    if initial.cols() != residuals.cols() {
        return Err(Error::InvalidShape(format!(
            "initial values have {} channels, residuals have {}",
            initial.cols(),
            residuals.cols()
        )));
    }
    check_channels(residuals, predictor)?;

    let rows = order + residuals.rows();
    let columns: Vec<Vec<T>> = initial
        .columns()
        .into_par_iter()
        .zip(residuals.columns().into_par_iter())
        .zip(predictor.coefficients.par_iter())
        .map(|((mut buf, res), coeffs)| {
            buf.reserve(res.len());
            for (i, &r) in res.iter().enumerate() {
                let t = order + i;
                let pred = predict(coeffs, &buf[t - order..t]);
                buf.push(pred.wrapping_add(r));
            }
            buf
        })
        .collect();
    Signal::from_columns(&columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_solve_matches_known_system() {
        // 2x + y = 5, x + 3y = 10
        let x = gaussian_solve(vec![2.0, 1.0, 1.0, 3.0], vec![5.0, 10.0], 2).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn singular_system_falls_back_to_finite_coefficients() {
        let c = solve_normal_equations(&[4.0, 4.0, 4.0, 4.0], &[4.0, 4.0], 2);
        assert!(c.iter().all(|v| v.is_finite()));

        let zeros = solve_normal_equations(&[0.0; 4], &[0.0; 2], 2);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }

    #[test]
    fn stride_honours_min_samples() {
        let opts = FitOptions {
            subsample_factor: 10,
            min_samples: 1000,
        };
        assert_eq!(opts.stride(100_002, 2), 10);
        assert_eq!(opts.stride(5_002, 2), 5);
        assert_eq!(opts.stride(502, 2), 1);
    }

    #[test]
    fn predict_rounds_half_to_even() {
        assert_eq!(predict::<i16>(&[0.5], &[5]), 2);
        assert_eq!(predict::<i16>(&[0.5], &[7]), 4);
        assert_eq!(predict::<i16>(&[], &[7]), 0);
    }
}
