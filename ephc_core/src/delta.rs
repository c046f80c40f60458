//! Order-1 and order-2 differencing along the time axis.
//!
//! Differences and cumulative sums wrap in the signal's native width, so
//! `decode(encode(x)) == x` bit for bit even when a difference overflows.

use crate::error::{Error, Result};
use crate::signal::{Sample, Shape, Signal};

/// Output of [`encode`]: the seed row plus the `(T-1, C)` differences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<T> {
    pub first: Vec<T>,
    pub diff: Signal<T>,
}

/// Output of [`encode2`]: two seed rows plus the `(T-2, C)` second differences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta2<T> {
    pub first: Vec<T>,
    pub second: Vec<T>,
    pub diff2: Signal<T>,
}

/// Row-wise successive difference `x[t] - x[t-1]` for `t = 1..T`.
pub fn diff<T: Sample>(x: &Signal<T>) -> Signal<T> {
    let rows = x.rows().saturating_sub(1);
    let cols = x.cols();
    let src = x.as_slice();
    let mut data = Vec::with_capacity(rows * cols);
    for t in 1..x.rows() {
        let (prev, cur) = (&src[(t - 1) * cols..t * cols], &src[t * cols..(t + 1) * cols]);
        data.extend(cur.iter().zip(prev).map(|(&c, &p)| c.wrapping_sub(p)));
    }
    Signal::from_raw_parts(data, Shape::new(rows, cols))
}

/// Inverse of [`diff`]: prepend `seed` and accumulate.
pub fn cumsum_from<T: Sample>(seed: &[T], diffs: &Signal<T>) -> Result<Signal<T>> {
    let cols = diffs.cols();
    if seed.len() != cols {
        return Err(Error::InvalidShape(format!(
            "seed row has {} values but the differences have {} channels",
            seed.len(),
            cols
        )));
    }
    let rows = diffs.rows() + 1;
    let mut data = Vec::with_capacity(rows * cols);
    data.extend_from_slice(seed);
    for t in 0..diffs.rows() {
        let base = t * cols;
        for (ch, &d) in diffs.row(t).iter().enumerate() {
            let next = data[base + ch].wrapping_add(d);
            data.push(next);
        }
    }
    Signal::new(data, Shape::new(rows, cols))
}

/// First-order delta. Requires more than one time point.
pub fn encode<T: Sample>(x: &Signal<T>) -> Result<Delta<T>> {
    if x.rows() <= 1 {
        return Err(Error::InvalidShape(format!(
            "delta needs more than one time point, got shape {}",
            x.shape()
        )));
    }
    Ok(Delta {
        first: x.row(0).to_vec(),
        diff: diff(x),
    })
}

pub fn decode<T: Sample>(first: &[T], diff: &Signal<T>) -> Result<Signal<T>> {
    cumsum_from(first, diff)
}

/// Second-order delta. Requires more than two time points.
pub fn encode2<T: Sample>(x: &Signal<T>) -> Result<Delta2<T>> {
    if x.rows() <= 2 {
        return Err(Error::InvalidShape(format!(
            "delta2 needs more than two time points, got shape {}",
            x.shape()
        )));
    }
    Ok(Delta2 {
        first: x.row(0).to_vec(),
        second: x.row(1).to_vec(),
        diff2: diff(&diff(x)),
    })
}

pub fn decode2<T: Sample>(first: &[T], second: &[T], diff2: &Signal<T>) -> Result<Signal<T>> {
    if second.len() != first.len() {
        return Err(Error::InvalidShape(
            "delta2 seed rows have different lengths".into(),
        ));
    }
    let d0: Vec<T> = second
        .iter()
        .zip(first)
        .map(|(&b, &a)| b.wrapping_sub(a))
        .collect();
    let d = cumsum_from(&d0, diff2)?;
    cumsum_from(first, &d)
}
