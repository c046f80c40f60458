use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Dtype ──────────────────────────────────────────────────────────────────

/// Closed set of sample types a signal may carry.
///
/// The numeric wire code is stored in entropy frame headers and container
/// headers; see [`Dtype::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "uint32")]
    U32,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
}

impl Dtype {
    pub const ALL: [Dtype; 5] = [Dtype::U8, Dtype::U16, Dtype::U32, Dtype::I16, Dtype::I32];

    /// Wire code: 0→uint8, 1→uint16, 2→uint32, 3→int16, 4→int32.
    pub fn code(self) -> u32 {
        match self {
            Dtype::U8 => 0,
            Dtype::U16 => 1,
            Dtype::U32 => 2,
            Dtype::I16 => 3,
            Dtype::I32 => 4,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Dtype::U8),
            1 => Ok(Dtype::U16),
            2 => Ok(Dtype::U32),
            3 => Ok(Dtype::I16),
            4 => Ok(Dtype::I32),
            other => Err(Error::UnsupportedDtype(format!("code {other}"))),
        }
    }

    /// Bytes per sample.
    pub fn width(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::U8 => "uint8",
            Dtype::U16 => "uint16",
            Dtype::U32 => "uint32",
            Dtype::I16 => "int16",
            Dtype::I32 => "int32",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uint8" | "u8" => Ok(Dtype::U8),
            "uint16" | "u16" => Ok(Dtype::U16),
            "uint32" | "u32" => Ok(Dtype::U32),
            "int16" | "i16" => Ok(Dtype::I16),
            "int32" | "i32" => Ok(Dtype::I32),
            other => Err(Error::UnsupportedDtype(other.to_string())),
        }
    }
}

// ── Shape ──────────────────────────────────────────────────────────────────

/// `(T, C)`: axis 0 is time, axis 1 is channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Same channel count, `n` fewer rows. Used when a stage peels off seed rows.
    pub fn with_fewer_rows(&self, n: usize) -> Result<Self> {
        if self.rows < n {
            return Err(Error::InvalidShape(format!(
                "cannot remove {n} rows from a signal of shape {self}"
            )));
        }
        Ok(Shape::new(self.rows - n, self.cols))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

// ── Sample ─────────────────────────────────────────────────────────────────

/// Fixed-width integer sample type.
///
/// All arithmetic the codecs perform on samples is wrapping in the native
/// width, so lossless stages stay bit-exact even when differences overflow.
pub trait Sample: Copy + Default + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    const DTYPE: Dtype;
    const WIDTH: usize;
    const MIN_I64: i64;
    const MAX_I64: i64;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn to_f32(self) -> f32;
    fn to_i64(self) -> i64;
    /// Truncate to the native width (two's complement wraparound).
    fn from_i64_wrapping(v: i64) -> Self;
    fn write_le(self, out: &mut Vec<u8>);
    /// `bytes` must be exactly `WIDTH` long.
    fn read_le(bytes: &[u8]) -> Self;

    fn into_any(signal: Signal<Self>) -> AnySignal;
    fn from_any(signal: AnySignal) -> Result<Signal<Self>>;
    fn as_signal(signal: &AnySignal) -> Option<&Signal<Self>>;
}

macro_rules! impl_sample {
    ($t:ty, $variant:ident, $width:expr) => {
        impl Sample for $t {
            const DTYPE: Dtype = Dtype::$variant;
            const WIDTH: usize = $width;
            const MIN_I64: i64 = <$t>::MIN as i64;
            const MAX_I64: i64 = <$t>::MAX as i64;

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$t>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$t>::wrapping_sub(self, rhs)
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }

            #[inline]
            fn from_i64_wrapping(v: i64) -> Self {
                v as $t
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $width];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }

            fn into_any(signal: Signal<Self>) -> AnySignal {
                AnySignal::$variant(signal)
            }

            fn from_any(signal: AnySignal) -> Result<Signal<Self>> {
                match signal {
                    AnySignal::$variant(s) => Ok(s),
                    other => Err(Error::DtypeMismatch {
                        expected: Dtype::$variant,
                        found: other.dtype(),
                    }),
                }
            }

            fn as_signal(signal: &AnySignal) -> Option<&Signal<Self>> {
                match signal {
                    AnySignal::$variant(s) => Some(s),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(u8, U8, 1);
impl_sample!(u16, U16, 2);
impl_sample!(u32, U32, 4);
impl_sample!(i16, I16, 2);
impl_sample!(i32, I32, 4);

/// Serialize samples as consecutive little-endian values.
pub fn samples_to_le_bytes<T: Sample>(samples: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * T::WIDTH);
    for &s in samples {
        s.write_le(&mut out);
    }
    out
}

/// Parse consecutive little-endian samples; the length must be a multiple of the width.
pub fn samples_from_le_bytes<T: Sample>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % T::WIDTH != 0 {
        return Err(Error::corrupt(format!(
            "{} bytes is not a whole number of {} samples",
            bytes.len(),
            T::DTYPE
        )));
    }
    Ok(bytes.chunks_exact(T::WIDTH).map(T::read_le).collect())
}

// ── Signal ─────────────────────────────────────────────────────────────────

/// Row-major `(T, C)` integer array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal<T> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Sample> Signal<T> {
    pub fn new(data: Vec<T>, shape: Shape) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(Error::InvalidShape(format!(
                "{} samples cannot form shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Self { data, shape })
    }

    /// Caller guarantees `data.len() == shape.len()`.
    pub(crate) fn from_raw_parts(data: Vec<T>, shape: Shape) -> Self {
        debug_assert_eq!(data.len(), shape.len());
        Self { data, shape }
    }

    /// Build from a list of equally long rows (one per time point).
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(Error::InvalidShape("rows have different lengths".into()));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(data, Shape::new(rows.len(), cols))
    }

    /// Interleave per-channel buffers back into a row-major signal.
    pub fn from_columns(columns: &[Vec<T>], rows: usize) -> Result<Self> {
        if columns.iter().any(|c| c.len() != rows) {
            return Err(Error::InvalidShape(format!(
                "every channel must hold {rows} samples"
            )));
        }
        let cols = columns.len();
        let mut data = Vec::with_capacity(rows * cols);
        for t in 0..rows {
            for column in columns {
                data.push(column[t]);
            }
        }
        Self::new(data, Shape::new(rows, cols))
    }

    pub fn from_le_bytes(bytes: &[u8], shape: Shape) -> Result<Self> {
        let expected = shape.len() * T::WIDTH;
        if bytes.len() != expected {
            return Err(Error::corrupt(format!(
                "expected {expected} bytes for {} {}, got {}",
                shape,
                T::DTYPE,
                bytes.len()
            )));
        }
        Self::new(samples_from_le_bytes(bytes)?, shape)
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn row(&self, t: usize) -> &[T] {
        let c = self.shape.cols;
        &self.data[t * c..(t + 1) * c]
    }

    pub fn get(&self, t: usize, ch: usize) -> T {
        self.data[t * self.shape.cols + ch]
    }

    /// Copy of rows `start..end`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Signal<T> {
        let c = self.shape.cols;
        Signal {
            data: self.data[start * c..end * c].to_vec(),
            shape: Shape::new(end - start, c),
        }
    }

    pub fn column(&self, ch: usize) -> Vec<T> {
        self.data
            .iter()
            .skip(ch)
            .step_by(self.shape.cols.max(1))
            .copied()
            .collect()
    }

    /// One owned buffer per channel.
    pub fn columns(&self) -> Vec<Vec<T>> {
        (0..self.shape.cols).map(|ch| self.column(ch)).collect()
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        samples_to_le_bytes(&self.data)
    }
}

// ── AnySignal ──────────────────────────────────────────────────────────────

/// A signal of any supported dtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnySignal {
    U8(Signal<u8>),
    U16(Signal<u16>),
    U32(Signal<u32>),
    I16(Signal<i16>),
    I32(Signal<i32>),
}

/// Run `$body` with `$s` bound to the typed signal inside an [`AnySignal`].
#[macro_export]
macro_rules! with_signal {
    ($signal:expr, $s:ident => $body:expr) => {
        match $signal {
            $crate::signal::AnySignal::U8($s) => $body,
            $crate::signal::AnySignal::U16($s) => $body,
            $crate::signal::AnySignal::U32($s) => $body,
            $crate::signal::AnySignal::I16($s) => $body,
            $crate::signal::AnySignal::I32($s) => $body,
        }
    };
}

/// Run `$body` with the type alias `$t` bound to the sample type of `$dtype`.
#[macro_export]
macro_rules! with_dtype {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::signal::Dtype::U8 => {
                type $t = u8;
                $body
            }
            $crate::signal::Dtype::U16 => {
                type $t = u16;
                $body
            }
            $crate::signal::Dtype::U32 => {
                type $t = u32;
                $body
            }
            $crate::signal::Dtype::I16 => {
                type $t = i16;
                $body
            }
            $crate::signal::Dtype::I32 => {
                type $t = i32;
                $body
            }
        }
    };
}

impl AnySignal {
    pub fn dtype(&self) -> Dtype {
        match self {
            AnySignal::U8(_) => Dtype::U8,
            AnySignal::U16(_) => Dtype::U16,
            AnySignal::U32(_) => Dtype::U32,
            AnySignal::I16(_) => Dtype::I16,
            AnySignal::I32(_) => Dtype::I32,
        }
    }

    pub fn shape(&self) -> Shape {
        with_signal!(self, s => s.shape())
    }

    /// Raw (uncompressed) size in bytes.
    pub fn nbytes(&self) -> usize {
        self.shape().len() * self.dtype().width()
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        with_signal!(self, s => s.to_le_bytes())
    }

    pub fn from_le_bytes(bytes: &[u8], dtype: Dtype, shape: Shape) -> Result<Self> {
        with_dtype!(dtype, T => Ok(Signal::<T>::from_le_bytes(bytes, shape)?.into()))
    }
}

impl<T: Sample> From<Signal<T>> for AnySignal {
    fn from(signal: Signal<T>) -> Self {
        T::into_any(signal)
    }
}
